//! Line-protocol TCP server
//!
//! One task per accepted connection. Each connection reads a line, waits
//! for the dispatcher's reply and writes it before reading the next line.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::command::redact_line;
use super::dispatcher::Dispatcher;
use crate::shared::shutdown::ShutdownSignal;

pub struct LineServer {
    listener: TcpListener,
    dispatcher: Dispatcher,
    shutdown: ShutdownSignal,
}

impl LineServer {
    pub async fn bind(
        addr: &str,
        dispatcher: Dispatcher,
        shutdown: ShutdownSignal,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            dispatcher,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until shutdown, then wait for open connections to finish
    /// their current request.
    pub async fn run(self) {
        match self.local_addr() {
            Ok(addr) => info!("🔌 Reservation server listening on {}", addr),
            Err(e) => warn!(error = %e, "Listening on unknown address"),
        }

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let dispatcher = self.dispatcher.clone();
                            let shutdown = self.shutdown.clone();
                            connections.spawn(serve_connection(stream, peer, dispatcher, shutdown));
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = self.shutdown.notified().wait() => {
                    info!("🛑 Reservation server received shutdown signal");
                    break;
                }
            }
        }

        let open = connections.len();
        if open > 0 {
            info!(open, "Waiting for open connections to close");
        }
        while connections.join_next().await.is_some() {}

        info!("✅ Reservation server shutdown complete");
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Dispatcher,
    shutdown: ShutdownSignal,
) {
    info!(%peer, "Client connected");
    metrics::gauge!("hms_connections_active").increment(1.0);

    match handle_connection(stream, peer, &dispatcher, &shutdown).await {
        Ok(()) => info!(%peer, "Client disconnected"),
        Err(e) => warn!(%peer, error = %e, "Connection closed with error"),
    }

    metrics::gauge!("hms_connections_active").decrement(1.0);
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: &Dispatcher,
    shutdown: &ShutdownSignal,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.notified().wait() => {
                debug!(%peer, "Closing connection for shutdown");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        debug!(%peer, request = %redact_line(&line), "<-");
        let mut reply = dispatcher.handle_line(&line).await;
        debug!(%peer, reply = %reply, "->");

        reply.push('\n');
        writer.write_all(reply.as_bytes()).await?;
        writer.flush().await?;
    }

    writer.shutdown().await.ok();
    Ok(())
}
