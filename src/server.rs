//! Reusable reservation server runtime.
//!
//! Provides [`ServerHandle`] that encapsulates the full server lifecycle:
//! record store, reservation service, expiry scheduler, the line-protocol
//! listener, metrics, and graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{AuthService, ExpiryScheduler, ReservationService};
use crate::config::{AppConfig, StorageBackend};
use crate::domain::RepositoryProvider;
use crate::infrastructure::{CsvRepositoryProvider, InMemoryRepositoryProvider};
use crate::interfaces::tcp::{Dispatcher, LineServer};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::shared::time::{Clock, SystemClock};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the reservation server.
#[derive(Default)]
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Use this record store instead of the configured backend.
    pub repos: Option<Arc<dyn RepositoryProvider>>,
    /// Use this clock instead of local wall time.
    pub clock: Option<Arc<dyn Clock>>,
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running reservation server.
///
/// # Examples
///
/// ```rust,no_run
/// use hms_server::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     // ... wait for shutdown signal ...
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    /// The reservation service shared by all connections.
    pub reservations: Arc<ReservationService>,
    /// The configuration the server was started with.
    pub config: AppConfig,

    local_addr: SocketAddr,
    shutdown: ShutdownCoordinator,
    server_task: JoinHandle<()>,
    expiry_task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Start the reservation server with the given options.
    ///
    /// This will:
    /// 1. Install the Prometheus exporter (if enabled)
    /// 2. Open the record store
    /// 3. Start the expiry scheduler (if enabled)
    /// 4. Bind and start the line-protocol listener
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let config = opts.config;
        config.validate()?;

        info!("Starting hotel reservation server...");

        if config.metrics.enabled {
            install_metrics_exporter(&config)?;
        }

        // ── Record store ───────────────────────────────────────
        let repos: Arc<dyn RepositoryProvider> = match opts.repos {
            Some(repos) => repos,
            None => match config.storage.backend {
                StorageBackend::Csv => {
                    Arc::new(CsvRepositoryProvider::open(&config.storage.data_dir)?)
                }
                StorageBackend::Memory => {
                    warn!("Using in-memory record store; data is lost on exit");
                    Arc::new(InMemoryRepositoryProvider::seeded())
                }
            },
        };
        let clock = opts.clock.unwrap_or_else(|| Arc::new(SystemClock));

        // ── Services ───────────────────────────────────────────
        let reservations = Arc::new(
            ReservationService::with_clock(repos.clone(), clock)
                .with_extra_person_rate(config.pricing.extra_person_rate),
        );
        let auth = Arc::new(AuthService::new(repos.clone()));

        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Expiry scheduler ───────────────────────────────────
        let expiry_task = if config.expiry.enabled {
            let anchor = config.expiry.sweep_time()?;
            Some(
                ExpiryScheduler::new(reservations.clone(), anchor, shutdown_signal.clone())
                    .spawn(),
            )
        } else {
            info!("Expiry scheduler disabled");
            None
        };

        // ── Line-protocol listener ─────────────────────────────
        let dispatcher = Dispatcher::new(reservations.clone(), auth);
        let server = LineServer::bind(&config.address(), dispatcher, shutdown_signal).await?;
        let local_addr = server.local_addr()?;
        let server_task = tokio::spawn(server.run());

        Ok(Self {
            repos,
            reservations,
            config,
            local_addr,
            shutdown,
            server_task,
            expiry_task,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to fully stop after shutdown has been triggered.
    pub async fn wait(self) {
        info!("⏳ Waiting for server tasks to complete...");

        let server_task = self.server_task;
        let expiry_task = self.expiry_task;
        let drained = self
            .shutdown
            .drain(async move {
                if let Err(e) = server_task.await {
                    error!("Reservation server task panicked: {}", e);
                }
                if let Some(task) = expiry_task {
                    if let Err(e) = task.await {
                        error!("Expiry task panicked: {}", e);
                    }
                }
            })
            .await;

        if !drained {
            warn!("Some connections were still open at shutdown");
        }
        info!("👋 Reservation server shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down reservation server...");
        self.trigger_shutdown();
        self.wait().await;
    }

    /// Check if the server is still running.
    pub fn is_running(&self) -> bool {
        !self.server_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global metrics recorder can only be installed once per process; a
/// restart within the same process keeps the first exporter.
fn install_metrics_exporter(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    static INSTALLED: OnceLock<SocketAddr> = OnceLock::new();

    let addr = config.metrics_addr()?;
    if let Some(existing) = INSTALLED.get() {
        info!(listen = %existing, "📊 Prometheus exporter already running");
        return Ok(());
    }

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    let _ = INSTALLED.set(addr);
    info!(listen = %addr, "📊 Prometheus exporter listening");
    Ok(())
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
