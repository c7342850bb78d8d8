//! Line-oriented TCP protocol: command table, dispatcher and acceptor

pub mod command;
pub mod dispatcher;
pub mod server;

pub use command::{parse_request, redact_line, Arity, CommandError, CommandKind, COMMANDS};
pub use dispatcher::Dispatcher;
pub use server::LineServer;
