//! # Hotel back-office reservation server
//!
//! Serves the hotel front-desk client over a line-oriented TCP protocol:
//! room inventory, availability, reservations, payments, check-in and
//! check-out, housekeeping flags and sales reports.
//!
//! ## Architecture
//!
//! - **domain**: Rooms, reservations, payments, users and their repository traits
//! - **application**: Reservation engine, reports, login and the expiry scheduler
//! - **infrastructure**: CSV flat-file and in-memory record stores
//! - **interfaces**: The TCP command protocol
//! - **server**: Process lifecycle (startup, shutdown, tracing, metrics)

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use server::{ServerHandle, ServerOptions};
