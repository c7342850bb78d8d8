//! Identity module: back-office login
//!
//! Accounts are maintained outside the server; this module only looks
//! them up.

pub mod service;

pub use service::AuthService;
