//! Application services

mod reservation_expiry;

pub use reservation_expiry::{next_anchor, ExpiryScheduler};
