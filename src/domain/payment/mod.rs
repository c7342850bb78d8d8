//! Payment aggregate
//!
//! Append-only payment records and the card masking rules.

pub mod model;
pub mod repository;

pub use model::{is_stored_card_method, CardDetails, Payment};
pub use repository::PaymentRepository;
