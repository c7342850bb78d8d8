//! Reservation aggregate
//!
//! Contains the Reservation entity, its lifecycle status, and repository interface.

pub mod model;
pub mod repository;

pub use model::{normalize_request, DateRange, Reservation, ReservationStatus};
pub use repository::ReservationRepository;
