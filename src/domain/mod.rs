pub mod payment;
pub mod repositories;
pub mod reservation;
pub mod room;
pub mod user;

// Re-export commonly used types
pub use payment::{CardDetails, Payment, PaymentRepository};
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{DateRange, Reservation, ReservationRepository, ReservationStatus};
pub use room::{Room, RoomRepository, RoomType};
pub use user::{User, UserRepository};

// Re-export DomainError from shared for convenience
pub use crate::shared::errors::DomainError;
