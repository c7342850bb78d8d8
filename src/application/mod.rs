pub mod availability;
pub mod identity;
pub mod reservations;
pub mod services;

// Re-export key types for convenience
pub use availability::{available_types, is_room_available, status_of, RoomOccupancy};
pub use identity::AuthService;
pub use reservations::{BookingRequest, PaidBooking, ReservationService};
pub use services::ExpiryScheduler;
