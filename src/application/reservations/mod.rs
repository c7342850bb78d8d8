//! Reservation lifecycle, pricing and reports

pub mod pricing;
pub mod reports;
pub mod service;

pub use pricing::{stay_total, DEFAULT_EXTRA_PERSON_RATE};
pub use reports::{DashboardRow, DashboardState, GuestReservation, RoomStatus, RoomStatusRow};
pub use service::{BookingRequest, ExpirySweep, PaidBooking, ReservationService};
