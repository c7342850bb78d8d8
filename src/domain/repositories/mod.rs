//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider`: unified access to all per-collection repositories
//! - `DomainResult`: standard result type for domain operations

use super::payment::PaymentRepository;
use super::reservation::ReservationRepository;
use super::room::RoomRepository;
use super::user::UserRepository;

pub use crate::shared::errors::DomainResult;

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all record collections.
///
/// Each call on a repository is atomic and durable on return. Atomicity
/// across calls (check-then-write) is the lifecycle manager's job.
///
/// ```ignore
/// async fn first_room(repos: &dyn RepositoryProvider) -> DomainResult<Option<Room>> {
///     Ok(repos.rooms().find_all().await?.into_iter().next())
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn rooms(&self) -> &dyn RoomRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn payments(&self) -> &dyn PaymentRepository;
    fn users(&self) -> &dyn UserRepository;
}
