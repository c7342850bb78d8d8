//! Reservation repository interface

use async_trait::async_trait;

use super::model::Reservation;
use crate::domain::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Find all reservations (any status)
    async fn find_all(&self) -> DomainResult<Vec<Reservation>>;

    /// Find reservation by ID
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>>;

    /// Save a new reservation (`Conflict` on a duplicate id)
    async fn add(&self, reservation: Reservation) -> DomainResult<()>;

    /// Update an existing reservation (`NotFound` if absent)
    async fn update(&self, reservation: Reservation) -> DomainResult<()>;

    /// Physically remove a reservation; `false` when no such id existed
    async fn delete(&self, id: &str) -> DomainResult<bool>;
}
