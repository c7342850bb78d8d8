//! Payment repository interface

use async_trait::async_trait;

use super::model::Payment;
use crate::domain::DomainResult;

/// Payments are append-only: there is no update or delete.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_all(&self) -> DomainResult<Vec<Payment>>;

    /// The most recently written payment for a reservation
    async fn find_latest_by_reservation_id(
        &self,
        reservation_id: &str,
    ) -> DomainResult<Option<Payment>>;

    async fn add(&self, payment: Payment) -> DomainResult<()>;
}
