//! Room repository interface

use async_trait::async_trait;

use super::model::Room;
use crate::domain::DomainResult;

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// All rooms, in the store's stable order
    async fn find_all(&self) -> DomainResult<Vec<Room>>;

    /// Find a room by its number
    async fn find_by_number(&self, number: &str) -> DomainResult<Option<Room>>;

    /// Add a new room (`Conflict` if the number is taken)
    async fn add(&self, room: Room) -> DomainResult<()>;

    /// Replace an existing room (`NotFound` if absent)
    async fn update(&self, room: Room) -> DomainResult<()>;

    /// Delete a room; `false` when no such room existed
    async fn delete(&self, number: &str) -> DomainResult<bool>;
}
