//! Room aggregate
//!
//! Contains the Room entity, the room category, and repository interface.

pub mod model;
pub mod repository;

pub use model::{Room, RoomType};
pub use repository::RoomRepository;
