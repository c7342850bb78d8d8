//! User aggregate
//!
//! Staff and guest accounts, read-only here: login lookup only.

pub mod model;
pub mod repository;

pub use model::User;
pub use repository::UserRepository;
