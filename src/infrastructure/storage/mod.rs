//! Record store implementations

pub mod csv;
mod memory;

pub use csv::CsvRepositoryProvider;
pub use memory::InMemoryRepositoryProvider;
