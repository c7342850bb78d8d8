//! Interface layer - protocol adapters

pub mod tcp;
