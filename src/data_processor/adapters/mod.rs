//! Adapter implementations of the data processor ports.

pub mod memory;
pub mod postgres;
