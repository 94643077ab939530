//! Adapter implementations of the job store port.

pub mod memory;
pub mod postgres;
