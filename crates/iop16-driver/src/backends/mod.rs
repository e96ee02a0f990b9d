//! Register bus backends
//!
//! - **MMIO**: the live register window ([`crate::mmio::MappedRegion`])
//! - **Software**: simulated iop16 for hosted runs and tests

pub mod software;

pub use software::{BusEvent, DeviceBehavior, SimulatedIop16};
