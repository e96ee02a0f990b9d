//! Host-side bring-up harness for the iop16 co-processor.
//!
//! The iop16 is a tiny 16-bit I/O processor sitting behind a word-addressed
//! register window on a LEON3 bus. This crate loads its instruction memory,
//! starts it, and runs one of two completion handshakes over the shared
//! general register.
//!
//! # Layers
//!
//! ```text
//! Controller      load / verify / run / wait / halt sequence
//!   Iop16Regs     named registers + instruction slots, capability checks
//!     RegisterBus word-granular volatile bus
//!       MappedRegion    live window (MMIO)
//!       SimulatedIop16  software device for hosted runs and tests
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use iop16_driver::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let map = RegisterMap::leon3_minimal();
//! // SAFETY: freestanding target with the iop16 identity-mapped at its bus address.
//! let bus = unsafe { MappedRegion::leon3_minimal() }.expect("aligned base");
//! let mut regs = Iop16Regs::new(bus, map)?;
//!
//! let controller = Controller::new(HarnessConfig::new(HandshakeMode::VerifyReport));
//! let report = controller.run(&RomImage::selftest(), &mut regs)?;
//! println!("{} mismatches, done after {} polls", report.mismatches.len(), report.polls);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod backend;
pub mod backends;
pub mod config;
pub mod controller;
mod device;
mod error;
pub mod loading;
pub mod mmio;
pub mod poll;

pub use backend::{BackendType, RegisterBus};
pub use backends::software::{BusEvent, DeviceBehavior, SimulatedIop16};
pub use config::{HandshakeMode, HarnessConfig};
pub use controller::{idle, Controller, RunReport};
pub use device::Iop16Regs;
pub use error::{Iop16Error, Result};
pub use loading::{Mismatch, RomImage};
pub use mmio::MappedRegion;
pub use poll::{CancelToken, PollConfig, PollLimit, PollOutcome};

/// Chip model types (re-exported from iop16-chip).
pub mod chip {
    pub use iop16_chip::{ports, program, regs, window};
    pub use iop16_chip::{Block, Capabilities, Register, RegisterMap, Revision};
}

/// Commonly used types.
pub mod prelude {
    pub use crate::chip::{Register, RegisterMap, Revision};
    pub use crate::{
        CancelToken, Controller, HandshakeMode, HarnessConfig, Iop16Error, Iop16Regs,
        MappedRegion, PollLimit, RegisterBus, Result, RomImage, RunReport, SimulatedIop16,
    };
}
