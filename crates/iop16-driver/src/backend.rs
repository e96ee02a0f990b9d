//! Register bus abstraction
//!
//! The controller never touches memory directly. It talks to a
//! [`RegisterBus`], which is either the live device window
//! ([`MappedRegion`](crate::mmio::MappedRegion)) or the simulated
//! co-processor used on a hosted build.

use std::fmt::Debug;

/// Word-addressed access to an iop16 register region.
///
/// Every call is one bus transaction. Implementations must not cache,
/// merge, or reorder accesses: the device may change any value between two
/// reads, and every write may have a side effect.
pub trait RegisterBus: Debug {
    /// Read the 32-bit word at `word_offset` from the region base.
    fn read32(&mut self, word_offset: usize) -> u32;

    /// Write the 32-bit word at `word_offset` from the region base.
    fn write32(&mut self, word_offset: usize, value: u32);

    /// Size of the region in words.
    fn size_words(&self) -> usize;

    /// Backend type for logging
    fn backend_type(&self) -> BackendType;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read32(&mut self, word_offset: usize) -> u32 {
        (**self).read32(word_offset)
    }

    fn write32(&mut self, word_offset: usize, value: u32) {
        (**self).write32(word_offset, value);
    }

    fn size_words(&self) -> usize {
        (**self).size_words()
    }

    fn backend_type(&self) -> BackendType {
        (**self).backend_type()
    }
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Volatile access to the physical register window
    Mmio,

    /// Simulated co-processor, no hardware required
    Software,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mmio => write!(f, "MMIO"),
            Self::Software => write!(f, "Software (simulated iop16)"),
        }
    }
}
