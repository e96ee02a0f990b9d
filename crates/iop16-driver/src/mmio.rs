//! Memory-mapped I/O for the iop16 register window
//!
//! [`MappedRegion`] is the only place in the workspace that dereferences a
//! device address. It hands out word-granular volatile accesses and nothing
//! else: no slices, no references into the window, no pointer arithmetic for
//! callers.

// MMIO words are naturally aligned by the bus; the base is checked once.
#![allow(clippy::cast_ptr_alignment)]

use crate::backend::{BackendType, RegisterBus};
use iop16_chip::window::{BASE_ADDRESS, REGION_WORDS, WORD_BYTES};
use std::ptr::NonNull;

/// Live iop16 register window
pub struct MappedRegion {
    /// First word of the window
    ptr: NonNull<u32>,
    /// Size of the window in words
    words: usize,
}

impl std::fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegion")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("words", &self.words)
            .finish()
    }
}

// SAFETY: Send - the window is a fixed physical range with no thread-local
// state. Moving the handle to another thread does not invalidate it.
unsafe impl Send for MappedRegion {}

impl MappedRegion {
    /// Wrap a pointer to the first word of a register window.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for volatile reads and writes of `words` aligned
    /// `u32` values for the lifetime of the returned handle, and nothing else
    /// may hold a Rust reference into that range.
    pub const unsafe fn from_raw(ptr: NonNull<u32>, words: usize) -> Self {
        Self { ptr, words }
    }

    /// Wrap the window at a physical base address.
    ///
    /// Returns `None` if `base` is null or not word aligned.
    ///
    /// # Safety
    ///
    /// Same contract as [`from_raw`](Self::from_raw): on a freestanding
    /// target with identity mapping, `base` must be the device's bus address
    /// and `words` must not exceed the decoded window.
    pub unsafe fn from_base_address(base: usize, words: usize) -> Option<Self> {
        if base % WORD_BYTES != 0 {
            return None;
        }
        let ptr = NonNull::new(base as *mut u32)?;
        // SAFETY: forwarded from the caller.
        Some(unsafe { Self::from_raw(ptr, words) })
    }

    /// Window of the LEON3 minimal design at its fixed bus address.
    ///
    /// # Safety
    ///
    /// Only sound on the target itself, with the iop16 decoded at
    /// [`BASE_ADDRESS`] and no MMU remapping.
    pub unsafe fn leon3_minimal() -> Option<Self> {
        // SAFETY: forwarded from the caller.
        unsafe { Self::from_base_address(BASE_ADDRESS, REGION_WORDS) }
    }

    /// Read a 32-bit register
    ///
    /// # Panics
    ///
    /// Panics if `word_offset` is outside the window.
    pub fn read32(&self, word_offset: usize) -> u32 {
        assert!(word_offset < self.words, "Register offset out of bounds");
        // SAFETY: read_volatile necessary for MMIO - the device changes values
        // behind our back. Invariants: (1) ptr valid for self.words words per
        // from_raw contract; (2) word_offset < words; (3) u32 aligned.
        unsafe { self.ptr.as_ptr().add(word_offset).read_volatile() }
    }

    /// Write a 32-bit register
    ///
    /// # Panics
    ///
    /// Panics if `word_offset` is outside the window.
    pub fn write32(&self, word_offset: usize, value: u32) {
        assert!(word_offset < self.words, "Register offset out of bounds");
        // SAFETY: write_volatile necessary for MMIO - writes trigger device
        // side effects. Invariants: (1) ptr valid per from_raw contract;
        // (2) word_offset < words; (3) u32 aligned.
        unsafe { self.ptr.as_ptr().add(word_offset).write_volatile(value) }
    }

    /// Get window size in words
    pub const fn words(&self) -> usize {
        self.words
    }
}

impl RegisterBus for MappedRegion {
    fn read32(&mut self, word_offset: usize) -> u32 {
        Self::read32(self, word_offset)
    }

    fn write32(&mut self, word_offset: usize, value: u32) {
        Self::write32(self, word_offset, value);
    }

    fn size_words(&self) -> usize {
        self.words
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mmio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_over(buf: &mut [u32]) -> MappedRegion {
        // SAFETY: buf outlives the region in every test and is only touched
        // through it while the region is alive.
        unsafe { MappedRegion::from_raw(NonNull::new(buf.as_mut_ptr()).unwrap(), buf.len()) }
    }

    #[test]
    fn volatile_round_trip() {
        let mut buf = vec![0u32; 16];
        let region = region_over(&mut buf);
        region.write32(3, 0xdead_beef);
        assert_eq!(region.read32(3), 0xdead_beef);
        assert_eq!(region.read32(4), 0);
        drop(region);
        assert_eq!(buf[3], 0xdead_beef);
    }

    #[test]
    #[should_panic(expected = "Register offset out of bounds")]
    fn out_of_bounds_panics() {
        let mut buf = vec![0u32; 4];
        let region = region_over(&mut buf);
        region.read32(4);
    }

    #[test]
    fn rejects_null_and_misaligned_base() {
        // SAFETY: construction only; neither handle is dereferenced.
        unsafe {
            assert!(MappedRegion::from_base_address(0, 8).is_none());
            assert!(MappedRegion::from_base_address(BASE_ADDRESS + 2, 8).is_none());
        }
    }

    #[test]
    fn bus_trait_dispatch() {
        let mut buf = vec![0u32; 8];
        let mut region = region_over(&mut buf);
        let bus: &mut dyn RegisterBus = &mut region;
        bus.write32(1, 7);
        assert_eq!(bus.read32(1), 7);
        assert_eq!(bus.size_words(), 8);
        assert_eq!(bus.backend_type(), BackendType::Mmio);
    }
}
