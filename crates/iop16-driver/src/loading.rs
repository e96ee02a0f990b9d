//! Instruction image upload and readback
//!
//! [`RomImage`] holds the raw little-endian image bytes; [`upload`] copies
//! them into instruction memory in index order and [`verify`] reads every
//! slot back, reporting each slot whose low 16 bits differ from the source.

use crate::backend::RegisterBus;
use crate::device::Iop16Regs;
use crate::error::{Iop16Error, Result};
use bytes::Bytes;
use iop16_chip::program::{INSTRUCTION_BYTES, SELFTEST_IMAGE};
use iop16_chip::regs::diagnostic;
use iop16_chip::RegisterMap;
use std::path::Path;
use tracing::{debug, info};

/// iop16 instruction image
///
/// Immutable; clones share the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomImage {
    /// Little-endian instruction pairs
    data: Bytes,

    /// Wrapping sum of all instructions
    checksum: u16,
}

impl RomImage {
    /// Build an image from instructions
    pub fn from_words(words: &[u16]) -> Self {
        let data: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Self::from_checked_bytes(Bytes::from(data))
    }

    /// Build an image from raw little-endian bytes
    ///
    /// # Errors
    ///
    /// Returns error if the byte count is odd.
    pub fn from_le_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() % INSTRUCTION_BYTES != 0 {
            return Err(Iop16Error::invalid_image(format!(
                "{} bytes is not a whole number of {INSTRUCTION_BYTES}-byte instructions",
                data.len()
            )));
        }
        Ok(Self::from_checked_bytes(data))
    }

    /// Read an image file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or has an odd length.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = Self::from_le_bytes(std::fs::read(path)?)?;
        info!(
            "Read {} ({} instructions, checksum {:#06x})",
            path.display(),
            image.len(),
            image.checksum
        );
        Ok(image)
    }

    /// The built-in self-test program
    pub fn selftest() -> Self {
        Self::from_words(&SELFTEST_IMAGE)
    }

    fn from_checked_bytes(data: Bytes) -> Self {
        let checksum = data
            .chunks_exact(INSTRUCTION_BYTES)
            .fold(0u16, |acc, pair| {
                acc.wrapping_add(u16::from_le_bytes([pair[0], pair[1]]))
            });
        Self { data, checksum }
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.data.len() / INSTRUCTION_BYTES
    }

    /// True if the image holds no instructions
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Instruction at `index`
    pub fn word(&self, index: usize) -> Option<u16> {
        let start = index.checked_mul(INSTRUCTION_BYTES)?;
        let end = start.checked_add(INSTRUCTION_BYTES)?;
        let pair = self.data.get(start..end)?;
        Some(u16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Instructions in index order
    pub fn words(&self) -> impl Iterator<Item = u16> + '_ {
        self.data
            .chunks_exact(INSTRUCTION_BYTES)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Wrapping 16-bit sum of all instructions
    pub const fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Raw little-endian bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Check the image fits the map's instruction memory
    ///
    /// # Errors
    ///
    /// Returns error if the image is longer than instruction memory.
    pub fn validate_for(&self, map: &RegisterMap) -> Result<()> {
        if map.fits(self.len()) {
            Ok(())
        } else {
            Err(Iop16Error::image_too_large(self.len(), map.rom_words()))
        }
    }
}

/// An instruction slot whose readback differs from the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Instruction index
    pub index: usize,
    /// Value in the image
    pub expected: u16,
    /// Value read back (low 16 bits)
    pub observed: u16,
}

impl Mismatch {
    /// `ctrl.sim` encoding of this mismatch
    pub const fn diagnostic(&self) -> u32 {
        diagnostic::mismatch(self.index, self.observed as u32)
    }
}

/// Copy every instruction into instruction memory, index order
///
/// Returns the number of words written.
///
/// # Errors
///
/// Returns error if the image is longer than instruction memory. Nothing is
/// written in that case.
pub fn upload<B: RegisterBus>(image: &RomImage, regs: &mut Iop16Regs<B>) -> Result<usize> {
    image.validate_for(regs.map())?;
    for (index, insn) in image.words().enumerate() {
        regs.write_rom(index, insn)?;
    }
    debug!(
        "Uploaded {} instructions (checksum {:#06x})",
        image.len(),
        image.checksum()
    );
    Ok(image.len())
}

/// Read back every instruction and compare with the image
///
/// `on_mismatch` runs for each mismatch as soon as it is found, before the
/// next slot is read, so any register writes it makes land in bus order
/// between the readbacks. Returns all mismatches in index order.
///
/// # Errors
///
/// Returns error if the image is longer than instruction memory, or if
/// `on_mismatch` fails.
pub fn verify<B, F>(
    image: &RomImage,
    regs: &mut Iop16Regs<B>,
    mut on_mismatch: F,
) -> Result<Vec<Mismatch>>
where
    B: RegisterBus,
    F: FnMut(&mut Iop16Regs<B>, &Mismatch) -> Result<()>,
{
    image.validate_for(regs.map())?;
    let mut mismatches = Vec::new();
    for (index, expected) in image.words().enumerate() {
        let observed = regs.read_rom(index)?;
        if observed != expected {
            let mismatch = Mismatch {
                index,
                expected,
                observed,
            };
            on_mismatch(regs, &mismatch)?;
            mismatches.push(mismatch);
        }
    }
    debug!(
        "Verified {} instructions, {} mismatches",
        image.len(),
        mismatches.len()
    );
    Ok(mismatches)
}
