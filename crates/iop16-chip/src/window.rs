//! Host address window for the iop16 on the LEON3 minimal design.
//!
//! The co-processor sits on the AHB/APB bus as a single word-addressed slave.
//! The host sees it as one contiguous region split into a header window
//! (control, timer, GPIO and general register blocks) followed by the
//! instruction memory.
//!
//! ```text
//! Byte offset   Words   Contents
//! ───────────── ─────── ──────────────────────────────────────────────
//!  0x0000        8      Control block   (ctrl, sim)
//!  0x0020        8      Timer block     (scaler/timer reload+value, ctrl)
//!  0x0040        8      GPIO block      (din, dout, dir)
//!  0x0060        8      General block   (reg [, dbg])
//!  0x0080        ...    unused header window filler
//!  0x4000        4096   Instruction memory (one 16-bit insn per word)
//! ```
//!
//! The header window is as large as the instruction memory: the runtime
//! layout overlays the header blocks with an N-word padding array, so the
//! instruction memory lands on the second half of the region.

/// Physical base address of the iop16 slave.
pub const BASE_ADDRESS: usize = 0x8008_0000;

/// Bytes per register word.
pub const WORD_BYTES: usize = 4;

/// Words per header block, populated or not.
pub const BLOCK_STRIDE_WORDS: usize = 8;

/// Bytes per header block.
pub const BLOCK_STRIDE_BYTES: usize = BLOCK_STRIDE_WORDS * WORD_BYTES;

/// Instruction memory depth in words.
pub const ROM_WORDS: usize = 4096;

/// Header window on the hardware layout (overlaid with an N-word pad).
pub const HEADER_WINDOW_WORDS: usize = ROM_WORDS;

/// Byte offset of instruction word 0 from [`BASE_ADDRESS`].
pub const ROM_BYTE_OFFSET: usize = HEADER_WINDOW_WORDS * WORD_BYTES;

/// Total region size in words.
pub const REGION_WORDS: usize = HEADER_WINDOW_WORDS + ROM_WORDS;

/// Total region size in bytes.
pub const REGION_BYTES: usize = REGION_WORDS * WORD_BYTES;

/// Absolute bus address of a word offset inside the region.
#[must_use]
pub const fn bus_address(word_offset: usize) -> usize {
    BASE_ADDRESS + word_offset * WORD_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rom_starts_at_second_half() {
        assert_eq!(ROM_BYTE_OFFSET, 0x4000);
        assert_eq!(REGION_BYTES, 0x8000);
    }

    #[test]
    fn bus_addresses() {
        assert_eq!(bus_address(0), 0x8008_0000);
        assert_eq!(bus_address(1), 0x8008_0004);
        assert_eq!(bus_address(HEADER_WINDOW_WORDS), 0x8008_4000);
    }
}
