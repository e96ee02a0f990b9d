//! Instruction image format.
//!
//! An iop16 program is a flat array of 16-bit instructions. The instruction
//! memory is 32 bits wide on the host side: each slot holds one instruction
//! zero-extended, and reads return only the low 16 bits that the memory
//! actually stores.
//!
//! Image files are raw little-endian instruction pairs, no header.

/// Bits per instruction.
pub const INSTRUCTION_BITS: u32 = 16;

/// Bits of a host word that instruction memory stores.
pub const INSTRUCTION_MASK: u32 = 0xFFFF;

/// Bytes per instruction in an image file.
pub const INSTRUCTION_BYTES: usize = 2;

/// Conventional image file extension.
pub const EXTENSION: &str = ".rom";

/// Self-test program: loads `0xAB` into the handshake register and spins.
pub const SELFTEST_IMAGE: [u16; 6] = [0x4107, 0xb1ff, 0xf001, 0x41ab, 0x7120, 0xd005];

/// Host word written for an instruction.
#[must_use]
pub const fn to_word(insn: u16) -> u32 {
    insn as u32
}

/// Instruction stored in a host word.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn from_word(word: u32) -> u16 {
    (word & INSTRUCTION_MASK) as u16
}
