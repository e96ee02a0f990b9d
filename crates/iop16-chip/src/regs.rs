//! Host-side register map for the iop16.
//!
//! Every header block occupies [`BLOCK_STRIDE_WORDS`] words no matter how many
//! fields it actually uses; the unused tail is filler that nothing reads or
//! writes. Blocks always appear in the order Control, Timer, GPIO, General,
//! and the instruction memory follows the header window.
//!
//! Field offsets are identical across map revisions. A revision only says
//! which fields are backed by hardware (see [`Capabilities`]).
//!
//! ```text
//! word  block    fields
//! ────  ───────  ──────────────────────────────────────────────────────
//!  0    Control  ctrl, sim
//!  8    Timer    scaler_reload, scaler_value, timer_reload, timer_value, ctrl
//! 16    GPIO     din, dout, dir
//! 24    General  reg, dbg (debug revision only)
//! ```

use crate::window::{BLOCK_STRIDE_WORDS, HEADER_WINDOW_WORDS, ROM_WORDS, WORD_BYTES};
use std::fmt;
use std::ops::Range;

// ── Blocks ───────────────────────────────────────────────────────────────────

/// Header block of the register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Block {
    /// Run control and the diagnostic (`sim`) word.
    Control,
    /// Prescaler and timer.
    Timer,
    /// General-purpose I/O.
    Gpio,
    /// Shared host/device handshake register.
    General,
}

impl Block {
    /// Blocks in address order.
    pub const ALL: [Self; 4] = [Self::Control, Self::Timer, Self::Gpio, Self::General];

    /// Position of the block in the header.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Control => 0,
            Self::Timer => 1,
            Self::Gpio => 2,
            Self::General => 3,
        }
    }

    /// Word offset of the block's first field.
    #[must_use]
    pub const fn base_word(self) -> usize {
        self.index() * BLOCK_STRIDE_WORDS
    }

    /// Fields declared by the block on the widest revision.
    #[must_use]
    pub const fn declared_fields(self) -> usize {
        match self {
            Self::Control => 2,
            Self::Timer => 5,
            Self::Gpio => 3,
            Self::General => 2,
        }
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Control => "ctrl",
            Self::Timer => "timer",
            Self::Gpio => "gpio",
            Self::General => "reg",
        }
    }
}

/// Number of header blocks.
pub const HEADER_BLOCKS: usize = Block::ALL.len();

/// Words covered by the padded header blocks themselves.
pub const HEADER_WORDS: usize = HEADER_BLOCKS * BLOCK_STRIDE_WORDS;

// ── Registers ────────────────────────────────────────────────────────────────

/// A named 32-bit field of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// `ctrl.ctrl`: host run request (0 halted, 1 run).
    Ctrl,
    /// `ctrl.sim`: diagnostic / result word observed by the test bench.
    Sim,
    /// `timer.scaler_reload`
    ScalerReload,
    /// `timer.scaler_value`
    ScalerValue,
    /// `timer.timer_reload`
    TimerReload,
    /// `timer.timer_value`
    TimerValue,
    /// `timer.ctrl`
    TimerCtrl,
    /// `gpio.din`
    GpioDin,
    /// `gpio.dout`
    GpioDout,
    /// `gpio.dir`
    GpioDir,
    /// `reg.reg`: handshake/status register shared with the device.
    Reg,
    /// `reg.dbg`: debug register (debug revision only).
    Dbg,
}

impl Register {
    /// All registers in address order.
    pub const ALL: [Self; 12] = [
        Self::Ctrl,
        Self::Sim,
        Self::ScalerReload,
        Self::ScalerValue,
        Self::TimerReload,
        Self::TimerValue,
        Self::TimerCtrl,
        Self::GpioDin,
        Self::GpioDout,
        Self::GpioDir,
        Self::Reg,
        Self::Dbg,
    ];

    /// Block containing this register.
    #[must_use]
    pub const fn block(self) -> Block {
        match self {
            Self::Ctrl | Self::Sim => Block::Control,
            Self::ScalerReload
            | Self::ScalerValue
            | Self::TimerReload
            | Self::TimerValue
            | Self::TimerCtrl => Block::Timer,
            Self::GpioDin | Self::GpioDout | Self::GpioDir => Block::Gpio,
            Self::Reg | Self::Dbg => Block::General,
        }
    }

    /// Word index inside the block.
    #[must_use]
    pub const fn field_index(self) -> usize {
        match self {
            Self::Ctrl | Self::ScalerReload | Self::GpioDin | Self::Reg => 0,
            Self::Sim | Self::ScalerValue | Self::GpioDout | Self::Dbg => 1,
            Self::TimerReload | Self::GpioDir => 2,
            Self::TimerValue => 3,
            Self::TimerCtrl => 4,
        }
    }

    /// Word offset from the region base.
    #[must_use]
    pub const fn word_offset(self) -> usize {
        self.block().base_word() + self.field_index()
    }

    /// Byte offset from the region base.
    #[must_use]
    pub const fn byte_offset(self) -> usize {
        self.word_offset() * WORD_BYTES
    }

    /// Field name inside its block.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Ctrl | Self::TimerCtrl => "ctrl",
            Self::Sim => "sim",
            Self::ScalerReload => "scaler_reload",
            Self::ScalerValue => "scaler_value",
            Self::TimerReload => "timer_reload",
            Self::TimerValue => "timer_value",
            Self::GpioDin => "din",
            Self::GpioDout => "dout",
            Self::GpioDir => "dir",
            Self::Reg => "reg",
            Self::Dbg => "dbg",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.block().name(), self.field_name())
    }
}

// ── Register bit definitions ─────────────────────────────────────────────────

/// `ctrl.ctrl` values.
pub mod control {
    /// Device halted; instruction memory owned by the host.
    pub const HALT: u32 = 0x00;
    /// Run request.
    pub const RUN: u32 = 0x01;
}

/// `reg.reg` handshake bits.
pub mod general {
    /// Host request flag, cleared by the device on acknowledge.
    pub const REQUEST: u32 = 0x80;
    /// Pass/fail bit left by the device on acknowledge.
    pub const RESULT: u32 = 0x01;
    /// Bits compared against [`DONE`].
    pub const DONE_MASK: u32 = 0xFF;
    /// Completion value written by the self-test program.
    pub const DONE: u32 = 0xAB;
}

/// `ctrl.sim` encodings.
pub mod diagnostic {
    /// Shift of the mismatching instruction index.
    pub const INDEX_SHIFT: u32 = 16;
    /// Mask applied to the index and to the observed value.
    pub const FIELD_MASK: u32 = 0xFFFF;

    /// Encode an upload mismatch: `(index << 16) | observed`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn mismatch(index: usize, observed: u32) -> u32 {
        (((index as u32) & FIELD_MASK) << INDEX_SHIFT) | (observed & FIELD_MASK)
    }

    /// Index half of a mismatch word.
    #[must_use]
    pub const fn index(word: u32) -> u32 {
        word >> INDEX_SHIFT
    }

    /// Observed-value half of a mismatch word.
    #[must_use]
    pub const fn observed(word: u32) -> u32 {
        word & FIELD_MASK
    }
}

/// Timer prescaler settings.
pub mod timer {
    /// Reload value for a divide-by-10 prescaler tick.
    pub const SCALER_DIVIDE_BY_10: u32 = 9;
}

// ── Revisions ────────────────────────────────────────────────────────────────

/// Which optional blocks and fields are backed by hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    /// Timer block present.
    pub has_timer: bool,
    /// GPIO block present.
    pub has_gpio: bool,
    /// `reg.dbg` present.
    pub has_debug_register: bool,
}

/// Register map revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Revision {
    /// Control and general register only.
    Minimal,
    /// Adds the timer and GPIO blocks (LEON3 minimal self-test design).
    Systest,
    /// Systest plus `reg.dbg`.
    Debug,
}

impl Revision {
    /// Capability set of this revision.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Minimal => Capabilities {
                has_timer: false,
                has_gpio: false,
                has_debug_register: false,
            },
            Self::Systest => Capabilities {
                has_timer: true,
                has_gpio: true,
                has_debug_register: false,
            },
            Self::Debug => Capabilities {
                has_timer: true,
                has_gpio: true,
                has_debug_register: true,
            },
        }
    }
}

// ── Map ──────────────────────────────────────────────────────────────────────

/// Layout of one iop16 register region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterMap {
    revision: Revision,
    header_window_words: usize,
    rom_words: usize,
}

impl RegisterMap {
    /// Hardware layout of the LEON3 minimal design: systest revision,
    /// 4096-word instruction memory behind a 4096-word header window.
    #[must_use]
    pub const fn leon3_minimal() -> Self {
        Self {
            revision: Revision::Systest,
            header_window_words: HEADER_WINDOW_WORDS,
            rom_words: ROM_WORDS,
        }
    }

    /// Layout with instruction memory right after the padded header blocks.
    #[must_use]
    pub const fn compact(revision: Revision, rom_words: usize) -> Self {
        Self {
            revision,
            header_window_words: HEADER_WORDS,
            rom_words,
        }
    }

    /// Replace the header window size.
    ///
    /// Returns `None` unless the window is a whole number of blocks and at
    /// least as large as the padded header.
    #[must_use]
    pub const fn with_header_window(self, words: usize) -> Option<Self> {
        if words < HEADER_WORDS || words % BLOCK_STRIDE_WORDS != 0 {
            return None;
        }
        Some(Self {
            header_window_words: words,
            ..self
        })
    }

    /// Same layout, different revision.
    #[must_use]
    pub const fn with_revision(self, revision: Revision) -> Self {
        Self { revision, ..self }
    }

    /// Map revision.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Capability flags of the revision.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.revision.capabilities()
    }

    /// Instruction memory depth in words.
    #[must_use]
    pub const fn rom_words(&self) -> usize {
        self.rom_words
    }

    /// Words reserved before instruction memory.
    #[must_use]
    pub const fn header_window_words(&self) -> usize {
        self.header_window_words
    }

    /// Total region size in words.
    #[must_use]
    pub const fn region_words(&self) -> usize {
        self.header_window_words + self.rom_words
    }

    /// Total region size in bytes.
    #[must_use]
    pub const fn region_bytes(&self) -> usize {
        self.region_words() * WORD_BYTES
    }

    /// Word offset of a register. Identical on every revision.
    #[must_use]
    pub const fn word_offset(&self, reg: Register) -> usize {
        reg.word_offset()
    }

    /// True if the register is backed by hardware on this revision.
    #[must_use]
    pub const fn is_populated(&self, reg: Register) -> bool {
        let caps = self.capabilities();
        match reg.block() {
            Block::Control => true,
            Block::Timer => caps.has_timer,
            Block::Gpio => caps.has_gpio,
            Block::General => match reg {
                Register::Dbg => caps.has_debug_register,
                _ => true,
            },
        }
    }

    /// Hardware-backed fields in a block.
    #[must_use]
    pub fn populated_fields(&self, block: Block) -> usize {
        Register::ALL
            .iter()
            .filter(|r| r.block() == block && self.is_populated(**r))
            .count()
    }

    /// Filler words after the block's populated fields.
    #[must_use]
    pub fn stride_padding(&self, block: Block) -> usize {
        BLOCK_STRIDE_WORDS - self.populated_fields(block)
    }

    /// Word offset of instruction slot `index`, if inside instruction memory.
    #[must_use]
    pub const fn rom_word_offset(&self, index: usize) -> Option<usize> {
        if index < self.rom_words {
            Some(self.header_window_words + index)
        } else {
            None
        }
    }

    /// Word range covered by instruction memory.
    #[must_use]
    pub const fn rom_range(&self) -> Range<usize> {
        self.header_window_words..self.region_words()
    }

    /// True if an image of `len` instructions fits in instruction memory.
    #[must_use]
    pub const fn fits(&self, len: usize) -> bool {
        len <= self.rom_words
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::leon3_minimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_on_stride_boundaries() {
        for block in Block::ALL {
            assert_eq!(block.base_word() % BLOCK_STRIDE_WORDS, 0);
            assert!(block.declared_fields() <= BLOCK_STRIDE_WORDS);
        }
        assert_eq!(Block::Timer.base_word(), 8);
        assert_eq!(Block::General.base_word(), 24);
    }

    #[test]
    fn systest_offsets() {
        assert_eq!(Register::Ctrl.word_offset(), 0);
        assert_eq!(Register::Sim.word_offset(), 1);
        assert_eq!(Register::ScalerReload.byte_offset(), 0x20);
        assert_eq!(Register::ScalerValue.byte_offset(), 0x24);
        assert_eq!(Register::TimerCtrl.word_offset(), 12);
        assert_eq!(Register::GpioDir.byte_offset(), 0x48);
        assert_eq!(Register::Reg.byte_offset(), 0x60);
        assert_eq!(Register::Dbg.byte_offset(), 0x64);
    }

    #[test]
    fn offsets_unique_and_inside_header() {
        for (i, a) in Register::ALL.iter().enumerate() {
            assert!(a.word_offset() < HEADER_WORDS);
            for b in &Register::ALL[i + 1..] {
                assert_ne!(a.word_offset(), b.word_offset(), "{a} overlaps {b}");
            }
        }
    }

    #[test]
    fn padding_follows_revision() {
        let systest = RegisterMap::leon3_minimal();
        assert_eq!(systest.stride_padding(Block::Control), 6);
        assert_eq!(systest.stride_padding(Block::Timer), 3);
        assert_eq!(systest.stride_padding(Block::Gpio), 5);
        assert_eq!(systest.stride_padding(Block::General), 7);

        let debug = systest.with_revision(Revision::Debug);
        assert_eq!(debug.stride_padding(Block::General), 6);

        let minimal = systest.with_revision(Revision::Minimal);
        assert_eq!(minimal.stride_padding(Block::Timer), BLOCK_STRIDE_WORDS);
        assert!(!minimal.is_populated(Register::ScalerReload));
        assert!(minimal.is_populated(Register::Reg));
    }

    #[test]
    fn hardware_layout() {
        let map = RegisterMap::leon3_minimal();
        assert_eq!(map.rom_word_offset(0), Some(4096));
        assert_eq!(map.rom_word_offset(4095), Some(8191));
        assert_eq!(map.rom_word_offset(4096), None);
        assert_eq!(map.region_bytes(), 0x8000);
        assert!(map.fits(4096));
        assert!(!map.fits(4097));
    }

    #[test]
    fn compact_layout_size() {
        let map = RegisterMap::compact(Revision::Systest, 64);
        assert_eq!(map.region_words(), HEADER_BLOCKS * BLOCK_STRIDE_WORDS + 64);
        assert_eq!(map.rom_range(), 32..96);
    }

    #[test]
    fn header_window_validation() {
        let map = RegisterMap::compact(Revision::Minimal, 16);
        assert!(map.with_header_window(16).is_none());
        assert!(map.with_header_window(33).is_none());
        assert_eq!(map.with_header_window(64).map(|m| m.rom_range().start), Some(64));
    }

    #[test]
    fn mismatch_encoding() {
        let word = diagnostic::mismatch(3, 0x0001_41aa);
        assert_eq!(word, 0x0003_41aa);
        assert_eq!(diagnostic::index(word), 3);
        assert_eq!(diagnostic::observed(word), 0x41aa);
        assert_eq!(diagnostic::mismatch(0x1_0002, 0x55), 0x0002_0055);
    }

    #[test]
    fn register_display() {
        assert_eq!(Register::Sim.to_string(), "ctrl.sim");
        assert_eq!(Register::TimerCtrl.to_string(), "timer.ctrl");
        assert_eq!(Register::Reg.to_string(), "reg.reg");
    }
}
