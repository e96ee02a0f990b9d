//! Typed iop16 register handle
//!
//! Binds a [`RegisterBus`] to a [`RegisterMap`] so callers name registers
//! instead of offsets. Fields missing from the map revision and
//! instruction indices past the end of instruction memory are rejected
//! before they reach the bus.

use crate::backend::RegisterBus;
use crate::error::{Iop16Error, Result};
use iop16_chip::program::{from_word, to_word};
use iop16_chip::{Register, RegisterMap};

/// iop16 register handle
#[derive(Debug)]
pub struct Iop16Regs<B: RegisterBus> {
    bus: B,
    map: RegisterMap,
}

impl<B: RegisterBus> Iop16Regs<B> {
    /// Bind a bus to a register map
    ///
    /// # Errors
    ///
    /// Returns error if the bus window is smaller than the map's region.
    pub fn new(bus: B, map: RegisterMap) -> Result<Self> {
        let words = bus.size_words();
        if words < map.region_words() {
            return Err(Iop16Error::RegionTooSmall {
                words,
                required: map.region_words(),
            });
        }
        tracing::debug!(
            "iop16 handle: {} backend, {:?} revision, {} ROM words at word {}",
            bus.backend_type(),
            map.revision(),
            map.rom_words(),
            map.header_window_words()
        );
        Ok(Self { bus, map })
    }

    /// Register map in use
    pub const fn map(&self) -> &RegisterMap {
        &self.map
    }

    /// Underlying bus
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    /// Underlying bus, mutably
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the bus
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Read a header register
    ///
    /// # Errors
    ///
    /// Returns error if the register is not present on the map revision.
    pub fn read(&mut self, reg: Register) -> Result<u32> {
        self.check(reg)?;
        Ok(self.bus.read32(self.map.word_offset(reg)))
    }

    /// Write a header register
    ///
    /// # Errors
    ///
    /// Returns error if the register is not present on the map revision.
    pub fn write(&mut self, reg: Register, value: u32) -> Result<()> {
        self.check(reg)?;
        tracing::trace!("{reg} <- {value:#x}");
        self.bus.write32(self.map.word_offset(reg), value);
        Ok(())
    }

    /// Write one instruction, zero-extended, into instruction memory
    ///
    /// # Errors
    ///
    /// Returns error if `index` is outside instruction memory.
    pub fn write_rom(&mut self, index: usize, insn: u16) -> Result<()> {
        let offset = self.rom_offset(index)?;
        self.bus.write32(offset, to_word(insn));
        Ok(())
    }

    /// Read one instruction back, truncated to 16 bits
    ///
    /// # Errors
    ///
    /// Returns error if `index` is outside instruction memory.
    pub fn read_rom(&mut self, index: usize) -> Result<u16> {
        let offset = self.rom_offset(index)?;
        Ok(from_word(self.bus.read32(offset)))
    }

    fn check(&self, reg: Register) -> Result<()> {
        if self.map.is_populated(reg) {
            Ok(())
        } else {
            Err(Iop16Error::missing_capability(reg))
        }
    }

    fn rom_offset(&self, index: usize) -> Result<usize> {
        self.map
            .rom_word_offset(index)
            .ok_or(Iop16Error::RomIndexOutOfRange {
                index,
                capacity: self.map.rom_words(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::software::SimulatedIop16;
    use iop16_chip::Revision;

    #[test]
    fn rejects_short_window() {
        let sim = SimulatedIop16::new(RegisterMap::compact(Revision::Systest, 8));
        let err = Iop16Regs::new(sim, RegisterMap::compact(Revision::Systest, 16)).unwrap_err();
        assert!(matches!(
            err,
            Iop16Error::RegionTooSmall {
                words: 40,
                required: 48
            }
        ));
    }

    #[test]
    fn register_and_rom_access() {
        let map = RegisterMap::compact(Revision::Systest, 8);
        let mut regs = Iop16Regs::new(SimulatedIop16::new(map), map).unwrap();
        regs.write(Register::GpioDout, 0x5a).unwrap();
        assert_eq!(regs.read(Register::GpioDout).unwrap(), 0x5a);

        regs.write_rom(7, 0xb1ff).unwrap();
        assert_eq!(regs.read_rom(7).unwrap(), 0xb1ff);
        assert!(matches!(
            regs.write_rom(8, 0),
            Err(Iop16Error::RomIndexOutOfRange { index: 8, capacity: 8 })
        ));
    }

    #[test]
    fn missing_fields_rejected() {
        let map = RegisterMap::compact(Revision::Minimal, 8);
        let mut regs = Iop16Regs::new(SimulatedIop16::new(map), map).unwrap();
        assert!(matches!(
            regs.write(Register::ScalerReload, 9),
            Err(Iop16Error::MissingCapability {
                register: Register::ScalerReload
            })
        ));
        assert!(regs.read(Register::Dbg).is_err());
        assert!(regs.write(Register::Reg, 0x80).is_ok());
    }
}
