//! Device-side I/O port table.
//!
//! This is how the iop16 program itself addresses its peripherals: 8-bit
//! ports, grouped in blocks of 16. The host never uses these numbers, but
//! several ports share storage with host-visible registers, which
//! [`host_view`] resolves.
//!
//! ```text
//! 0x00  timer    scaler reload H/L, scaler value H/L,
//!                timer reload H/L, timer value H/L, ctrl
//! 0x10  gpio     din, dout, dir
//! 0x20  reg      reg0..reg3, dbg
//! 0x30  shreg    shreg0..shreg7, lsb, msb
//! ```

use crate::regs::Register;

/// Ports per device-side block.
pub const PORT_BLOCK_STRIDE: u8 = 0x10;

/// Number of addressable ports.
pub const PORT_COUNT: usize = 0x40;

/// Timer ports.
pub mod timer {
    /// Block base.
    pub const START: u8 = 0x00;
    pub const SCALER_RELOAD_H: u8 = START | 0x00;
    pub const SCALER_RELOAD_L: u8 = START | 0x01;
    pub const SCALER_VALUE_H: u8 = START | 0x02;
    pub const SCALER_VALUE_L: u8 = START | 0x03;
    pub const TIMER_RELOAD_H: u8 = START | 0x04;
    pub const TIMER_RELOAD_L: u8 = START | 0x05;
    pub const TIMER_VALUE_H: u8 = START | 0x06;
    pub const TIMER_VALUE_L: u8 = START | 0x07;
    pub const CTRL: u8 = START | 0x08;
}

/// GPIO ports.
pub mod gpio {
    /// Block base.
    pub const START: u8 = 0x10;
    pub const DIN: u8 = START | 0x00;
    pub const DOUT: u8 = START | 0x01;
    pub const DIR: u8 = START | 0x02;
}

/// General register ports. `REG_0` is the handshake register the host sees
/// as `reg.reg`.
pub mod reg {
    /// Block base.
    pub const START: u8 = 0x20;
    pub const REG_0: u8 = START | 0x00;
    pub const REG_1: u8 = START | 0x01;
    pub const REG_2: u8 = START | 0x02;
    pub const REG_3: u8 = START | 0x03;
    pub const DBG: u8 = START | 0x04;
}

/// Shift register ports (device-private).
pub mod shreg {
    /// Block base.
    pub const START: u8 = 0x30;
    pub const SHREG_0: u8 = START | 0x00;
    pub const SHREG_1: u8 = START | 0x01;
    pub const SHREG_2: u8 = START | 0x02;
    pub const SHREG_3: u8 = START | 0x03;
    pub const SHREG_4: u8 = START | 0x04;
    pub const SHREG_5: u8 = START | 0x05;
    pub const SHREG_6: u8 = START | 0x06;
    pub const SHREG_7: u8 = START | 0x07;
    pub const LSB: u8 = START | 0x08;
    pub const MSB: u8 = START | 0x09;
}

/// Byte of a host word that a device port aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Bits 7..0.
    Low,
    /// Bits 15..8.
    High,
}

impl Lane {
    /// Bit shift of the lane within the host word.
    #[must_use]
    pub const fn shift(self) -> u32 {
        match self {
            Self::Low => 0,
            Self::High => 8,
        }
    }

    /// Replace this lane of `word` with `byte`.
    #[must_use]
    pub const fn insert(self, word: u32, byte: u8) -> u32 {
        let shift = self.shift();
        (word & !(0xFF << shift)) | ((byte as u32) << shift)
    }

    /// Extract this lane from `word`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn extract(self, word: u32) -> u8 {
        (word >> self.shift()) as u8
    }
}

/// Host register and lane sharing storage with a device port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostView {
    /// Host-visible register.
    pub register: Register,
    /// Byte within it.
    pub lane: Lane,
}

/// Resolve a device port to the host register it aliases.
///
/// Returns `None` for device-private ports (`reg1`..`reg3`, shift register)
/// and for unassigned port numbers.
#[must_use]
pub const fn host_view(port: u8) -> Option<HostView> {
    let (register, lane) = match port {
        timer::SCALER_RELOAD_H => (Register::ScalerReload, Lane::High),
        timer::SCALER_RELOAD_L => (Register::ScalerReload, Lane::Low),
        timer::SCALER_VALUE_H => (Register::ScalerValue, Lane::High),
        timer::SCALER_VALUE_L => (Register::ScalerValue, Lane::Low),
        timer::TIMER_RELOAD_H => (Register::TimerReload, Lane::High),
        timer::TIMER_RELOAD_L => (Register::TimerReload, Lane::Low),
        timer::TIMER_VALUE_H => (Register::TimerValue, Lane::High),
        timer::TIMER_VALUE_L => (Register::TimerValue, Lane::Low),
        timer::CTRL => (Register::TimerCtrl, Lane::Low),
        gpio::DIN => (Register::GpioDin, Lane::Low),
        gpio::DOUT => (Register::GpioDout, Lane::Low),
        gpio::DIR => (Register::GpioDir, Lane::Low),
        reg::REG_0 => (Register::Reg, Lane::Low),
        reg::DBG => (Register::Dbg, Lane::Low),
        _ => return None,
    };
    Some(HostView { register, lane })
}

/// True if `port` is a defined port number.
#[must_use]
pub const fn is_defined(port: u8) -> bool {
    matches!(
        port,
        timer::SCALER_RELOAD_H..=timer::CTRL
            | gpio::DIN..=gpio::DIR
            | reg::REG_0..=reg::DBG
            | shreg::SHREG_0..=shreg::MSB
    )
}
