// SPDX-License-Identifier: AGPL-3.0-only

//! Software (simulated iop16) backend
//!
//! Implements [`RegisterBus`] over plain memory with just enough device
//! behaviour to exercise both bring-up protocols without hardware:
//!
//! 1. **Truncating instruction memory**: slots keep the low 16 bits of each
//!    write, like the real 16-bit wide memory behind a 32-bit bus.
//!
//! 2. **Fault injection**: [`corrupt_rom`](SimulatedIop16::corrupt_rom)
//!    forces a slot to read back a chosen value.
//!
//! 3. **Scripted device response**: while `ctrl.ctrl` is 1, each host read
//!    of `reg.reg` counts as a poll. After a configured number of polls the
//!    device writes its answer through its own `REG_0` port.
//!
//! 4. **Bus log** (opt-in, [`with_event_log`](SimulatedIop16::with_event_log)):
//!    every host access is recorded so tests can assert the exact order of
//!    reads and writes. Off by default.
//!
//! The device side is modelled through the port table: device accesses that
//! alias a host register go to the same storage the host sees, everything
//! else lands in device-private port storage.

use crate::backend::{BackendType, RegisterBus};
use iop16_chip::ports::{self, PORT_COUNT};
use iop16_chip::program::INSTRUCTION_MASK;
use iop16_chip::regs::control;
use iop16_chip::{Register, RegisterMap};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What the simulated program does once started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceBehavior {
    /// Never touches `reg.reg`
    #[default]
    Halt,

    /// Writes `status` to `REG_0` after the host has polled `after_polls`
    /// times (the self-test program writes `0xAB`)
    SignalDone {
        /// Polls seen before the device answers
        after_polls: u64,
        /// Byte written to `REG_0`
        status: u8,
    },

    /// Consumes the `0x80` request after `after_polls` polls, leaving only
    /// the result bit in `REG_0`
    Acknowledge {
        /// Polls seen before the device answers
        after_polls: u64,
        /// Pass/fail bit left for the host
        result: bool,
    },
}

/// One host bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// Host read
    Read {
        /// Word offset
        offset: usize,
        /// Value returned
        value: u32,
    },
    /// Host write
    Write {
        /// Word offset
        offset: usize,
        /// Value written
        value: u32,
    },
}

/// Simulated iop16
#[derive(Debug)]
pub struct SimulatedIop16 {
    map: RegisterMap,
    /// Whole register region, header window and instruction memory
    words: Vec<u32>,
    /// Device-private ports (reg1..reg3, shift register)
    private_ports: [u8; PORT_COUNT],
    /// Forced readback values per instruction index
    faults: BTreeMap<usize, u16>,
    behavior: DeviceBehavior,
    /// Host polls of `reg.reg` since the last run request
    polls_since_start: u64,
    responded: bool,
    events: Vec<BusEvent>,
    record_events: bool,
}

impl SimulatedIop16 {
    /// Create a halted device with zeroed storage
    pub fn new(map: RegisterMap) -> Self {
        debug!(
            "SimulatedIop16: {:?} revision, {} words",
            map.revision(),
            map.region_words()
        );
        Self {
            map,
            words: vec![0; map.region_words()],
            private_ports: [0; PORT_COUNT],
            faults: BTreeMap::new(),
            behavior: DeviceBehavior::Halt,
            polls_since_start: 0,
            responded: false,
            events: Vec::new(),
            record_events: false,
        }
    }

    /// Set the program behaviour
    #[must_use]
    pub fn with_behavior(mut self, behavior: DeviceBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Record every host transaction in [`events`](Self::events)
    #[must_use]
    pub fn with_event_log(mut self, enabled: bool) -> Self {
        self.record_events = enabled;
        self
    }

    /// Register map the device was built for
    pub const fn map(&self) -> &RegisterMap {
        &self.map
    }

    /// Force instruction slot `index` to read back `value`
    ///
    /// Indices outside instruction memory are ignored.
    pub fn corrupt_rom(&mut self, index: usize, value: u16) {
        if index < self.map.rom_words() {
            self.faults.insert(index, value);
        }
    }

    /// Remove all injected faults
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Current value of a header register, without a bus transaction
    pub fn register(&self, reg: Register) -> u32 {
        self.words[reg.word_offset()]
    }

    /// Preset a header register, without a bus transaction
    pub fn set_register(&mut self, reg: Register, value: u32) {
        self.words[reg.word_offset()] = value;
    }

    /// Stored instruction at `index` (faults not applied)
    pub fn rom(&self, index: usize) -> Option<u16> {
        let offset = self.map.rom_word_offset(index)?;
        Some(iop16_chip::program::from_word(self.words[offset]))
    }

    /// Host transactions so far; empty unless the event log is enabled
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Forget recorded transactions
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Values written to `reg`, in order (needs the event log)
    pub fn writes_to(&self, reg: Register) -> Vec<u32> {
        let target = reg.word_offset();
        self.events
            .iter()
            .filter_map(|e| match *e {
                BusEvent::Write { offset, value } if offset == target => Some(value),
                _ => None,
            })
            .collect()
    }

    /// True while `ctrl.ctrl` holds the run request
    pub fn is_running(&self) -> bool {
        self.register(Register::Ctrl) == control::RUN
    }

    /// Device-side port write
    ///
    /// Returns `false` for undefined ports and for ports aliasing a register
    /// the map revision lacks; nothing is stored in either case.
    pub fn device_write_port(&mut self, port: u8, value: u8) -> bool {
        match ports::host_view(port) {
            Some(view) if self.map.is_populated(view.register) => {
                let offset = view.register.word_offset();
                self.words[offset] = view.lane.insert(self.words[offset], value);
                true
            }
            Some(_) => false,
            None if ports::is_defined(port) => {
                self.private_ports[usize::from(port)] = value;
                true
            }
            None => false,
        }
    }

    /// Device-side port read
    pub fn device_read_port(&self, port: u8) -> Option<u8> {
        match ports::host_view(port) {
            Some(view) if self.map.is_populated(view.register) => {
                Some(view.lane.extract(self.register(view.register)))
            }
            Some(_) => None,
            None if ports::is_defined(port) => Some(self.private_ports[usize::from(port)]),
            None => None,
        }
    }

    fn rom_index(&self, offset: usize) -> Option<usize> {
        self.map.rom_range().contains(&offset).then(|| offset - self.map.header_window_words())
    }

    fn record(&mut self, event: BusEvent) {
        if self.record_events {
            self.events.push(event);
        }
    }

    /// Advance the scripted program by one host poll of `reg.reg`
    fn on_status_poll(&mut self) {
        if !self.is_running() || self.responded {
            return;
        }
        let (after_polls, answer) = match self.behavior {
            DeviceBehavior::Halt => return,
            DeviceBehavior::SignalDone {
                after_polls,
                status,
            } => (after_polls, status),
            DeviceBehavior::Acknowledge {
                after_polls,
                result,
            } => (after_polls, u8::from(result)),
        };
        if self.polls_since_start >= after_polls {
            self.device_write_port(ports::reg::REG_0, answer);
            self.responded = true;
            info!(
                "SimulatedIop16: answered {answer:#x} after {} polls",
                self.polls_since_start
            );
        }
        self.polls_since_start += 1;
    }
}

impl RegisterBus for SimulatedIop16 {
    fn read32(&mut self, word_offset: usize) -> u32 {
        assert!(word_offset < self.words.len(), "Register offset out of bounds");
        if word_offset == Register::Reg.word_offset() {
            self.on_status_poll();
        }
        let value = match self.rom_index(word_offset) {
            Some(index) => match self.faults.get(&index) {
                Some(&forced) => u32::from(forced),
                None => self.words[word_offset] & INSTRUCTION_MASK,
            },
            None => self.words[word_offset],
        };
        self.record(BusEvent::Read {
            offset: word_offset,
            value,
        });
        value
    }

    fn write32(&mut self, word_offset: usize, value: u32) {
        assert!(word_offset < self.words.len(), "Register offset out of bounds");
        self.record(BusEvent::Write {
            offset: word_offset,
            value,
        });
        if self.rom_index(word_offset).is_some() {
            self.words[word_offset] = value & INSTRUCTION_MASK;
            return;
        }
        if word_offset == Register::Ctrl.word_offset() && value == control::RUN && !self.is_running()
        {
            self.polls_since_start = 0;
            self.responded = false;
            debug!("SimulatedIop16: run request");
        }
        self.words[word_offset] = value;
    }

    fn size_words(&self) -> usize {
        self.words.len()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Software
    }
}
