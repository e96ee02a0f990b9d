//! Load-verify-run controller
//!
//! Drives one bring-up of the iop16: halt, upload the image, start, wait on
//! the handshake register, halt again. Two protocol variants exist, selected
//! by [`HandshakeMode`]:
//!
//! ```text
//! VerifyReport                         ScalerHandshake
//! ───────────────────────────────────  ───────────────────────────────────
//! ctrl.ctrl   <- 0                     ctrl.ctrl   <- 0
//!                                      timer.scaler_reload/value <- 9
//! rom[0..n]   <- image                 rom[0..n]   <- image
//! rom[i] != image[i] ?
//!   ctrl.sim  <- (i << 16) | rom[i]
//!                                      reg.reg     <- 0x80
//! ctrl.ctrl   <- 1                     ctrl.ctrl   <- 1
//! wait reg.reg & 0xff == 0xab          wait reg.reg & 0x80 == 0
//! ctrl.ctrl   <- 0                     ctrl.ctrl   <- 0
//!                                      ctrl.sim    <- reg.reg & 1
//! idle                                 idle
//! ```
//!
//! Only the last upload mismatch survives in `ctrl.sim`; the [`RunReport`]
//! keeps all of them.

use crate::backend::RegisterBus;
use crate::config::{HandshakeMode, HarnessConfig};
use crate::device::Iop16Regs;
use crate::error::{Iop16Error, Result};
use crate::loading::{self, Mismatch, RomImage};
use crate::poll::poll_until;
use iop16_chip::regs::{control, general};
use iop16_chip::{Register, RegisterMap};
use tracing::{debug, error, info, warn};

/// Outcome of one bring-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Protocol variant that ran
    pub mode: HandshakeMode,

    /// Instructions written to instruction memory
    pub words_written: usize,

    /// Every readback mismatch, index order (verify mode only)
    pub mismatches: Vec<Mismatch>,

    /// Last value written to `ctrl.sim`, if any
    pub last_diagnostic: Option<u32>,

    /// Reads of `reg.reg` until the device answered
    pub polls: u64,

    /// `reg.reg` when the handshake completed
    pub final_status: u32,

    /// Pass/fail bit latched in handshake mode
    pub result: Option<u32>,
}

impl RunReport {
    const fn new(mode: HandshakeMode) -> Self {
        Self {
            mode,
            words_written: 0,
            mismatches: Vec::new(),
            last_diagnostic: None,
            polls: 0,
            final_status: 0,
            result: None,
        }
    }

    /// True if the upload read back clean and, in handshake mode, the
    /// device reported a pass.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty() && self.result.map_or(true, |r| r == general::RESULT)
    }
}

/// Bring-up controller
#[derive(Debug, Clone, Default)]
pub struct Controller {
    config: HarnessConfig,
}

impl Controller {
    /// Create controller with configuration
    pub fn new(config: HarnessConfig) -> Self {
        debug!(
            "Controller: mode={}, poll limit={:?}",
            config.mode, config.poll_limit
        );
        Self { config }
    }

    /// Configuration in use
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Reject configurations the sequence cannot run on
    ///
    /// # Errors
    ///
    /// Returns error if the image is longer than instruction memory, or the
    /// mode needs a block the map revision lacks.
    pub fn check_preconditions(&self, image: &RomImage, map: &RegisterMap) -> Result<()> {
        image.validate_for(map)?;
        if self.config.mode == HandshakeMode::ScalerHandshake {
            for reg in [Register::ScalerReload, Register::ScalerValue] {
                if !map.is_populated(reg) {
                    return Err(Iop16Error::missing_capability(reg));
                }
            }
        }
        Ok(())
    }

    /// Run one bring-up and return
    ///
    /// Preconditions are checked before the first bus access. If the
    /// completion poll is bounded or cancelled and gives up, the device is
    /// halted before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns error if a precondition fails or the completion poll is
    /// aborted. Upload mismatches are not errors; see [`RunReport`].
    pub fn run<B: RegisterBus>(
        &self,
        image: &RomImage,
        regs: &mut Iop16Regs<B>,
    ) -> Result<RunReport> {
        self.check_preconditions(image, regs.map())?;
        info!(
            "iop16 bring-up: {} mode, {} instructions, checksum {:#06x}",
            self.config.mode,
            image.len(),
            image.checksum()
        );

        let outcome = match self.config.mode {
            HandshakeMode::VerifyReport => self.run_verify_report(image, regs),
            HandshakeMode::ScalerHandshake => self.run_scaler_handshake(image, regs),
        };

        if let Err(e) = &outcome {
            if e.is_poll_abort() {
                warn!("{e}; halting device");
                regs.write(Register::Ctrl, control::HALT)?;
            }
        }
        outcome
    }

    /// Run one bring-up, then stay in the terminal idle loop
    ///
    /// This is the freestanding entry point: nothing is returned to a
    /// caller. A failed precondition aborts the process.
    pub fn run_forever<B: RegisterBus>(&self, image: &RomImage, regs: &mut Iop16Regs<B>) -> ! {
        match self.run(image, regs) {
            Ok(report) => info!(
                "iop16 bring-up finished after {} polls, status {:#x}; idling",
                report.polls, report.final_status
            ),
            Err(e) => {
                error!("iop16 bring-up failed: {e}");
                std::process::abort();
            }
        }
        idle()
    }

    fn run_verify_report<B: RegisterBus>(
        &self,
        image: &RomImage,
        regs: &mut Iop16Regs<B>,
    ) -> Result<RunReport> {
        let mut report = RunReport::new(HandshakeMode::VerifyReport);

        regs.write(Register::Ctrl, control::HALT)?;

        report.words_written = loading::upload(image, regs)?;
        report.mismatches = loading::verify(image, regs, |regs, m| {
            warn!(
                "ROM[{}] reads back {:#06x}, expected {:#06x}",
                m.index, m.observed, m.expected
            );
            regs.write(Register::Sim, m.diagnostic())
        })?;
        report.last_diagnostic = report.mismatches.last().map(Mismatch::diagnostic);
        info!(
            "Uploaded {} instructions, {} mismatches",
            report.words_written,
            report.mismatches.len()
        );

        regs.write(Register::Ctrl, control::RUN)?;
        let done = poll_until(regs, Register::Reg, &self.config.poll_config(), |v| {
            v & general::DONE_MASK == general::DONE
        })?;
        regs.write(Register::Ctrl, control::HALT)?;

        info!("Device signalled {:#x} after {} polls", done.value, done.polls);
        report.polls = done.polls;
        report.final_status = done.value;
        Ok(report)
    }

    fn run_scaler_handshake<B: RegisterBus>(
        &self,
        image: &RomImage,
        regs: &mut Iop16Regs<B>,
    ) -> Result<RunReport> {
        let mut report = RunReport::new(HandshakeMode::ScalerHandshake);

        regs.write(Register::Ctrl, control::HALT)?;
        regs.write(Register::ScalerReload, self.config.scaler_reload)?;
        regs.write(Register::ScalerValue, self.config.scaler_reload)?;

        report.words_written = loading::upload(image, regs)?;
        info!("Uploaded {} instructions", report.words_written);

        regs.write(Register::Reg, general::REQUEST)?;
        regs.write(Register::Ctrl, control::RUN)?;
        let ack = poll_until(regs, Register::Reg, &self.config.poll_config(), |v| {
            v & general::REQUEST == 0
        })?;
        regs.write(Register::Ctrl, control::HALT)?;

        let status = regs.read(Register::Reg)?;
        let result = status & general::RESULT;
        regs.write(Register::Sim, result)?;
        info!(
            "Device acknowledged after {} polls, result {}",
            ack.polls, result
        );

        report.polls = ack.polls;
        report.final_status = status;
        report.result = Some(result);
        report.last_diagnostic = Some(result);
        Ok(report)
    }
}

/// Terminal idle loop
pub fn idle() -> ! {
    loop {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::software::{DeviceBehavior, SimulatedIop16};
    use iop16_chip::Revision;

    fn regs(behavior: DeviceBehavior) -> Iop16Regs<SimulatedIop16> {
        let map = RegisterMap::compact(Revision::Systest, 16);
        Iop16Regs::new(SimulatedIop16::new(map).with_behavior(behavior), map).unwrap()
    }

    #[test]
    fn handshake_needs_timer() {
        let map = RegisterMap::compact(Revision::Minimal, 16);
        let sim = SimulatedIop16::new(map).with_event_log(true);
        let mut regs = Iop16Regs::new(sim, map).unwrap();
        let ctl = Controller::new(HarnessConfig::new(HandshakeMode::ScalerHandshake));
        let err = ctl.run(&RomImage::selftest(), &mut regs).unwrap_err();
        assert!(matches!(err, Iop16Error::MissingCapability { .. }));
        assert!(regs.bus().events().is_empty());
    }

    #[test]
    fn verify_mode_on_minimal_revision() {
        let map = RegisterMap::compact(Revision::Minimal, 16);
        let sim = SimulatedIop16::new(map).with_behavior(DeviceBehavior::SignalDone {
            after_polls: 0,
            status: 0xab,
        });
        let mut regs = Iop16Regs::new(sim, map).unwrap();
        let report = Controller::default()
            .run(&RomImage::selftest(), &mut regs)
            .unwrap();
        assert!(report.passed());
        assert_eq!(report.polls, 1);
    }

    #[test]
    fn report_passed() {
        let mut report = RunReport::new(HandshakeMode::ScalerHandshake);
        report.result = Some(0);
        assert!(!report.passed());
        report.result = Some(1);
        assert!(report.passed());
        report.mismatches.push(Mismatch {
            index: 0,
            expected: 1,
            observed: 0,
        });
        assert!(!report.passed());
    }

    #[test]
    fn custom_scaler_value() {
        let mut regs = regs(DeviceBehavior::Acknowledge {
            after_polls: 0,
            result: true,
        });
        let ctl = Controller::new(
            HarnessConfig::new(HandshakeMode::ScalerHandshake).with_scaler_reload(99),
        );
        ctl.run(&RomImage::selftest(), &mut regs).unwrap();
        assert_eq!(regs.bus().register(Register::ScalerReload), 99);
        assert_eq!(regs.bus().register(Register::ScalerValue), 99);
    }
}
