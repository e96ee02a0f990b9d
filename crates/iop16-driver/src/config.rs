//! Harness configuration
//!
//! Everything the controller needs besides the image and the register
//! handle. The defaults reproduce the freestanding self-test exactly:
//! mismatch-report mode, unbounded polling, divide-by-10 prescaler.

use crate::poll::{CancelToken, PollConfig, PollLimit};
use iop16_chip::regs::timer::SCALER_DIVIDE_BY_10;
use std::fmt;
use std::str::FromStr;

/// Bring-up protocol variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HandshakeMode {
    /// Upload, read back and report mismatches in `ctrl.sim`, run, wait for
    /// `0xAB` in the low byte of `reg.reg`.
    #[default]
    VerifyReport,

    /// Program the prescaler, upload without readback, raise the `0x80`
    /// request in `reg.reg`, run, wait for the device to clear it and latch
    /// the result bit into `ctrl.sim`.
    ScalerHandshake,
}

impl HandshakeMode {
    /// Short name used on the command line
    pub const fn name(self) -> &'static str {
        match self {
            Self::VerifyReport => "verify",
            Self::ScalerHandshake => "handshake",
        }
    }
}

impl fmt::Display for HandshakeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HandshakeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verify" | "a" => Ok(Self::VerifyReport),
            "handshake" | "b" => Ok(Self::ScalerHandshake),
            other => Err(format!("unknown mode '{other}' (expected verify or handshake)")),
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Protocol variant
    pub mode: HandshakeMode,

    /// Bound on the completion poll
    pub poll_limit: PollLimit,

    /// Value written to both prescaler fields in handshake mode
    pub scaler_reload: u32,

    /// Yield the thread every n polls (hosted only); 0 never yields
    pub yield_interval: u32,

    /// Optional cancellation of the completion poll
    pub cancel: Option<CancelToken>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mode: HandshakeMode::default(),
            poll_limit: PollLimit::Unbounded,
            scaler_reload: SCALER_DIVIDE_BY_10,
            yield_interval: 0,
            cancel: None,
        }
    }
}

impl HarnessConfig {
    /// Configuration for one mode, all else default
    pub fn new(mode: HandshakeMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Set the poll bound
    #[must_use]
    pub fn with_poll_limit(mut self, limit: PollLimit) -> Self {
        self.poll_limit = limit;
        self
    }

    /// Set the prescaler reload value
    #[must_use]
    pub fn with_scaler_reload(mut self, value: u32) -> Self {
        self.scaler_reload = value;
        self
    }

    /// Set the yield interval
    #[must_use]
    pub fn with_yield_interval(mut self, every: u32) -> Self {
        self.yield_interval = every;
        self
    }

    /// Attach a cancellation token
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Poll parameters derived from this configuration
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            limit: self.poll_limit,
            yield_interval: self.yield_interval,
            cancel: self.cancel.clone(),
        }
    }
}
