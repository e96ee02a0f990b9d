//! Busy-polling of handshake registers
//!
//! Busy-polling is the only synchronization the iop16 offers: no interrupts,
//! no completion queue. On the target the poll is unbounded and spins until
//! the device answers. Hosted builds can bound it by poll count or wall
//! clock, and cancel it from another thread, without changing what is read
//! or when.

use crate::backend::RegisterBus;
use crate::device::Iop16Regs;
use crate::error::{Iop16Error, Result};
use iop16_chip::Register;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bound on a busy-poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollLimit {
    /// Spin until the condition holds
    #[default]
    Unbounded,

    /// Give up after this many reads; `MaxPolls(0)` behaves as `MaxPolls(1)`
    MaxPolls(u64),

    /// Give up once this much time has passed since the first read
    Deadline(Duration),
}

/// Shared flag that stops a running poll
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an untriggered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once [`cancel`](Self::cancel) has been called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Poll parameters
#[derive(Debug, Clone, Default)]
pub struct PollConfig {
    /// Bound on the poll
    pub limit: PollLimit,

    /// Yield the thread every n polls; 0 never yields
    pub yield_interval: u32,

    /// Optional cancellation
    pub cancel: Option<CancelToken>,
}

/// Successful poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Value that satisfied the condition
    pub value: u32,

    /// Reads performed, including the satisfying one
    pub polls: u64,
}

/// Read `reg` until `done` accepts its value
///
/// The register is always read at least once, whatever the limit or the
/// state of the cancel token.
///
/// # Errors
///
/// Returns error if the register is missing from the map revision, the
/// limit is exhausted, or the poll is cancelled.
pub fn poll_until<B, F>(
    regs: &mut Iop16Regs<B>,
    reg: Register,
    cfg: &PollConfig,
    done: F,
) -> Result<PollOutcome>
where
    B: RegisterBus,
    F: Fn(u32) -> bool,
{
    let start = match cfg.limit {
        PollLimit::Deadline(_) => Some(Instant::now()),
        _ => None,
    };
    let mut polls = 0u64;

    loop {
        let value = regs.read(reg)?;
        polls += 1;

        if done(value) {
            tracing::debug!("{reg} = {value:#x} after {polls} polls");
            return Ok(PollOutcome { value, polls });
        }

        if cfg.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(Iop16Error::Cancelled {
                register: reg,
                polls,
            });
        }

        let exhausted = match (cfg.limit, start) {
            (PollLimit::MaxPolls(max), _) => polls >= max,
            (PollLimit::Deadline(budget), Some(t0)) => t0.elapsed() >= budget,
            _ => false,
        };
        if exhausted {
            return Err(Iop16Error::PollTimeout {
                register: reg,
                polls,
                last_value: value,
            });
        }

        if cfg.yield_interval != 0 && polls % u64::from(cfg.yield_interval) == 0 {
            std::thread::yield_now();
        } else {
            std::hint::spin_loop();
        }
    }
}
