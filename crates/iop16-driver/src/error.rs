//! Error types for iop16 harness operations

use iop16_chip::Register;
use thiserror::Error;

/// Result type alias for iop16 operations
pub type Result<T> = std::result::Result<T, Iop16Error>;

/// Errors that can occur while driving the iop16
#[derive(Debug, Error)]
pub enum Iop16Error {
    /// Instruction image does not fit in instruction memory
    #[error("Image of {len} instructions exceeds instruction memory ({capacity} words)")]
    ImageTooLarge {
        /// Image length in instructions
        len: usize,
        /// Instruction memory depth in words
        capacity: usize,
    },

    /// Instruction memory index out of range
    #[error("Instruction index {index} out of range (memory has {capacity} words)")]
    RomIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Instruction memory depth in words
        capacity: usize,
    },

    /// Bus window smaller than the register map
    #[error("Bus exposes {words} words but the register map needs {required}")]
    RegionTooSmall {
        /// Words exposed by the bus
        words: usize,
        /// Words required by the map
        required: usize,
    },

    /// Register not backed by hardware on this map revision
    #[error("Register {register} is not present on this map revision")]
    MissingCapability {
        /// Register that was accessed
        register: Register,
    },

    /// Image bytes could not be decoded
    #[error("Invalid image: {reason}")]
    InvalidImage {
        /// Reason for failure
        reason: String,
    },

    /// Poll bound exhausted before the device reached the expected state
    #[error("Timeout polling {register} after {polls} polls (last value {last_value:#x})")]
    PollTimeout {
        /// Register being polled
        register: Register,
        /// Number of reads performed
        polls: u64,
        /// Value seen on the final read
        last_value: u32,
    },

    /// Poll cancelled by the caller
    #[error("Poll of {register} cancelled after {polls} polls")]
    Cancelled {
        /// Register being polled
        register: Register,
        /// Number of reads performed
        polls: u64,
    },

    /// I/O error while reading an image
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl Iop16Error {
    /// Create an image too large error
    pub const fn image_too_large(len: usize, capacity: usize) -> Self {
        Self::ImageTooLarge { len, capacity }
    }

    /// Create an invalid image error
    pub fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    /// Create a missing capability error
    pub const fn missing_capability(register: Register) -> Self {
        Self::MissingCapability { register }
    }

    /// True for errors raised by a poll bound or cancellation
    pub const fn is_poll_abort(&self) -> bool {
        matches!(self, Self::PollTimeout { .. } | Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = Iop16Error::image_too_large(5000, 4096);
        assert_eq!(
            err.to_string(),
            "Image of 5000 instructions exceeds instruction memory (4096 words)"
        );

        let err = Iop16Error::PollTimeout {
            register: Register::Reg,
            polls: 10,
            last_value: 0x80,
        };
        assert_eq!(
            err.to_string(),
            "Timeout polling reg.reg after 10 polls (last value 0x80)"
        );
        assert!(err.is_poll_abort());
        assert!(!Iop16Error::missing_capability(Register::Dbg).is_poll_abort());
    }
}
