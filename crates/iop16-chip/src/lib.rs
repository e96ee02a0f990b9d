//! Silicon model for the iop16 I/O co-processor.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure description of the co-processor as the host sees it: the address
//! window, the strided register map and its revisions, the device-side port
//! table, and the instruction image format.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`window`] | Base address, block stride, header window, instruction memory size |
//! | [`regs`] | Host register map: blocks, fields, bit definitions, revisions |
//! | [`ports`] | Device-side port numbers and their host aliases |
//! | [`program`] | Instruction image format and the built-in self-test image |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ports;
pub mod program;
pub mod regs;
pub mod window;

pub use regs::{Block, Capabilities, Register, RegisterMap, Revision};
