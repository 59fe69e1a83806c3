//! Item-addressed access to device configuration over diag.
//!
//! Builds fixed-size read/write requests, runs them as single-shot
//! transactions through the framing layer, and validates the echoed
//! responses. [`ItemSimulator`] answers the same protocol from memory for
//! tests and bench setups without hardware.

pub mod command;
pub mod error;
#[cfg(unix)]
pub mod simulator;
pub mod store;

pub use command::{
    echoed_item_id, CommandBuffer, ItemId, Opcode, DEFAULT_PAYLOAD_CAPACITY, HEADER_SIZE,
};
pub use error::{ItemError, Result};
#[cfg(unix)]
pub use simulator::{ItemSimulator, BAD_COMMAND, BAD_LENGTH};
pub use store::{ItemConfig, ItemStore};
