//! Item-level access to device configuration over the diag serial interface.
//!
//! # Crate Structure
//!
//! - [`transport`]: the diag character device, Unix-socket simulators and the
//!   logging-mode switch
//! - [`frame`]: CRC-16 checksummed, byte-stuffed, 0x7E-terminated framing
//! - [`item`]: fixed-size item read/write transactions and an in-memory
//!   device simulator
//!
//! ```no_run
//! use diagnv::item::{ItemConfig, ItemId, ItemStore};
//! use diagnv::transport::{DiagStream, LoggingModeGuard, DEFAULT_LOGGING_MODE_PATH};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let _mode = LoggingModeGuard::enable(DEFAULT_LOGGING_MODE_PATH)?;
//! let stream = DiagStream::open("/dev/diag_tty")?;
//! let mut store = ItemStore::open(stream, ItemConfig::default())?;
//! let bands = store.read_item(ItemId(1877), 8)?;
//! # let _ = bands;
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use diagnv_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use diagnv_frame::*;
}

/// Re-export item types.
pub mod item {
    pub use diagnv_item::*;
}
