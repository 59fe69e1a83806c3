//! Diag transport layer.
//!
//! Provides the duplex byte channel the framing layer runs over:
//! - the diag character device (Linux/Android)
//! - Unix domain sockets, for device simulators and tests
//!   ([`SimulatorListener`] on the serving side)
//!
//! Also owns the logging-mode side channel that must be switched before the
//! device answers any request. This is the lowest layer of diagnv.

pub mod error;

#[cfg(unix)]
pub mod device;
#[cfg(unix)]
pub mod listener;
#[cfg(unix)]
pub mod logging_mode;
#[cfg(unix)]
pub mod stream;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use device::DEFAULT_DEVICE_PATH;
#[cfg(unix)]
pub use listener::SimulatorListener;
#[cfg(unix)]
pub use logging_mode::{LoggingMode, LoggingModeGuard, DEFAULT_LOGGING_MODE_PATH};
#[cfg(unix)]
pub use stream::DiagStream;
