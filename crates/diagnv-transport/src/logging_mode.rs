//! Diag logging-mode side channel.
//!
//! The modem only answers diag requests on the host-side channel while the
//! kernel diag driver routes traffic "internally". The mode is switched by
//! writing a keyword into a sysfs attribute.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// Default sysfs attribute controlling the diag logging mode.
pub const DEFAULT_LOGGING_MODE_PATH: &str = "/sys/devices/virtual/diag/diag/logging_mode";

/// Routing mode of the kernel diag driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// Diag traffic is delivered to the on-device character node.
    Internal,
    /// Diag traffic is delivered over USB (the boot default).
    Usb,
}

impl LoggingMode {
    /// Keyword written to the sysfs attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            LoggingMode::Internal => "internal",
            LoggingMode::Usb => "usb",
        }
    }

    /// Write this mode to the attribute at `path`.
    pub fn apply(self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mode = self.as_str();
        debug!(?path, mode, "setting logging mode");

        let to_error = |source| TransportError::LoggingMode {
            path: path.to_path_buf(),
            source,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(to_error)?;

        let written = file.write(mode.as_bytes()).map_err(to_error)?;
        if written != mode.len() {
            return Err(to_error(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short write ({written} of {} bytes)", mode.len()),
            )));
        }
        Ok(())
    }
}

/// Holds the device in [`LoggingMode::Internal`] for its lifetime.
///
/// Dropping the guard restores [`LoggingMode::Usb`], on error paths too.
#[derive(Debug)]
pub struct LoggingModeGuard {
    path: PathBuf,
}

impl LoggingModeGuard {
    /// Switch to internal mode using the attribute at `path`.
    pub fn enable(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        LoggingMode::Internal.apply(&path)?;
        Ok(Self { path })
    }

    /// Attribute path this guard restores on drop.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LoggingModeGuard {
    fn drop(&mut self) {
        if let Err(err) = LoggingMode::Usb.apply(&self.path) {
            warn!(path = ?self.path, %err, "failed to restore usb logging mode");
        }
    }
}
