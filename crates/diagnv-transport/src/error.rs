use std::path::PathBuf;

/// Errors that can occur while opening or driving the diag transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the diag character device.
    #[error("failed to open diag device {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to a device simulator socket.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to switch the device logging mode.
    #[error("failed to set logging mode via {path}: {source}")]
    LoggingMode {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
