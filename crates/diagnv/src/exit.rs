use std::fmt;
use std::io;

use diagnv_frame::FrameError;
use diagnv_item::ItemError;
use diagnv_transport::TransportError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const TRANSPORT_ERROR: i32 = 3;
pub const VERIFY_MISMATCH: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(err: &io::Error, fallback: i32) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => fallback,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(&err, INTERNAL), format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Open { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::LoggingMode { source, .. }
        | TransportError::Io(source) => io_code(source, TRANSPORT_ERROR),
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    let code = match &err {
        FrameError::Write(source) | FrameError::Read(source) | FrameError::Io(source) => {
            io_code(source, TRANSPORT_ERROR)
        }
        FrameError::ShortWrite { .. } | FrameError::ConnectionClosed => TRANSPORT_ERROR,
        FrameError::MissingTerminator { .. }
        | FrameError::Truncated { .. }
        | FrameError::ChecksumMismatch { .. } => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn item_error(context: &str, err: ItemError) -> CliError {
    match err {
        ItemError::Transport(err) => transport_error(context, err),
        ItemError::Frame(err) => frame_error(context, err),
        ItemError::LengthMismatch { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ItemError::ValueTooLarge { .. } | ItemError::InvalidCapacity { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}
