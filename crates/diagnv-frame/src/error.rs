/// Errors that can occur during frame encoding, transmission and decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Writing the encoded frame failed.
    #[error("frame write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The device accepted only part of the frame.
    #[error("short frame write ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// Reading the response failed.
    #[error("frame read failed: {0}")]
    Read(#[source] std::io::Error),

    /// No frame terminator (0x7E) was found in the received bytes.
    #[error("no frame terminator in {received} received bytes")]
    MissingTerminator { received: usize },

    /// The frame is too short to carry its trailing checksum.
    #[error("frame too short ({len} bytes before terminator, need at least 2)")]
    Truncated { len: usize },

    /// The trailing checksum does not match the decoded payload.
    #[error("checksum mismatch (computed {expected:#06x}, received {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// An I/O error surfaced through a codec adapter.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached EOF before any response byte arrived.
    #[error("connection closed (no response)")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the error happened after the request left the host.
    pub fn after_send(&self) -> bool {
        !matches!(self, FrameError::Write(_) | FrameError::ShortWrite { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
