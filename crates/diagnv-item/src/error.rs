use crate::command::{ItemId, Opcode};

/// Errors that can occur in item operations.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] diagnv_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] diagnv_frame::FrameError),

    /// The decoded response does not echo the fixed request size.
    #[error(
        "{opcode} of item {id}: response length mismatch (got {actual} bytes, expected {expected})"
    )]
    LengthMismatch {
        id: ItemId,
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },

    /// The value does not fit in the protocol payload capacity.
    #[error("value too large ({size} bytes, max {max})")]
    ValueTooLarge { size: usize, max: usize },

    /// The payload capacity is zero or its echo cannot fit the receive buffer.
    #[error(
        "payload capacity {payload_capacity} does not fit a {receive_capacity}-byte receive buffer"
    )]
    InvalidCapacity {
        payload_capacity: usize,
        receive_capacity: usize,
    },
}

impl ItemError {
    /// True when the request reached the device before the failure.
    ///
    /// For a write this means the item may have changed even though the
    /// operation failed; re-read it to find out.
    pub fn request_sent(&self) -> bool {
        match self {
            ItemError::Frame(err) => err.after_send(),
            ItemError::LengthMismatch { .. } => true,
            ItemError::Transport(_)
            | ItemError::ValueTooLarge { .. }
            | ItemError::InvalidCapacity { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ItemError>;
