use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc::crc16;
use crate::error::{FrameError, Result};

/// Escape marker: the following byte was XOR-ed with [`ESCAPE_XOR`].
pub const ESCAPE: u8 = 0x7D;

/// Frame terminator.
pub const TERMINATOR: u8 = 0x7E;

/// Mask applied to escaped bytes.
pub const ESCAPE_XOR: u8 = 0x20;

/// Trailing checksum size (CRC-16, little-endian).
pub const CHECKSUM_SIZE: usize = 2;

/// Default receive capacity for one response.
pub const DEFAULT_RECEIVE_CAPACITY: usize = 512;

/// A decoded frame: unescaped payload with the trailing checksum split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The frame payload (checksum and terminator removed).
    pub payload: Bytes,
    /// The checksum as carried on the wire.
    pub checksum: u16,
}

impl Frame {
    /// Create a frame carrying the correct checksum for `payload`.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum = crc16(&payload);
        Self { payload, checksum }
    }

    /// True when the carried checksum matches the payload.
    pub fn checksum_valid(&self) -> bool {
        crc16(&self.payload) == self.checksum
    }
}

/// Upper bound on the encoded size of a `payload_len`-byte frame.
pub const fn max_encoded_len(payload_len: usize) -> usize {
    2 * (payload_len + CHECKSUM_SIZE) + 1
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────────────────────────────────────┬────────────┐
/// │ escape( payload │ crc_lo │ crc_hi )        │ 0x7E       │
/// └───────────────────────────────────────────┴────────────┘
/// ```
/// Every 0x7D or 0x7E inside the escaped region becomes `0x7D, byte ^ 0x20`.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    let crc = crc16(payload).to_le_bytes();
    dst.reserve(payload.len() + CHECKSUM_SIZE + 1);
    for &byte in payload.iter().chain(crc.iter()) {
        put_escaped(byte, dst);
    }
    dst.put_u8(TERMINATOR);
}

fn put_escaped(byte: u8, dst: &mut BytesMut) {
    if byte == ESCAPE || byte == TERMINATOR {
        dst.put_u8(ESCAPE);
        dst.put_u8(byte ^ ESCAPE_XOR);
    } else {
        dst.put_u8(byte);
    }
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a terminator yet.
/// On success, consumes the frame bytes (terminator included) from the buffer.
/// Empty frames (a bare 0x7E flag) are consumed and skipped.
pub fn decode_frame(src: &mut BytesMut, verify_checksum: bool) -> Result<Option<Frame>> {
    loop {
        let Some((body, consumed)) = unescape_until_terminator(src) else {
            return Ok(None); // Need more data
        };
        src.advance(consumed);

        if body.is_empty() {
            continue;
        }
        return split_checksum(body, verify_checksum).map(Some);
    }
}

/// Decode exactly one frame from a complete receive window.
pub fn decode(raw: &[u8], verify_checksum: bool) -> Result<Frame> {
    let mut buf = BytesMut::from(raw);
    match decode_frame(&mut buf, verify_checksum)? {
        Some(frame) => Ok(frame),
        None => Err(no_frame(&buf, raw.len())),
    }
}

/// Error for a receive window that yielded no frame.
///
/// A window made only of terminators was fully consumed as empty frames,
/// so it is reported as a zero-length frame rather than a missing terminator.
pub(crate) fn no_frame(remaining: &[u8], received: usize) -> FrameError {
    if remaining.is_empty() && received > 0 {
        FrameError::Truncated { len: 0 }
    } else {
        FrameError::MissingTerminator { received }
    }
}

fn unescape_until_terminator(src: &[u8]) -> Option<(BytesMut, usize)> {
    if !src.contains(&TERMINATOR) {
        return None;
    }

    let mut out = BytesMut::with_capacity(src.len());
    let mut i = 0usize;
    while i < src.len() {
        match src[i] {
            TERMINATOR => return Some((out, i + 1)),
            ESCAPE => {
                let next = *src.get(i + 1)?;
                out.put_u8(next ^ ESCAPE_XOR);
                i += 2;
            }
            byte => {
                out.put_u8(byte);
                i += 1;
            }
        }
    }
    None
}

fn split_checksum(mut body: BytesMut, verify_checksum: bool) -> Result<Frame> {
    if body.len() < CHECKSUM_SIZE {
        return Err(FrameError::Truncated { len: body.len() });
    }

    let trailer = body.split_off(body.len() - CHECKSUM_SIZE);
    let checksum = u16::from_le_bytes([trailer[0], trailer[1]]);
    let payload = body.freeze();

    if verify_checksum {
        let expected = crc16(&payload);
        if expected != checksum {
            return Err(FrameError::ChecksumMismatch {
                expected,
                actual: checksum,
            });
        }
    }

    Ok(Frame { payload, checksum })
}

/// How a response is collected from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveMode {
    /// One blocking read of up to `receive_capacity` bytes must hold the whole frame.
    SingleRead,
    /// Keep reading until a terminator arrives or `receive_capacity` bytes are buffered.
    Accumulate,
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum raw bytes collected for one response. Default: 512.
    pub receive_capacity: usize,
    /// Response collection strategy. Default: [`ReceiveMode::Accumulate`].
    pub receive_mode: ReceiveMode,
    /// Reject responses whose trailing checksum does not match. Default: true.
    pub verify_checksum: bool,
    /// Read timeout for blocking operations (socket backends only).
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations (socket backends only).
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            receive_capacity: DEFAULT_RECEIVE_CAPACITY,
            receive_mode: ReceiveMode::Accumulate,
            verify_checksum: true,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
