//! HDLC-style framing for the diag protocol.
//!
//! Every message on the wire is:
//! - the payload followed by its CRC-16/X-25 (little-endian)
//! - byte-stuffed so 0x7D/0x7E never appear unescaped
//! - terminated by a single 0x7E
//!
//! Responses are decoded back into a [`Frame`], with optional checksum
//! verification and bounded reassembly across partial reads.

pub mod codec;
pub mod crc;
pub mod error;
pub mod reader;
#[cfg(feature = "async")]
pub mod tokio_codec;
pub mod writer;

pub use codec::{
    decode, decode_frame, encode_frame, max_encoded_len, Frame, FrameConfig, ReceiveMode,
    CHECKSUM_SIZE, DEFAULT_RECEIVE_CAPACITY, ESCAPE, TERMINATOR,
};
pub use crc::{crc16, Crc16};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
#[cfg(feature = "async")]
pub use tokio_codec::DiagCodec;
pub use writer::FrameWriter;
