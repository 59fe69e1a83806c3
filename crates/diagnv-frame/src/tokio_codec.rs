use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, max_encoded_len, Frame, FrameConfig};
use crate::error::FrameError;

/// `tokio_util` codec for diag frames, for use with `FramedRead`/`FramedWrite`.
#[derive(Debug, Clone)]
pub struct DiagCodec {
    receive_capacity: usize,
    verify_checksum: bool,
}

impl DiagCodec {
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            receive_capacity: config.receive_capacity,
            verify_checksum: config.verify_checksum,
        }
    }
}

impl Default for DiagCodec {
    fn default() -> Self {
        Self::new(&FrameConfig::default())
    }
}

impl Decoder for DiagCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        match decode_frame(src, self.verify_checksum)? {
            Some(frame) => Ok(Some(frame)),
            None if src.len() >= self.receive_capacity => {
                let received = src.len();
                src.clear();
                Err(FrameError::MissingTerminator { received })
            }
            None => Ok(None),
        }
    }
}

impl Encoder<Bytes> for DiagCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        dst.reserve(max_encoded_len(payload.len()));
        encode_frame(&payload, dst);
        Ok(())
    }
}
