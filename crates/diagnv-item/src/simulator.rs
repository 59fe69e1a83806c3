//! In-memory stand-in for the device side of the item protocol.

use std::collections::HashMap;
use std::io::{Read, Write};

use diagnv_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use diagnv_transport::DiagStream;
use tracing::{debug, info, warn};

use crate::command::{ItemId, Opcode, HEADER_SIZE};
use crate::error::Result;

/// Response opcode for a request the device does not understand.
pub const BAD_COMMAND: u8 = 0x13;
/// Response opcode for a request of the wrong length.
pub const BAD_LENGTH: u8 = 0x15;

/// Serves item reads and writes from a map, echoing fixed-size responses.
#[derive(Debug, Clone)]
pub struct ItemSimulator {
    items: HashMap<ItemId, Vec<u8>>,
    payload_capacity: usize,
    frame: FrameConfig,
    ignore_writes: bool,
}

impl ItemSimulator {
    pub fn new(payload_capacity: usize) -> Self {
        Self {
            items: HashMap::new(),
            payload_capacity,
            frame: FrameConfig::default(),
            ignore_writes: false,
        }
    }

    /// Replace the framing settings used by [`ItemSimulator::serve`].
    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    /// Acknowledge writes without storing them, like a device that
    /// refuses the item but still echoes the request.
    pub fn with_writes_ignored(mut self, ignore: bool) -> Self {
        self.ignore_writes = ignore;
        self
    }

    /// Seed an item value. Unknown items read back as zeros.
    pub fn insert(&mut self, id: ItemId, value: Vec<u8>) {
        self.items.insert(id, value);
    }

    pub fn get(&self, id: ItemId) -> Option<&[u8]> {
        self.items.get(&id).map(Vec::as_slice)
    }

    /// Build the response for one decoded request.
    pub fn respond(&mut self, request: &[u8]) -> Vec<u8> {
        if request.len() < HEADER_SIZE {
            return error_response(BAD_COMMAND, request);
        }
        if request.len() != HEADER_SIZE + self.payload_capacity {
            return error_response(BAD_LENGTH, request);
        }

        let id = ItemId(u16::from_le_bytes([request[1], request[2]]));
        match Opcode::from_u8(request[0]) {
            Some(Opcode::ReadItem) => {
                let mut response = request.to_vec();
                if let Some(value) = self.items.get(&id) {
                    let n = value.len().min(self.payload_capacity);
                    response[HEADER_SIZE..HEADER_SIZE + n].copy_from_slice(&value[..n]);
                }
                debug!(item = %id, "simulated item read");
                response
            }
            Some(Opcode::WriteItem) => {
                if self.ignore_writes {
                    debug!(item = %id, "simulated item write ignored");
                } else {
                    self.items.insert(id, request[HEADER_SIZE..].to_vec());
                    debug!(item = %id, "simulated item write");
                }
                request.to_vec()
            }
            None => error_response(BAD_COMMAND, request),
        }
    }

    /// Answer requests on `stream` until the host disconnects.
    pub fn serve(&mut self, stream: DiagStream) -> Result<()> {
        let reader = FrameReader::with_config(stream.try_clone()?, self.frame.clone());
        let writer = FrameWriter::with_config(stream, self.frame.clone());
        self.serve_parts(reader, writer)
    }

    /// Answer requests read from `reader` until EOF.
    pub fn serve_parts<R: Read, W: Write>(
        &mut self,
        mut reader: FrameReader<R>,
        mut writer: FrameWriter<W>,
    ) -> Result<()> {
        loop {
            let response = match reader.read_frame() {
                Ok(frame) => self.respond(&frame.payload),
                Err(FrameError::ConnectionClosed) => {
                    info!("host disconnected");
                    return Ok(());
                }
                Err(err @ FrameError::ChecksumMismatch { .. }) => {
                    warn!(%err, "rejecting corrupted request");
                    vec![BAD_COMMAND]
                }
                Err(err) => return Err(err.into()),
            };
            writer.send(&response)?;
        }
    }
}

fn error_response(code: u8, request: &[u8]) -> Vec<u8> {
    let mut response = Vec::with_capacity(request.len() + 1);
    response.push(code);
    response.extend_from_slice(request);
    response
}
