use std::io::{Read, Write};

use bytes::Bytes;
use diagnv_frame::{FrameConfig, FrameReader, FrameWriter, CHECKSUM_SIZE};
#[cfg(unix)]
use diagnv_transport::DiagStream;
use tracing::{debug, warn};

use crate::command::{
    echoed_item_id, CommandBuffer, ItemId, Opcode, DEFAULT_PAYLOAD_CAPACITY, HEADER_SIZE,
};
use crate::error::{ItemError, Result};

/// Configuration for item transactions.
#[derive(Debug, Clone)]
pub struct ItemConfig {
    /// Payload capacity every request is padded to. Default: 130.
    pub payload_capacity: usize,
    /// Framing and receive behavior.
    pub frame: FrameConfig,
}

impl ItemConfig {
    /// Decoded size every response must echo (header + payload capacity).
    pub fn response_size(&self) -> usize {
        HEADER_SIZE + self.payload_capacity
    }

    /// Largest payload capacity whose echo fits `receive_capacity` bytes.
    pub fn max_payload_capacity(receive_capacity: usize) -> usize {
        receive_capacity.saturating_sub(HEADER_SIZE + CHECKSUM_SIZE + 1)
    }

    /// Check that a request can be built and its echo received.
    ///
    /// The capacity must be non-zero and header, payload, checksum and
    /// terminator together must fit in the receive buffer.
    pub fn validate(&self) -> Result<()> {
        let receive_capacity = self.frame.receive_capacity;
        let echo_size = HEADER_SIZE
            .checked_add(self.payload_capacity)
            .and_then(|n| n.checked_add(CHECKSUM_SIZE + 1));
        match echo_size {
            Some(n) if self.payload_capacity > 0 && n <= receive_capacity => Ok(()),
            _ => Err(ItemError::InvalidCapacity {
                payload_capacity: self.payload_capacity,
                receive_capacity,
            }),
        }
    }
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            payload_capacity: DEFAULT_PAYLOAD_CAPACITY,
            frame: FrameConfig::default(),
        }
    }
}

/// Item-addressed reads and writes over one diag session.
///
/// Every call is a single-shot transaction: encode, send, receive, decode,
/// validate. Nothing is retried and no state survives between calls.
pub struct ItemStore<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    config: ItemConfig,
}

#[cfg(unix)]
impl ItemStore<DiagStream, DiagStream> {
    /// Start a session over an opened diag stream.
    pub fn open(stream: DiagStream, config: ItemConfig) -> Result<Self> {
        config.validate()?;
        let reader_stream = stream.try_clone()?;
        let reader = FrameReader::with_config_diag(reader_stream, config.frame.clone())?;
        let writer = FrameWriter::with_config_diag(stream, config.frame.clone())?;
        debug!(
            payload_capacity = config.payload_capacity,
            receive_mode = ?config.frame.receive_mode,
            "item session opened"
        );
        Self::from_parts(reader, writer, config)
    }
}

impl<R: Read, W: Write> ItemStore<R, W> {
    /// Assemble a store from separately owned halves.
    ///
    /// Fails with [`ItemError::InvalidCapacity`] when `config` is unusable.
    pub fn from_parts(
        reader: FrameReader<R>,
        writer: FrameWriter<W>,
        config: ItemConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reader,
            writer,
            config,
        })
    }

    /// Read item `id` into `out`.
    ///
    /// Returns the number of meaningful bytes copied; the rest of `out` is
    /// zero-filled. An empty `out` is a no-op that performs no I/O.
    pub fn read_item_into(&mut self, id: ItemId, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            warn!(item = %id, "attempted to read 0 bytes from item");
            return Ok(0);
        }

        let cmd = CommandBuffer::read(id, self.config.payload_capacity);
        let response = self.transact(&cmd)?;

        let n = out.len().min(self.config.payload_capacity);
        out[..n].copy_from_slice(&response[HEADER_SIZE..HEADER_SIZE + n]);
        out[n..].fill(0);
        Ok(n)
    }

    /// Read `size` bytes of item `id`, zero-filled past the payload capacity.
    pub fn read_item(&mut self, id: ItemId, size: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; size];
        self.read_item_into(id, &mut out)?;
        Ok(out)
    }

    /// Write `data` to item `id`.
    ///
    /// Returns the payload size the device echoed back, which is not a
    /// confirmation that the value was stored. Read the item back for that.
    pub fn write_item(&mut self, id: ItemId, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            warn!(item = %id, "attempted to write 0 bytes to item");
            return Ok(0);
        }

        let cmd = CommandBuffer::write(id, data, self.config.payload_capacity)?;
        let response = self.transact(&cmd)?;
        Ok(response.len() - HEADER_SIZE)
    }

    fn transact(&mut self, cmd: &CommandBuffer) -> Result<Bytes> {
        let id = cmd.item_id();
        let opcode = cmd.opcode();

        self.reader.discard_buffered();
        self.writer.send(cmd.as_bytes())?;
        let frame = self.reader.read_frame()?;

        let expected = cmd.len();
        let actual = frame.payload.len();
        if actual != expected {
            return Err(ItemError::LengthMismatch {
                id,
                opcode,
                expected,
                actual,
            });
        }

        if let Some(echoed) = echoed_item_id(&frame.payload) {
            if echoed != id {
                warn!(item = %id, echoed = %echoed, "response echoes a different item id");
            }
        }
        if Opcode::from_u8(frame.payload[0]) != Some(opcode) {
            warn!(item = %id, opcode = frame.payload[0], "response echoes a different opcode");
        }

        debug!(item = %id, %opcode, len = actual, "item transaction complete");
        Ok(frame.payload)
    }

    /// Current item configuration.
    pub fn config(&self) -> &ItemConfig {
        &self.config
    }

    /// Split the store back into its halves.
    pub fn into_parts(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}
