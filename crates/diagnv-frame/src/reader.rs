use std::io::{ErrorKind, Read};

use bytes::BytesMut;
#[cfg(unix)]
use diagnv_transport::DiagStream;
use tracing::{debug, trace};

use crate::codec::{decode_frame, no_frame, Frame, FrameConfig, ReceiveMode};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 256;

/// Reads terminator-delimited frames from any `Read` stream.
///
/// In [`ReceiveMode::Accumulate`] partial reads are handled internally and
/// callers always get complete frames. In [`ReceiveMode::SingleRead`] exactly
/// one read call must deliver the whole frame.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.receive_capacity),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    pub fn read_frame(&mut self) -> Result<Frame> {
        match self.config.receive_mode {
            ReceiveMode::SingleRead => self.read_single(),
            ReceiveMode::Accumulate => self.read_accumulated(),
        }
    }

    /// Drop any bytes buffered from earlier reads.
    ///
    /// Returns the number of bytes discarded.
    pub fn discard_buffered(&mut self) -> usize {
        let stale = self.buf.len();
        if stale > 0 {
            debug!(stale, "discarding buffered bytes");
            self.buf.clear();
        }
        stale
    }

    fn read_single(&mut self) -> Result<Frame> {
        self.buf.clear();
        self.buf.resize(self.config.receive_capacity, 0);

        let read = loop {
            match self.inner.read(&mut self.buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.clear();
                    return Err(FrameError::Read(err));
                }
            }
        };
        self.buf.truncate(read);
        trace!(read, "single read");

        if read == 0 {
            return Err(FrameError::ConnectionClosed);
        }

        let frame = decode_frame(&mut self.buf, self.config.verify_checksum)?;
        let frame = frame.ok_or_else(|| no_frame(&self.buf, read));
        self.buf.clear();
        frame
    }

    fn read_accumulated(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.verify_checksum)? {
                return Ok(frame);
            }

            let room = self.config.receive_capacity.saturating_sub(self.buf.len());
            if room == 0 {
                let received = self.buf.len();
                self.buf.clear();
                return Err(FrameError::MissingTerminator { received });
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let want = room.min(READ_CHUNK_SIZE);
            let read = match self.inner.read(&mut chunk[..want]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Read(err)),
            };
            trace!(read, buffered = self.buf.len(), "accumulating response");

            if read == 0 {
                let received = self.buf.len();
                self.buf.clear();
                return Err(if received == 0 {
                    FrameError::ConnectionClosed
                } else {
                    FrameError::MissingTerminator { received }
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(unix)]
impl FrameReader<DiagStream> {
    /// Create a frame reader for `DiagStream` and apply read timeout from config.
    pub fn with_config_diag(inner: DiagStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(unix)]
fn transport_to_frame_error(err: diagnv_transport::TransportError) -> FrameError {
    match err {
        diagnv_transport::TransportError::Io(io) => FrameError::Read(io),
        other => FrameError::Read(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::encode_frame;

    fn wire(payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(payload, &mut buf);
        buf.to_vec()
    }

    fn single_read_config() -> FrameConfig {
        FrameConfig {
            receive_mode: ReceiveMode::SingleRead,
            ..FrameConfig::default()
        }
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(b"hello")));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let mut bytes = wire(b"one");
        bytes.extend(wire(b"two"));
        bytes.extend(wire(b"three"));

        let mut reader = FrameReader::new(Cursor::new(bytes));

        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"three");
    }

    #[test]
    fn partial_read_handling() {
        let mut response = vec![0u8; 133];
        response[..3].copy_from_slice(&[0x26, 0x4D, 0x07]);
        response[3] = 0x7E;

        let byte_reader = ByteByByteReader {
            bytes: wire(&response),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), response.as_slice());
    }

    #[test]
    fn single_read_rejects_split_frame() {
        let byte_reader = ByteByByteReader {
            bytes: wire(b"split"),
            pos: 0,
        };
        let mut reader = FrameReader::with_config(byte_reader, single_read_config());

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::MissingTerminator { received: 1 }));
    }

    #[test]
    fn single_read_of_bare_terminators_is_empty_frame() {
        let mut reader =
            FrameReader::with_config(Cursor::new(vec![0x7E, 0x7E]), single_read_config());

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Truncated { len: 0 }));
        assert_eq!(reader.discard_buffered(), 0);
    }

    #[test]
    fn single_read_accepts_whole_frame() {
        let mut reader =
            FrameReader::with_config(Cursor::new(wire(b"\x26\x4d\x07")), single_read_config());
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"\x26\x4d\x07");
    }

    #[test]
    fn single_read_without_terminator_is_framing_error() {
        let mut reader =
            FrameReader::with_config(Cursor::new(vec![0x26u8; 64]), single_read_config());
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::MissingTerminator { received: 64 }));
    }

    #[test]
    fn accumulate_stops_at_capacity() {
        let cfg = FrameConfig {
            receive_capacity: 32,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(vec![0x11u8; 1024]), cfg);

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::MissingTerminator { received: 32 }));
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut bytes = wire(b"only-part");
        bytes.pop();

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::MissingTerminator { .. }));
    }

    #[test]
    fn discard_buffered_drops_trailing_bytes() {
        let mut bytes = wire(b"first");
        bytes.extend_from_slice(&[0x01, 0x02]);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        reader.read_frame().unwrap();
        assert_eq!(reader.discard_buffered(), 2);
        assert_eq!(reader.discard_buffered(), 0);
    }

    #[test]
    fn corrupted_frame_in_stream() {
        let mut bytes = wire(b"\x26\x4d\x07");
        bytes[1] ^= 0x40;

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[cfg(unix)]
    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = DiagStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(b"\x26\x4d\x07").unwrap();
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.payload.as_ref(), b"\x26\x4d\x07");
    }

    #[test]
    fn read_error_propagates() {
        let mut reader = FrameReader::new(FailingReader);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Read(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire(b"ok"),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();

        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[cfg(unix)]
    #[test]
    fn applies_read_timeout_for_diag_stream() {
        let (host, mut device) = DiagStream::pair().unwrap();
        let cfg = FrameConfig {
            read_timeout: Some(std::time::Duration::from_millis(10)),
            ..FrameConfig::default()
        };

        let mut reader = FrameReader::with_config_diag(host, cfg).unwrap();
        std::io::Write::write_all(&mut device, &[0x01]).unwrap();
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Read(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        ));
    }
}
