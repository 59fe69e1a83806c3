use std::io::{ErrorKind, Write};

use bytes::BytesMut;
#[cfg(unix)]
use diagnv_transport::DiagStream;
use tracing::{debug, trace};

use crate::codec::{encode_frame, max_encoded_len, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Writes complete frames to any `Write` stream.
///
/// Each frame goes out in a single write call. The call is repeated while the
/// stream reports `WouldBlock` or `Interrupted`; anything shorter than the
/// full frame is a hard failure.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send a payload as one frame.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        self.buf.reserve(max_encoded_len(payload.len()));
        encode_frame(payload, &mut self.buf);

        let expected = self.buf.len();
        let written = loop {
            match self.inner.write(&self.buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    trace!("write would block; retrying");
                    continue;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Write(err)),
            }
        };

        if written != expected {
            return Err(FrameError::ShortWrite { written, expected });
        }
        debug!(payload_len = payload.len(), wire_len = expected, "frame sent");

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Write(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(unix)]
impl FrameWriter<DiagStream> {
    /// Create a frame writer for `DiagStream` and apply write timeout from config.
    pub fn with_config_diag(inner: DiagStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(unix)]
fn transport_to_frame_error(err: diagnv_transport::TransportError) -> FrameError {
    match err {
        diagnv_transport::TransportError::Io(io) => FrameError::Write(io),
        other => FrameError::Write(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{decode, decode_frame, TERMINATOR};

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send(b"\x26\x4d\x07").unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.last(), Some(&TERMINATOR));
        let frame = decode(&wire, true).unwrap();
        assert_eq!(frame.payload.as_ref(), b"\x26\x4d\x07");
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send(b"first").unwrap();
        writer.send(b"second").unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        let f1 = decode_frame(&mut wire, true).unwrap().unwrap();
        let f2 = decode_frame(&mut wire, true).unwrap().unwrap();
        assert_eq!(f1.payload.as_ref(), b"first");
        assert_eq!(f2.payload.as_ref(), b"second");
        assert!(wire.is_empty());
    }

    #[test]
    fn would_block_is_retried() {
        let sink = WouldBlockThenAccept {
            remaining_blocks: 3,
            calls: 0,
            written: Vec::new(),
        };
        let mut writer = FrameWriter::new(sink);

        writer.send(b"retry").unwrap();

        let sink = writer.into_inner();
        assert_eq!(sink.calls, 4);
        assert_eq!(decode(&sink.written, true).unwrap().payload.as_ref(), b"retry");
    }

    #[test]
    fn short_write_is_hard_failure() {
        let mut writer = FrameWriter::new(ShortWriter { accept: 2 });

        let err = writer.send(b"too long for the device").unwrap_err();
        assert!(matches!(err, FrameError::ShortWrite { written: 2, .. }));
        assert!(!err.after_send());
    }

    #[test]
    fn other_errors_are_not_retried() {
        let mut writer = FrameWriter::new(BrokenWriter { calls: 0 });

        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::Write(ref e) if e.kind() == ErrorKind::BrokenPipe));
        assert_eq!(writer.get_ref().calls, 1);
    }

    #[cfg(unix)]
    #[test]
    fn applies_write_timeout_for_diag_stream() {
        let (host, _device) = DiagStream::pair().unwrap();
        let cfg = FrameConfig {
            write_timeout: Some(std::time::Duration::from_millis(50)),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config_diag(host, cfg).unwrap();
        writer.send(b"\x26\x4d\x07").unwrap();
    }

    struct WouldBlockThenAccept {
        remaining_blocks: usize,
        calls: usize,
        written: Vec<u8>,
    }

    impl Write for WouldBlockThenAccept {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.calls += 1;
            if self.remaining_blocks > 0 {
                self.remaining_blocks -= 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ShortWriter {
        accept: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len().min(self.accept))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter {
        calls: usize,
    }

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.calls += 1;
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
