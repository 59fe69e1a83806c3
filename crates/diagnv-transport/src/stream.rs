use std::fs::File;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected duplex byte channel to the diag endpoint — implements Read + Write.
///
/// On a real handset this wraps the diag character device. For simulators
/// and tests it can wrap a Unix domain socket stream instead; the protocol
/// layers above cannot tell the difference.
pub struct DiagStream {
    inner: DiagStreamInner,
}

enum DiagStreamInner {
    Device(File),
    Unix(UnixStream),
}

impl Read for DiagStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            DiagStreamInner::Device(file) => file.read(buf),
            DiagStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for DiagStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            DiagStreamInner::Device(file) => file.write(buf),
            DiagStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            DiagStreamInner::Device(file) => file.flush(),
            DiagStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl DiagStream {
    pub(crate) fn from_device(file: File) -> Self {
        Self {
            inner: DiagStreamInner::Device(file),
        }
    }

    pub(crate) fn from_unix(stream: UnixStream) -> Self {
        Self {
            inner: DiagStreamInner::Unix(stream),
        }
    }

    /// Connect to a device simulator listening on a Unix domain socket.
    pub fn connect_unix(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to diag simulator socket");
        Ok(Self::from_unix(stream))
    }

    /// Create a connected pair of in-process streams.
    ///
    /// One end plays the host, the other the device.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying stream.
    ///
    /// Character devices do not support timeouts; the call is a no-op there.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            DiagStreamInner::Device(_) => Ok(()),
            DiagStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    ///
    /// Character devices do not support timeouts; the call is a no-op there.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            DiagStreamInner::Device(_) => Ok(()),
            DiagStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            DiagStreamInner::Device(file) => Ok(Self::from_device(file.try_clone()?)),
            DiagStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Backend name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            DiagStreamInner::Device(_) => "char-device",
            DiagStreamInner::Unix(_) => "unix-socket",
        }
    }
}

impl std::fmt::Debug for DiagStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
