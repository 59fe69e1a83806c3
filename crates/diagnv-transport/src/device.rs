use std::fs::OpenOptions;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::stream::DiagStream;

/// Default diag character device node.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/diag_tty";

impl DiagStream {
    /// Open the diag character device for reading and writing (blocking).
    ///
    /// The node is opened with `O_NOCTTY` so a tty-backed diag port never
    /// becomes the controlling terminal. Creating the node when it is absent
    /// is left to the platform.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "opening diag device");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(|e| TransportError::Open {
                path: path.to_path_buf(),
                source: e,
            })?;

        match file.metadata() {
            Ok(metadata) if !metadata.file_type().is_char_device() => {
                warn!(?path, "diag path is not a character device");
            }
            Ok(_) => {}
            Err(err) => debug!(?path, %err, "could not stat diag device"),
        }

        info!(?path, "opened diag device");
        Ok(Self::from_device(file))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom, Write};

    use super::*;

    #[test]
    fn open_missing_device_fails() {
        let path = std::env::temp_dir().join(format!(
            "diagnv-no-such-device-{}",
            std::process::id()
        ));
        let err = DiagStream::open(&path).unwrap_err();
        match err {
            TransportError::Open { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn open_regular_file_is_usable() {
        let dir = std::env::temp_dir().join(format!("diagnv-device-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fake_diag");
        std::fs::write(&path, b"").unwrap();

        let mut stream = DiagStream::open(&path).unwrap();
        assert_eq!(stream.transport_name(), "char-device");
        stream.write_all(&[0x26, 0x7E]).unwrap();
        drop(stream);

        let mut file = std::fs::File::open(&path).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, vec![0x26, 0x7E]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
