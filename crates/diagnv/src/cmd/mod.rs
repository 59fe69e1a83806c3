use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Subcommand};
use diagnv_frame::{FrameConfig, ReceiveMode, DEFAULT_RECEIVE_CAPACITY};
use diagnv_item::{ItemConfig, ItemId, ItemStore, DEFAULT_PAYLOAD_CAPACITY};
use diagnv_transport::{
    DiagStream, LoggingModeGuard, DEFAULT_DEVICE_PATH, DEFAULT_LOGGING_MODE_PATH,
};
use tracing::debug;

use crate::exit::{item_error, transport_error, CliResult};
use crate::output::{parse_hex, OutputFormat};

pub mod crc;
pub mod decode;
pub mod encode;
pub mod read;
pub mod simulate;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read an item value.
    Read(ReadArgs),
    /// Write an item value and read it back.
    Write(WriteArgs),
    /// Compute the frame checksum of some bytes.
    Crc(CrcArgs),
    /// Print the wire frame for a read or write request.
    Encode(EncodeArgs),
    /// Decode the frames in a capture file.
    Decode(DecodeArgs),
    /// Serve the item protocol from memory on a Unix socket.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, session: &SessionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Read(args) => read::run(args, session, format),
        Command::Write(args) => write::run(args, session, format),
        Command::Crc(args) => crc::run(args, format),
        Command::Encode(args) => encode::run(args, session, format),
        Command::Decode(args) => decode::run(args, session, format),
        Command::Simulate(args) => simulate::run(args, session),
        Command::Version(args) => version::run(args),
    }
}

/// Device selection and protocol knobs shared by every subcommand.
#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Diag character device.
    #[arg(
        long,
        value_name = "PATH",
        env = "DIAGNV_DEVICE",
        default_value = DEFAULT_DEVICE_PATH,
        global = true
    )]
    pub device: PathBuf,

    /// Talk to a device simulator socket instead of the character device.
    #[arg(long, value_name = "PATH", global = true)]
    pub socket: Option<PathBuf>,

    /// Logging-mode sysfs attribute. Defaults to the diag attribute unless
    /// --socket is given.
    #[arg(long, value_name = "PATH", env = "DIAGNV_LOGGING_MODE_PATH", global = true)]
    pub logging_mode_path: Option<PathBuf>,

    /// Leave the device logging mode untouched.
    #[arg(long, global = true)]
    pub no_logging_mode: bool,

    /// Expect each response in a single read.
    #[arg(long, global = true)]
    pub single_read: bool,

    /// Accept responses whose checksum does not match.
    #[arg(long, global = true)]
    pub no_verify_checksum: bool,

    /// Item payload capacity in bytes.
    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = DEFAULT_PAYLOAD_CAPACITY,
        value_parser = parse_payload_capacity,
        global = true
    )]
    pub payload_capacity: usize,

    /// Socket read/write timeout (e.g. 5s, 500ms). Device nodes block.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, global = true)]
    pub timeout: Option<Duration>,
}

/// An open item session. Field order matters: the stream closes before the
/// logging mode is restored.
pub struct Session {
    pub store: ItemStore<DiagStream, DiagStream>,
    _logging_mode: Option<LoggingModeGuard>,
}

impl SessionArgs {
    pub fn item_config(&self) -> ItemConfig {
        ItemConfig {
            payload_capacity: self.payload_capacity,
            frame: FrameConfig {
                receive_mode: if self.single_read {
                    ReceiveMode::SingleRead
                } else {
                    ReceiveMode::Accumulate
                },
                verify_checksum: !self.no_verify_checksum,
                read_timeout: self.timeout,
                write_timeout: self.timeout,
                ..FrameConfig::default()
            },
        }
    }

    fn resolved_logging_mode_path(&self) -> Option<PathBuf> {
        if self.no_logging_mode {
            return None;
        }
        match (&self.logging_mode_path, &self.socket) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(_)) => None,
            (None, None) => Some(PathBuf::from(DEFAULT_LOGGING_MODE_PATH)),
        }
    }

    /// Switch the logging mode, open the transport and start an item session.
    pub fn open(&self) -> CliResult<Session> {
        let logging_mode = match self.resolved_logging_mode_path() {
            Some(path) => Some(
                LoggingModeGuard::enable(path)
                    .map_err(|err| transport_error("logging mode switch failed", err))?,
            ),
            None => None,
        };

        let stream = match &self.socket {
            Some(path) => DiagStream::connect_unix(path)
                .map_err(|err| transport_error("simulator connect failed", err))?,
            None => DiagStream::open(&self.device)
                .map_err(|err| transport_error("device open failed", err))?,
        };
        debug!(transport = stream.transport_name(), "transport ready");

        let store = ItemStore::open(stream, self.item_config())
            .map_err(|err| item_error("session setup failed", err))?;

        Ok(Session {
            store,
            _logging_mode: logging_mode,
        })
    }
}

/// Bytes given on the command line as hex.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl FromStr for HexBytes {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex(s).map(HexBytes)
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Item id, decimal or 0x-prefixed hex.
    pub item: ItemId,
    /// Number of bytes to return.
    #[arg(long, default_value_t = 8)]
    pub size: usize,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Item id, decimal or 0x-prefixed hex.
    pub item: ItemId,
    /// Value as hex bytes (e.g. 8743e804).
    pub value: HexBytes,
    /// Skip reading the item back after the write.
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args, Debug)]
pub struct CrcArgs {
    /// Input as hex bytes.
    pub data: HexBytes,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Item id, decimal or 0x-prefixed hex.
    pub item: ItemId,
    /// Encode a write of these hex bytes instead of a read.
    #[arg(long, value_name = "HEX")]
    pub write: Option<HexBytes>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file holding raw frames.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Socket path to bind.
    #[arg(value_name = "SOCKET")]
    pub path: PathBuf,
    /// Seed an item value (repeatable).
    #[arg(long = "item", value_name = "ID=HEX")]
    pub items: Vec<simulate::ItemAssignment>,
    /// Exit after serving N connections.
    #[arg(long, value_name = "N")]
    pub max_connections: Option<usize>,
    /// Echo writes without storing them, so read-back sees the old value.
    #[arg(long)]
    pub ignore_writes: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

fn parse_payload_capacity(input: &str) -> Result<usize, String> {
    let max = ItemConfig::max_payload_capacity(DEFAULT_RECEIVE_CAPACITY);
    let value: usize = input
        .trim()
        .parse()
        .map_err(|_| format!("invalid payload capacity: {input}"))?;
    if value == 0 || value > max {
        return Err(format!("payload capacity must be between 1 and {max}"));
    }
    Ok(value)
}
