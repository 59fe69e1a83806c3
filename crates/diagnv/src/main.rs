mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, SessionArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "diagnv",
    version,
    about = "Read and write device configuration items over diag"
)]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "DIAGNV_LOG_LEVEL",
        default_value = "warn",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.session, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use diagnv_item::ItemId;

    use super::*;
    use crate::cmd::HexBytes;

    #[test]
    fn parses_read_with_hex_item_id() {
        let cli = Cli::try_parse_from(["diagnv", "read", "0x074D", "--size", "4"])
            .expect("read args should parse");

        match cli.command {
            Command::Read(args) => {
                assert_eq!(args.item, ItemId(1869));
                assert_eq!(args.size, 4);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_write_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "diagnv",
            "write",
            "1877",
            "8743e804",
            "--socket",
            "/tmp/sim.sock",
            "--single-read",
            "--no-verify",
        ])
        .expect("write args should parse");

        assert_eq!(
            cli.session.socket.as_deref(),
            Some(std::path::Path::new("/tmp/sim.sock"))
        );
        assert!(cli.session.single_read);
        match cli.command {
            Command::Write(args) => {
                assert_eq!(args.value, HexBytes(vec![0x87, 0x43, 0xE8, 0x04]));
                assert!(args.no_verify);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_odd_length_hex() {
        let err = Cli::try_parse_from(["diagnv", "crc", "123"]).expect_err("odd hex should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_item_id_out_of_range() {
        let err = Cli::try_parse_from(["diagnv", "read", "70000"])
            .expect_err("item id should not fit in u16");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_simulate_with_seeded_items() {
        let cli = Cli::try_parse_from([
            "diagnv",
            "simulate",
            "/tmp/sim.sock",
            "--item",
            "1877=8743e804",
            "--item",
            "0x2082=01",
            "--max-connections",
            "2",
            "--ignore-writes",
        ])
        .expect("simulate args should parse");

        match cli.command {
            Command::Simulate(args) => {
                assert_eq!(args.items.len(), 2);
                assert_eq!(args.items[1].id, ItemId(8322));
                assert_eq!(args.max_connections, Some(2));
                assert!(args.ignore_writes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unusable_payload_capacity() {
        for capacity in ["0", "600", "18446744073709551615"] {
            let result =
                Cli::try_parse_from(["diagnv", "encode", "1", "--payload-capacity", capacity]);
            assert!(result.is_err(), "capacity {capacity} should be rejected");
        }

        let cli = Cli::try_parse_from(["diagnv", "--payload-capacity", "8", "encode", "1"])
            .expect("small capacity should parse");
        assert_eq!(cli.session.payload_capacity, 8);
    }
}
