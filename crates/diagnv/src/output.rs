use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Value of one item, as read or written.
#[derive(Serialize)]
pub struct ItemOutput {
    pub item: u16,
    pub operation: &'static str,
    pub size: usize,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echoed_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// One frame, either built for sending or decoded from a capture.
#[derive(Serialize)]
pub struct FrameOutput {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opcode: Option<String>,
    pub size: usize,
    pub checksum: String,
    pub checksum_valid: bool,
    pub bytes: String,
}

#[derive(Serialize)]
pub struct CrcOutput {
    pub size: usize,
    pub crc: String,
    pub wire: String,
}

pub fn print_item(out: &ItemOutput, raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut header = vec!["ITEM", "OP", "SIZE", "VALUE"];
            let mut row = vec![
                out.item.to_string(),
                out.operation.to_string(),
                out.size.to_string(),
                out.value.clone(),
            ];
            if let Some(verified) = out.verified {
                header.push("VERIFIED");
                row.push(verified.to_string());
            }
            print_table(header, vec![row]);
        }
        OutputFormat::Pretty => {
            println!(
                "item {} ({:#06x}) {} {} bytes",
                out.item, out.item, out.operation, out.size
            );
            print!("{}", hex_dump(raw));
            if let Some(verified) = out.verified {
                println!("verified={verified}");
            }
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

pub fn print_frames(frames: &[FrameOutput], raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            if let [frame] = frames {
                print_json(frame);
            } else {
                print_json(&frames);
            }
        }
        OutputFormat::Table => {
            let rows = frames
                .iter()
                .map(|f| {
                    vec![
                        f.index.to_string(),
                        f.item.map(|i| i.to_string()).unwrap_or_else(|| "-".into()),
                        f.opcode.clone().unwrap_or_else(|| "-".into()),
                        f.size.to_string(),
                        format!("{}{}", f.checksum, if f.checksum_valid { "" } else { " (bad)" }),
                    ]
                })
                .collect();
            print_table(vec!["#", "ITEM", "OP", "SIZE", "CRC"], rows);
        }
        OutputFormat::Pretty => {
            for f in frames {
                println!(
                    "frame {} item={} op={} size={} crc={}{}",
                    f.index,
                    f.item.map(|i| i.to_string()).unwrap_or_else(|| "-".into()),
                    f.opcode.as_deref().unwrap_or("-"),
                    f.size,
                    f.checksum,
                    if f.checksum_valid { "" } else { " (bad)" }
                );
                println!("  {}", f.bytes);
            }
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

pub fn print_crc(out: &CrcOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(
            vec!["SIZE", "CRC", "WIRE"],
            vec![vec![out.size.to_string(), out.crc.clone(), out.wire.clone()]],
        ),
        OutputFormat::Pretty => println!("crc16={} wire={} size={}", out.crc, out.wire, out.size),
        OutputFormat::Raw => println!("{}", out.crc),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

/// Space-separated lowercase hex, e.g. `87 43 e8 04`.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Offset-prefixed dump, 16 bytes per line.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in bytes.chunks(16).enumerate() {
        out.push_str(&format!("{:04x}  {}\n", line * 16, to_hex(chunk)));
    }
    out
}

/// Parse hex bytes. Accepts an optional `0x` prefix and ignores spaces,
/// colons and dashes between digits.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = body
        .bytes()
        .filter(|b| !matches!(b, b' ' | b':' | b'-' | b'\t'))
        .collect();

    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {input:?}"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_digit(pair[0]);
            let lo = hex_digit(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
                _ => Err(format!("invalid hex digit in {input:?}")),
            }
        })
        .collect()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
