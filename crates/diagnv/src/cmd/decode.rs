use bytes::BytesMut;
use diagnv_frame::{decode_frame, FrameError};
use diagnv_item::{echoed_item_id, Opcode};
use tracing::warn;

use crate::cmd::{DecodeArgs, SessionArgs};
use crate::exit::{frame_error, io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frames, to_hex, FrameOutput, OutputFormat};

struct Decoded {
    frames: Vec<FrameOutput>,
    payloads: Vec<u8>,
    rejected: usize,
    trailing: usize,
}

pub fn run(args: DecodeArgs, session: &SessionArgs, format: OutputFormat) -> CliResult<i32> {
    let capture = std::fs::read(&args.file)
        .map_err(|err| io_error(&format!("cannot read {}", args.file.display()), err))?;

    let decoded = decode_capture(&capture)?;
    if decoded.frames.is_empty() && decoded.rejected == 0 {
        let err = if decoded.trailing == 0 && !capture.is_empty() {
            FrameError::Truncated { len: 0 }
        } else {
            FrameError::MissingTerminator {
                received: capture.len(),
            }
        };
        return Err(frame_error("decode failed", err));
    }

    print_frames(&decoded.frames, &decoded.payloads, format);

    if decoded.trailing > 0 {
        warn!(bytes = decoded.trailing, "capture ends without a frame terminator");
    }
    let bad_checksums = decoded.frames.iter().filter(|f| !f.checksum_valid).count();
    let verify = !session.no_verify_checksum;
    if decoded.rejected > 0 || decoded.trailing > 0 || (verify && bad_checksums > 0) {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

fn decode_capture(capture: &[u8]) -> CliResult<Decoded> {
    let mut buf = BytesMut::from(capture);
    let mut decoded = Decoded {
        frames: Vec::new(),
        payloads: Vec::new(),
        rejected: 0,
        trailing: 0,
    };

    loop {
        let index = decoded.frames.len() + decoded.rejected;
        match decode_frame(&mut buf, false) {
            Ok(Some(frame)) => {
                let checksum_valid = frame.checksum_valid();
                if !checksum_valid {
                    warn!(index, checksum = frame.checksum, "frame checksum mismatch");
                }
                decoded.frames.push(FrameOutput {
                    index,
                    item: echoed_item_id(&frame.payload).map(|id| id.0),
                    opcode: frame
                        .payload
                        .first()
                        .map(|&op| match Opcode::from_u8(op) {
                            Some(op) => op.to_string(),
                            None => format!("{op:#04x}"),
                        }),
                    size: frame.payload.len(),
                    checksum: format!("{:#06x}", frame.checksum),
                    checksum_valid,
                    bytes: to_hex(&frame.payload),
                });
                decoded.payloads.extend_from_slice(&frame.payload);
            }
            Ok(None) => break,
            Err(err @ FrameError::Truncated { .. }) => {
                warn!(index, %err, "skipping frame");
                decoded.rejected += 1;
            }
            Err(err) => return Err(frame_error("decode failed", err)),
        }
    }

    decoded.trailing = buf.len();
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use diagnv_frame::encode_frame;

    use super::*;

    fn wire(payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(payload, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn decodes_every_frame_in_capture() {
        let mut capture = wire(&[0x26, 0x4D, 0x07, 0x7E, 0x00]);
        capture.push(0x7E);
        capture.extend(wire(&[0x27, 0x55, 0x07, 0x01]));

        let decoded = decode_capture(&capture).unwrap();

        assert_eq!(decoded.frames.len(), 2);
        assert_eq!(decoded.frames[0].item, Some(1869));
        assert_eq!(decoded.frames[0].opcode.as_deref(), Some("read"));
        assert_eq!(decoded.frames[0].bytes, "26 4d 07 7e 00");
        assert_eq!(decoded.frames[1].index, 1);
        assert_eq!(decoded.frames[1].opcode.as_deref(), Some("write"));
        assert!(decoded.frames.iter().all(|f| f.checksum_valid));
        assert_eq!(decoded.trailing, 0);
    }

    #[test]
    fn flags_bad_checksum_and_trailing_bytes() {
        let mut capture = wire(&[0x13, 0x01, 0x02]);
        capture[0] = 0x14;
        capture.extend_from_slice(&[0x26, 0x4D]);

        let decoded = decode_capture(&capture).unwrap();

        assert_eq!(decoded.frames.len(), 1);
        assert!(!decoded.frames[0].checksum_valid);
        assert_eq!(decoded.frames[0].opcode.as_deref(), Some("0x14"));
        assert_eq!(decoded.trailing, 2);
    }

    #[test]
    fn short_frame_is_counted_not_fatal() {
        let mut capture = vec![0x01, 0x7E];
        capture.extend(wire(&[0x26, 0x00, 0x00]));

        let decoded = decode_capture(&capture).unwrap();

        assert_eq!(decoded.rejected, 1);
        assert_eq!(decoded.frames.len(), 1);
        assert_eq!(decoded.frames[0].index, 1);
    }
}
