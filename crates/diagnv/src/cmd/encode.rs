use bytes::BytesMut;
use diagnv_frame::{crc16, encode_frame, max_encoded_len};
use diagnv_item::CommandBuffer;

use crate::cmd::{EncodeArgs, SessionArgs};
use crate::exit::{item_error, CliResult, SUCCESS};
use crate::output::{print_frames, to_hex, FrameOutput, OutputFormat};

pub fn run(args: EncodeArgs, session: &SessionArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session.item_config();
    config
        .validate()
        .map_err(|err| item_error("encode failed", err))?;
    let capacity = config.payload_capacity;
    let cmd = match &args.write {
        Some(value) => CommandBuffer::write(args.item, &value.0, capacity)
            .map_err(|err| item_error("encode failed", err))?,
        None => CommandBuffer::read(args.item, capacity),
    };

    let mut wire = BytesMut::with_capacity(max_encoded_len(cmd.len()));
    encode_frame(cmd.as_bytes(), &mut wire);

    let out = FrameOutput {
        index: 0,
        item: Some(cmd.item_id().0),
        opcode: Some(cmd.opcode().to_string()),
        size: wire.len(),
        checksum: format!("{:#06x}", crc16(cmd.as_bytes())),
        checksum_valid: true,
        bytes: to_hex(&wire),
    };
    print_frames(&[out], &wire, format);
    Ok(SUCCESS)
}
