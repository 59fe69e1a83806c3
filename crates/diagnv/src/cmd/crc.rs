use diagnv_frame::crc16;

use crate::cmd::CrcArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_crc, to_hex, CrcOutput, OutputFormat};

pub fn run(args: CrcArgs, format: OutputFormat) -> CliResult<i32> {
    let data = args.data.0;
    let crc = crc16(&data);
    let out = CrcOutput {
        size: data.len(),
        crc: format!("{crc:#06x}"),
        wire: to_hex(&crc.to_le_bytes()),
    };
    print_crc(&out, format);
    Ok(SUCCESS)
}
