use diagnv_item::ItemError;
use tracing::warn;

use crate::cmd::{SessionArgs, WriteArgs};
use crate::exit::{item_error, CliError, CliResult, SUCCESS, VERIFY_MISMATCH};
use crate::output::{print_item, to_hex, ItemOutput, OutputFormat};

pub fn run(args: WriteArgs, session: &SessionArgs, format: OutputFormat) -> CliResult<i32> {
    let value = args.value.0;
    let mut session = session.open()?;

    let echoed = session
        .store
        .write_item(args.item, &value)
        .map_err(write_failure)?;

    let verified = if args.no_verify {
        None
    } else {
        let readback = session
            .store
            .read_item(args.item, value.len())
            .map_err(|err| item_error("read-back failed", err))?;
        if readback != value {
            warn!(
                item = %args.item,
                expected = %to_hex(&value),
                actual = %to_hex(&readback),
                "item value differs after write"
            );
        }
        Some(readback == value)
    };

    let out = ItemOutput {
        item: args.item.0,
        operation: "write",
        size: value.len(),
        value: to_hex(&value),
        echoed_size: Some(echoed),
        verified,
    };
    print_item(&out, &value, format);

    Ok(match verified {
        Some(false) => VERIFY_MISMATCH,
        _ => SUCCESS,
    })
}

fn write_failure(err: ItemError) -> CliError {
    let sent = err.request_sent();
    let mut mapped = item_error("write failed", err);
    if sent {
        mapped
            .message
            .push_str(" (request reached the device; read the item back to check its value)");
    }
    mapped
}
