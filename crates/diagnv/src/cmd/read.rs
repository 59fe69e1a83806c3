use crate::cmd::{ReadArgs, SessionArgs};
use crate::exit::{item_error, CliResult, SUCCESS};
use crate::output::{print_item, to_hex, ItemOutput, OutputFormat};

pub fn run(args: ReadArgs, session: &SessionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = session.open()?;
    let value = session
        .store
        .read_item(args.item, args.size)
        .map_err(|err| item_error("read failed", err))?;

    let out = ItemOutput {
        item: args.item.0,
        operation: "read",
        size: value.len(),
        value: to_hex(&value),
        echoed_size: None,
        verified: None,
    };
    print_item(&out, &value, format);
    Ok(SUCCESS)
}
