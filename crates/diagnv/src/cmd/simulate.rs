use std::path::PathBuf;
use std::str::FromStr;

use diagnv_item::{ItemId, ItemSimulator};
use diagnv_transport::SimulatorListener;
use tracing::warn;

use crate::cmd::{SessionArgs, SimulateArgs};
use crate::exit::{item_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::parse_hex;

/// `ID=HEX` seed for one simulated item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemAssignment {
    pub id: ItemId,
    pub value: Vec<u8>,
}

impl FromStr for ItemAssignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ID=HEX, got {s:?}"))?;
        let id = id
            .parse::<ItemId>()
            .map_err(|err| format!("invalid item id {id:?}: {err}"))?;
        Ok(Self {
            id,
            value: parse_hex(value)?,
        })
    }
}

pub fn run(args: SimulateArgs, session: &SessionArgs) -> CliResult<i32> {
    let config = session.item_config();
    config
        .validate()
        .map_err(|err| item_error("simulator setup failed", err))?;
    let mut sim = ItemSimulator::new(config.payload_capacity)
        .with_frame_config(config.frame)
        .with_writes_ignored(args.ignore_writes);
    for assignment in args.items {
        sim.insert(assignment.id, assignment.value);
    }

    let listener =
        SimulatorListener::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;
    install_ctrlc_handler(listener.path().to_path_buf())?;

    let mut served = 0usize;
    while args.max_connections.map_or(true, |max| served < max) {
        let stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        served += 1;
        if let Err(err) = sim.serve(stream) {
            warn!(%err, "simulated session ended with an error");
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(socket: PathBuf) -> CliResult<()> {
    ctrlc::set_handler(move || {
        let _ = std::fs::remove_file(&socket);
        std::process::exit(SUCCESS);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
