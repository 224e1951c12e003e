//! PIT selection command.

use crate::{input, output};
use restore_core::{select_latest, sort_pit, PitRowTuple};

pub fn run(
    input: Option<String>,
    all: bool,
    max_size: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tuples: Vec<PitRowTuple> = input::read_json(input.as_deref(), max_size)?;

    if all {
        let ordered = sort_pit(&tuples)?;
        println!("{}", output::format_json(&ordered)?);
    } else {
        let latest = select_latest(&tuples)?;
        tracing::debug!(event_id = %latest.event_id, candidates = tuples.len(), "selected latest tuple");
        println!("{}", output::format_json(latest)?);
    }
    Ok(())
}
