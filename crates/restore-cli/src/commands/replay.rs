//! Audit replay sort and validate commands.

use crate::{input, output};
use restore_core::{sort_for_replay, validate_replay_batch, AuditEvent, AuditReplayBatch};
use serde::Deserialize;
use serde_json::json;

/// A versioned batch or a bare array of events.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayInput {
    Batch(AuditReplayBatch),
    Events(Vec<AuditEvent>),
}

pub fn run_sort(
    input: Option<String>,
    assemble: bool,
    json_output: bool,
    max_size: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let events: Vec<AuditEvent> = input::read_json(input.as_deref(), max_size)?;

    if assemble {
        let batch = AuditReplayBatch::assemble(events)?;
        if json_output {
            println!("{}", output::format_json(&batch)?);
        } else {
            output::print_event_table(&batch.events);
        }
        return Ok(());
    }

    let sorted = sort_for_replay(&events);
    if json_output {
        println!("{}", output::format_json(&sorted)?);
    } else {
        output::print_event_table(&sorted);
    }
    Ok(())
}

pub fn run_validate(
    input: Option<String>,
    json_output: bool,
    max_size: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed: ReplayInput = input::read_json(input.as_deref(), max_size)?;
    let (count, result) = match &parsed {
        ReplayInput::Batch(batch) => (batch.events.len(), batch.validate()),
        ReplayInput::Events(events) => (events.len(), validate_replay_batch(events)),
    };

    if json_output {
        let verdict = json!({
            "events": count,
            "valid": result.is_ok(),
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", output::format_json(&verdict)?);
    } else if result.is_ok() {
        println!("OK {} events in replay order", count);
    }

    result.map_err(|e| {
        tracing::warn!(error = %e, "replay batch rejected");
        Box::<dyn std::error::Error>::from(format!("Replay batch rejected: {}", e))
    })
}
