//! Legacy event translation command.

use crate::{input, output};
use clap::ValueEnum;
use restore_core::{map_auth_event, map_job_event, AuditEvent, LegacyAuthEvent, LegacyJobEvent};

/// Legacy event shapes accepted by `legacy-map`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LegacyKind {
    /// Auth service access decisions.
    Auth,
    /// Restore job lifecycle events.
    Job,
}

pub fn run(
    input: Option<String>,
    kind: LegacyKind,
    json_output: bool,
    max_size: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mapped: Vec<AuditEvent> = match kind {
        LegacyKind::Auth => {
            let legacy: Vec<LegacyAuthEvent> = input::read_json(input.as_deref(), max_size)?;
            legacy
                .iter()
                .map(|event| {
                    map_auth_event(event).map_err(|e| format!("event {}: {}", event.event_id, e))
                })
                .collect::<Result<_, _>>()?
        }
        LegacyKind::Job => {
            let legacy: Vec<LegacyJobEvent> = input::read_json(input.as_deref(), max_size)?;
            legacy
                .iter()
                .map(|event| {
                    map_job_event(event).map_err(|e| format!("event {}: {}", event.event_id, e))
                })
                .collect::<Result<_, _>>()?
        }
    };

    tracing::debug!(kind = ?kind, events = mapped.len(), "mapped legacy events");

    if json_output {
        println!("{}", output::format_json(&mapped)?);
    } else {
        output::print_event_table(&mapped);
    }
    Ok(())
}
