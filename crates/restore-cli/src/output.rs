//! Output formatting utilities.

use restore_core::AuditEvent;
use serde::Serialize;

/// Formats a value as pretty JSON.
pub fn format_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Formats an audit event as a simple table row.
pub fn format_event_row(event: &AuditEvent) -> String {
    format!(
        "{:<24} {:<4} {:<36} {:<10} {:<20} {}",
        event.occurred_at.as_str(),
        event.service.as_str(),
        truncate(&event.event_id, 36),
        event.lifecycle.as_str(),
        truncate(&event.action, 20),
        event.outcome.as_str()
    )
}

/// Prints table header.
#[allow(clippy::print_literal)]
pub fn print_event_header() {
    println!(
        "{:<24} {:<4} {:<36} {:<10} {:<20} {}",
        "OCCURRED_AT", "SVC", "EVENT_ID", "LIFECYCLE", "ACTION", "OUTCOME"
    );
    println!("{}", "-".repeat(110));
}

/// Prints a list of audit events as a table.
pub fn print_event_table(events: &[AuditEvent]) {
    print_event_header();
    for event in events {
        println!("{}", format_event_row(event));
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
