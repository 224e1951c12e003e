//! Cross-service audit replay order.
//!
//! Events are ordered by `(occurred_at, service, event_id)`, each compared
//! byte-wise on its canonical text. `occurred_at` is a
//! [`CanonicalTimestamp`](restore_canonical::CanonicalTimestamp), so byte
//! order is chronological order.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::contract::REPLAY_ORDER_VERSION;
use crate::errors::ReplayError;
use crate::events::{AuditEvent, AuditService};

/// Replay order over audit events.
pub fn compare_for_replay(a: &AuditEvent, b: &AuditEvent) -> Ordering {
    a.occurred_at
        .as_str()
        .as_bytes()
        .cmp(b.occurred_at.as_str().as_bytes())
        .then_with(|| a.service.as_str().cmp(b.service.as_str()))
        .then_with(|| a.event_id.as_bytes().cmp(b.event_id.as_bytes()))
}

/// Returns a new, replay-ordered copy of `events`.
pub fn sort_for_replay(events: &[AuditEvent]) -> Vec<AuditEvent> {
    let mut sorted = events.to_vec();
    sorted.sort_by(compare_for_replay);
    sorted
}

/// Checks that `events` has unique identities and is already in replay order.
pub fn validate_replay_batch(events: &[AuditEvent]) -> Result<(), ReplayError> {
    let mut seen: HashSet<(AuditService, &str)> = HashSet::with_capacity(events.len());
    for event in events {
        if !seen.insert(event.identity()) {
            return Err(duplicate(event));
        }
    }

    for (index, pair) in events.windows(2).enumerate() {
        if compare_for_replay(&pair[0], &pair[1]) == Ordering::Greater {
            let offender = &pair[1];
            return Err(ReplayError::OutOfOrder {
                index: index + 1,
                service: offender.service.as_str().to_string(),
                event_id: offender.event_id.clone(),
            });
        }
    }
    Ok(())
}

fn duplicate(event: &AuditEvent) -> ReplayError {
    ReplayError::DuplicateEvent {
        service: event.service.as_str().to_string(),
        event_id: event.event_id.clone(),
    }
}

/// Ordered, deduplicated audit events tagged with the replay order version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReplayBatch {
    /// Order version the batch was built with.
    pub replay_order_version: String,
    /// Events in replay order.
    pub events: Vec<AuditEvent>,
}

impl AuditReplayBatch {
    /// Wraps events that must already be unique and in replay order.
    pub fn new(events: Vec<AuditEvent>) -> Result<Self, ReplayError> {
        let batch = Self {
            replay_order_version: REPLAY_ORDER_VERSION.to_string(),
            events,
        };
        batch.validate()?;
        Ok(batch)
    }

    /// Sorts events from several services into one batch.
    ///
    /// Redeliveries of an identical event collapse into one entry; two
    /// different events sharing `(service, event_id)` are rejected.
    pub fn assemble(events: Vec<AuditEvent>) -> Result<Self, ReplayError> {
        let received = events.len();
        let mut sorted = events;
        sorted.sort_by(compare_for_replay);

        let mut kept: Vec<AuditEvent> = Vec::with_capacity(sorted.len());
        let mut index_of: HashMap<(AuditService, String), usize> = HashMap::new();
        for event in sorted {
            let key = (event.service, event.event_id.clone());
            if let Some(&idx) = index_of.get(&key) {
                if kept[idx] != event {
                    tracing::warn!(
                        service = event.service.as_str(),
                        event_id = %event.event_id,
                        "conflicting audit events share an identity"
                    );
                    return Err(duplicate(&event));
                }
                continue;
            }
            index_of.insert(key, kept.len());
            kept.push(event);
        }

        if kept.len() < received {
            tracing::warn!(
                collapsed = received - kept.len(),
                "collapsed redelivered audit events"
            );
        }
        tracing::debug!(events = kept.len(), "assembled audit replay batch");

        Ok(Self {
            replay_order_version: REPLAY_ORDER_VERSION.to_string(),
            events: kept,
        })
    }

    /// Re-checks a batch, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.replay_order_version != REPLAY_ORDER_VERSION {
            return Err(ReplayError::UnsupportedVersion(
                self.replay_order_version.clone(),
            ));
        }
        validate_replay_batch(&self.events)
    }
}
