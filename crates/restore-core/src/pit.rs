//! Point-in-time row version ordering.
//!
//! Several observed writes to the same row are ordered by the chain
//! `sys_updated_on`, `sys_mod_count` (only when both sides carry it),
//! `event_time`, `event_id`. The maximum is the authoritative version.
//!
//! Skipping the counter when one side lacks it makes the order
//! non-transitive on mixed input: with `a = (mod 8, t0)`, `b = (no mod, t1)`
//! and `c = (mod 7, t2)`, `a > c`, `c > b` and `b > a`. Selection and
//! sorting therefore depend on input order for such sets, and callers feed
//! tuples in arrival order.

use std::cmp::Ordering;

use restore_canonical::parse_instant;
use serde::{Deserialize, Serialize};

use crate::errors::PitError;

/// Evidence used to decide which observed write to a row wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitRowTuple {
    /// Source-system update timestamp.
    pub sys_updated_on: String,
    /// Source-system modification counter, when the source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys_mod_count: Option<i64>,
    /// Ingestion time recorded with the event.
    pub event_time: String,
    /// Event identifier; final tiebreaker.
    pub event_id: String,
}

/// Compares two PIT tuples.
///
/// Antisymmetric, and transitive whenever every tuple compared carries
/// `sys_mod_count` or none does.
///
/// # Errors
///
/// Returns [`PitError::MalformedTimestamp`] if a timestamp that the chain
/// reaches cannot be parsed.
pub fn compare_pit(a: &PitRowTuple, b: &PitRowTuple) -> Result<Ordering, PitError> {
    let updated = parse_instant("sys_updated_on", &a.sys_updated_on)?
        .cmp(&parse_instant("sys_updated_on", &b.sys_updated_on)?);
    if updated != Ordering::Equal {
        return Ok(updated);
    }

    // Bypassed, not treated as equal, when either side lacks a counter.
    if let (Some(left), Some(right)) = (a.sys_mod_count, b.sys_mod_count) {
        let counted = left.cmp(&right);
        if counted != Ordering::Equal {
            return Ok(counted);
        }
    }

    let ingested = parse_instant("event_time", &a.event_time)?
        .cmp(&parse_instant("event_time", &b.event_time)?);
    if ingested != Ordering::Equal {
        return Ok(ingested);
    }

    Ok(a.event_id.as_bytes().cmp(b.event_id.as_bytes()))
}

/// Returns the maximal tuple.
///
/// On a tie the later element of `tuples` wins.
pub fn select_latest(tuples: &[PitRowTuple]) -> Result<&PitRowTuple, PitError> {
    select_latest_by(tuples, |tuple| tuple)
}

/// Returns the item whose tuple is maximal.
///
/// Items are scanned in order; the incumbent survives only if it is
/// strictly greater than the candidate, so ties go to the later item.
pub fn select_latest_by<T, F>(items: &[T], tuple_of: F) -> Result<&T, PitError>
where
    F: Fn(&T) -> &PitRowTuple,
{
    let (first, rest) = items.split_first().ok_or(PitError::EmptyInput)?;
    let mut best = first;
    for candidate in rest {
        if compare_pit(tuple_of(best), tuple_of(candidate))? != Ordering::Greater {
            best = candidate;
        }
    }
    Ok(best)
}

/// Returns the tuples in ascending order.
///
/// Stable insertion sort: each tuple moves left past every neighbour that
/// compares greater. Every adjacent pair of the result is non-decreasing
/// under [`compare_pit`], and the result is fixed by the input order even
/// when the comparison is not transitive.
///
/// Every timestamp is parsed up front so a malformed tuple fails the whole
/// sort instead of leaving it half-ordered.
pub fn sort_pit(tuples: &[PitRowTuple]) -> Result<Vec<PitRowTuple>, PitError> {
    for tuple in tuples {
        parse_instant("sys_updated_on", &tuple.sys_updated_on)?;
        parse_instant("event_time", &tuple.event_time)?;
    }
    let mut sorted: Vec<PitRowTuple> = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        let mut at = sorted.len();
        while at > 0 && compare_pit(&sorted[at - 1], tuple)? == Ordering::Greater {
            at -= 1;
        }
        sorted.insert(at, tuple.clone());
    }
    Ok(sorted)
}
