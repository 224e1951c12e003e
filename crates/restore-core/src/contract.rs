//! Version tags embedded in persisted payloads.
//!
//! Any change to canonicalization or a tie-break rule must bump the matching
//! tag so stored plans, tuples and replay batches are never reinterpreted.

/// Version of the plan-hash input layout.
pub const PLAN_HASH_INPUT_VERSION: &str = "plan-hash-input.v1";

/// Version of the PIT tuple comparison algorithm.
pub const PIT_ALGORITHM_VERSION: &str = "pit-tuple.v1";

/// Version of the cross-service audit replay order.
pub const REPLAY_ORDER_VERSION: &str = "audit-replay-order.v1";

/// Tie-break chain applied by [`compare_pit`](crate::pit::compare_pit), in order.
pub const PIT_TIE_BREAKER: [&str; 4] = ["sys_updated_on", "sys_mod_count", "event_time", "event_id"];
