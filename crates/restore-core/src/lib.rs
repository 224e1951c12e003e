//! Agreement primitives for the CDC restore pipeline.
//!
//! This crate provides:
//! - The plan-hash input model and SHA-256 plan hash computation
//! - The point-in-time (PIT) row tuple order and latest-version selection
//! - The cross-service audit event model and its replay order
//! - Adapters from legacy auth and restore-job events to audit events
//!
//! Core invariants:
//! - Plan hashes are `sha256(canonical_text(input))`; a [`PlanHashInput`]
//!   is checked before it is hashed
//! - Ties are broken deterministically; the PIT comparison is only
//!   transitive when tuples agree on whether they carry `sys_mod_count`, so
//!   PIT selection depends on arrival order for mixed input
//! - All functions are pure and safe to call from any thread
//!
#![deny(missing_docs)]

/// Version tags embedded in persisted payloads.
pub mod contract;
/// Error types for core operations.
pub mod errors;
/// Cross-service audit event model.
pub mod events;
/// Legacy event adapters.
pub mod legacy;
/// PIT row tuple ordering.
pub mod pit;
/// Plaintext field detection.
pub mod plaintext;
/// Plan-hash input model.
pub mod plan;
/// Plan hash computation and verification.
pub mod plan_hash;
/// Audit replay ordering and batches.
pub mod replay;
/// Types shared across events.
pub mod shared;

pub use contract::{
    PIT_ALGORITHM_VERSION, PIT_TIE_BREAKER, PLAN_HASH_INPUT_VERSION, REPLAY_ORDER_VERSION,
};
pub use errors::{LegacyError, LinkageError, PitError, PlanError, ReplayError};
pub use events::{AuditEvent, AuditLifecycle, AuditOutcome, AuditService};
pub use legacy::{map_auth_event, map_job_event, LegacyAuthEvent, LegacyJobEvent};
pub use pit::{compare_pit, select_latest, select_latest_by, sort_pit, PitRowTuple};
pub use plan::{
    ActionCounts, ConflictPolicy, EncryptedEnvelope, ExecutionOptions, MediaCandidate,
    MediaDecision, MissingRowMode, PitContract, PlanHashInput, RestoreScope, RowAction,
    RowHashInput, RowMetadata,
};
pub use plan_hash::{compute_plan_hash, verify_canonical_evidence, verify_plan_hash, PlanHashRecord};
pub use replay::{compare_for_replay, sort_for_replay, validate_replay_batch, AuditReplayBatch};
pub use shared::{ActorType, AuditActor};
