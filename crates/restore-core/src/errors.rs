use restore_canonical::{
    CanonicalizationError, TimestampError, ValidationError, ValuePath,
};
use thiserror::Error;

/// Plan construction and hashing errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// Input held a value outside the canonical model.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
    /// A construction invariant does not hold.
    #[error("invalid plan input: {0}")]
    Validation(#[from] ValidationError),
    /// A plaintext field reached hashing. This is an upstream contract violation.
    #[error("plaintext field at {path}")]
    PlaintextLeak {
        /// Location of the field.
        path: ValuePath,
    },
    /// Stored evidence is not parseable JSON.
    #[error("invalid plan evidence: {0}")]
    InvalidEvidence(String),
    /// Stored evidence parses but is not in canonical form.
    #[error("plan evidence is not canonical text")]
    NonCanonicalEvidence,
}

/// PIT comparison and selection errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PitError {
    /// A tuple timestamp is not an absolute instant.
    #[error(transparent)]
    MalformedTimestamp(#[from] TimestampError),
    /// Selection was asked to choose from nothing.
    #[error("cannot select latest from an empty tuple set")]
    EmptyInput,
}

/// Audit replay ordering errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// Two events share `(service, event_id)` with different content.
    #[error("duplicate audit event {service}/{event_id}")]
    DuplicateEvent {
        /// Service tag.
        service: String,
        /// Event id.
        event_id: String,
    },
    /// The event at `index` sorts before its predecessor.
    #[error("audit event at index {index} ({service}/{event_id}) is out of replay order")]
    OutOfOrder {
        /// Position in the batch.
        index: usize,
        /// Service tag.
        service: String,
        /// Event id.
        event_id: String,
    },
    /// Batch carries a replay order version this build does not implement.
    #[error("unsupported replay order version '{0}'")]
    UnsupportedVersion(String),
}

/// Audit event linkage errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkageError {
    /// `field` is set but `requires` is not.
    #[error("{field} requires {requires}")]
    MissingDependency {
        /// Field that is present.
        field: &'static str,
        /// Field it depends on.
        requires: &'static str,
    },
}

/// Legacy event translation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LegacyError {
    /// The legacy event type has no mapping.
    #[error("unknown legacy event type '{0}'")]
    UnknownEventType(String),
    /// A legacy timestamp could not be canonicalized.
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    /// The mapped event violates a linkage invariant.
    #[error("mapped event is invalid: {0}")]
    Linkage(#[from] LinkageError),
}
