//! Canonical data model primitives for restore plans and audit events.
//!
//! Services that must agree byte-for-byte on a plan fingerprint convert their
//! inputs into [`CanonicalValue`], render them with [`Canonicalizer`], and
//! hash the resulting text into a [`PlanHash`]. Every rule that affects those
//! bytes lives in this crate.
//!
#![deny(missing_docs)]

/// Canonical text rendering.
pub mod canonicalizer;
/// SHA-256 digest newtype.
pub mod digest;
/// Instant parsing and canonical timestamp text.
pub mod timestamp;
/// Validation helpers used by canonical types.
pub mod validation;
/// Canonical value model and explicit conversion trait.
pub mod value;

pub use canonicalizer::{
    CanonicalizationError, CanonicalizationResult, Canonicalizer, PathSegment, ValuePath,
    CANONICAL_PROFILE_ID,
};
pub use digest::PlanHash;
pub use timestamp::{parse_instant, CanonicalTimestamp, TimestampError};
pub use validation::ValidationError;
pub use value::{CanonicalNumber, CanonicalObject, CanonicalValue, ToCanonical, MAX_SAFE_INTEGER};
