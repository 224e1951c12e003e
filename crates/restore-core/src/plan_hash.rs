//! Plan hash computation.
//!
//! The plan hash is `sha256(canonical_text(plan_hash_input))`, lowercase hex.
//! The canonical text is returned alongside the digest and stored as evidence
//! so the hash can be re-verified offline.

use restore_canonical::{CanonicalValue, Canonicalizer, PlanHash, ToCanonical};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PlanError;
use crate::plaintext::find_plaintext;
use crate::plan::PlanHashInput;

/// Canonical text and digest of a plan, as persisted with plan evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanHashRecord {
    /// Canonical JSON text that was hashed.
    pub canonical_json: String,
    /// SHA-256 of `canonical_json`.
    pub plan_hash: PlanHash,
}

/// Computes the plan hash for a validated input.
///
/// # Example
///
/// ```rust,ignore
/// let record = compute_plan_hash(&input)?;
/// job.plan_hash = record.plan_hash.clone();
/// evidence.canonical_json = record.canonical_json;
/// ```
///
/// # Errors
///
/// Returns [`PlanError`] if the input holds a value outside the canonical
/// model or a plaintext field.
pub fn compute_plan_hash(input: &PlanHashInput) -> Result<PlanHashRecord, PlanError> {
    let value = input.to_canonical()?;
    let record = hash_canonical_value(&value)?;

    tracing::debug!(
        plan_hash = %record.plan_hash,
        rows = input.rows.len(),
        media_candidates = input.media_candidates.len(),
        canonical_bytes = record.canonical_json.len(),
        "computed plan hash"
    );
    Ok(record)
}

/// Recomputes the hash of `input` and compares it with `claimed`.
pub fn verify_plan_hash(input: &PlanHashInput, claimed: &PlanHash) -> Result<bool, PlanError> {
    let record = compute_plan_hash(input)?;
    let matches = &record.plan_hash == claimed;
    if !matches {
        tracing::warn!(claimed = %claimed, computed = %record.plan_hash, "plan hash mismatch");
    }
    Ok(matches)
}

/// Re-verifies stored evidence without the original typed input.
///
/// The stored text must already be canonical; it is re-parsed,
/// re-rendered and re-hashed.
///
/// # Errors
///
/// Returns [`PlanError::NonCanonicalEvidence`] if the text is valid JSON but
/// not in canonical form.
pub fn verify_canonical_evidence(record: &PlanHashRecord) -> Result<bool, PlanError> {
    let parsed: Value = serde_json::from_str(&record.canonical_json)
        .map_err(|err| PlanError::InvalidEvidence(err.to_string()))?;
    let value = CanonicalValue::try_from(&parsed)?;
    let recomputed = hash_canonical_value(&value)?;
    if recomputed.canonical_json != record.canonical_json {
        return Err(PlanError::NonCanonicalEvidence);
    }
    Ok(recomputed.plan_hash == record.plan_hash)
}

fn hash_canonical_value(value: &CanonicalValue) -> Result<PlanHashRecord, PlanError> {
    if let Some(path) = find_plaintext(value) {
        tracing::error!(%path, "plaintext field reached plan hashing");
        return Err(PlanError::PlaintextLeak { path });
    }
    let result = Canonicalizer::new().canonicalize(value)?;
    let plan_hash = PlanHash::of_bytes(result.bytes());
    Ok(PlanHashRecord {
        canonical_json: result.text,
        plan_hash,
    })
}
