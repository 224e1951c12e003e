use restore_canonical::{
    CanonicalObject, CanonicalTimestamp, CanonicalValue, CanonicalizationError, ToCanonical,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::{PIT_ALGORITHM_VERSION, PIT_TIE_BREAKER, PLAN_HASH_INPUT_VERSION};

/// Intended action for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAction {
    /// Overwrite the current row image.
    Update,
    /// Re-create a missing row.
    Insert,
    /// Remove a row that did not exist at the restore point.
    Delete,
    /// Leave the row untouched.
    Skip,
}

impl RowAction {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Skip => "skip",
        }
    }
}

/// Whether a media candidate is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDecision {
    /// Restore the attachment.
    Include,
    /// Leave the attachment out.
    Exclude,
}

impl MediaDecision {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
        }
    }
}

/// How rows absent from the target are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRowMode {
    /// Only rows that still exist are restored.
    ExistingOnly,
    /// Missing rows are re-inserted.
    AllowInsert,
}

impl MissingRowMode {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExistingOnly => "existing_only",
            Self::AllowInsert => "allow_insert",
        }
    }
}

/// What to do when a row changed after planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Skip the conflicting row.
    SkipRow,
    /// Stop the job.
    AbortJob,
    /// Apply regardless.
    Overwrite,
}

impl ConflictPolicy {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkipRow => "skip_row",
            Self::AbortJob => "abort_job",
            Self::Overwrite => "overwrite",
        }
    }
}

/// Point-in-time contract the plan was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitContract {
    /// Version of the PIT comparison algorithm.
    pub pit_algorithm_version: String,
    /// Restore target instant.
    pub restore_time: CanonicalTimestamp,
    /// Tie-break chain in application order.
    pub tie_breaker: Vec<String>,
}

impl PitContract {
    /// Contract for the current algorithm version.
    pub fn current(restore_time: CanonicalTimestamp) -> Self {
        Self {
            pit_algorithm_version: PIT_ALGORITHM_VERSION.to_string(),
            restore_time,
            tie_breaker: PIT_TIE_BREAKER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ToCanonical for PitContract {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .insert("pit_algorithm_version", self.pit_algorithm_version.as_str())
            .insert("restore_time", self.restore_time.as_str())
            .insert_with("tie_breaker", &self.tie_breaker)
            .map(CanonicalObject::build)
    }
}

/// Tenant/instance/source and table selection of a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreScope {
    /// Tenant identifier.
    pub tenant_id: String,
    /// Source instance identifier.
    pub instance_id: String,
    /// Source system tag.
    pub source: String,
    /// Tables in scope, in ascending order.
    pub tables: Vec<String>,
    /// Optional record filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_query: Option<String>,
}

impl ToCanonical for RestoreScope {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .insert("tenant_id", self.tenant_id.as_str())
            .insert("instance_id", self.instance_id.as_str())
            .insert("source", self.source.as_str())
            .insert_opt("encoded_query", self.encoded_query.as_deref())
            .insert_with("tables", &self.tables)
            .map(CanonicalObject::build)
    }
}

/// Execution switches that change what the plan does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Handling of rows missing from the target.
    pub missing_row_mode: MissingRowMode,
    /// Handling of rows that changed after planning.
    pub conflict_policy: ConflictPolicy,
    /// Whether media candidates are part of the restore.
    pub include_media: bool,
}

impl ToCanonical for ExecutionOptions {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .insert("missing_row_mode", self.missing_row_mode.as_str())
            .insert("conflict_policy", self.conflict_policy.as_str())
            .insert("include_media", self.include_media)
            .build())
    }
}

/// Per-action row totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    /// Rows updated.
    pub update: u64,
    /// Rows inserted.
    pub insert: u64,
    /// Rows deleted.
    pub delete: u64,
    /// Rows skipped.
    pub skip: u64,
}

impl ActionCounts {
    /// Tallies actions across `rows`.
    pub fn tally(rows: &[RowHashInput]) -> Self {
        rows.iter().fold(Self::default(), |mut counts, row| {
            match row.action {
                RowAction::Update => counts.update += 1,
                RowAction::Insert => counts.insert += 1,
                RowAction::Delete => counts.delete += 1,
                RowAction::Skip => counts.skip += 1,
            }
            counts
        })
    }
}

impl ToCanonical for ActionCounts {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .insert_with("update", &self.update)?
            .insert_with("insert", &self.insert)?
            .insert_with("delete", &self.delete)?
            .insert_with("skip", &self.skip)
            .map(CanonicalObject::build)
    }
}

/// Encrypted value material. Only ciphertext ever enters a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Cipher suite identifier.
    pub alg: String,
    /// Key reference used to encrypt.
    pub key_id: String,
    /// Base64 nonce.
    pub iv: String,
    /// Base64 ciphertext.
    pub ciphertext: String,
}

impl ToCanonical for EncryptedEnvelope {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .insert("alg", self.alg.as_str())
            .insert("key_id", self.key_id.as_str())
            .insert("iv", self.iv.as_str())
            .insert("ciphertext", self.ciphertext.as_str())
            .build())
    }
}

/// Operational metadata carried with a row.
///
/// Unknown keys are kept in `extra` and hashed as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowMetadata {
    /// Table, if repeated here; must match the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Record id, if repeated here; must match the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_sys_id: Option<String>,
    /// Event that produced the selected row image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Source timestamp of the selected row image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys_updated_on: Option<String>,
    /// Source modification counter of the selected row image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys_mod_count: Option<i64>,
    /// Additional metadata.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToCanonical for RowMetadata {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        let mut object = CanonicalObject::new();
        for (key, value) in &self.extra {
            object = object.insert_with(key, value)?;
        }
        object
            .insert_opt("table", self.table.as_deref())
            .insert_opt("record_sys_id", self.record_sys_id.as_deref())
            .insert_opt("event_id", self.event_id.as_deref())
            .insert_opt("sys_updated_on", self.sys_updated_on.as_deref())
            .insert_opt_with("sys_mod_count", self.sys_mod_count.as_ref())
            .map(CanonicalObject::build)
    }
}

/// One row's contribution to a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowHashInput {
    /// Plan-unique row identifier.
    pub row_id: String,
    /// Source table.
    pub table: String,
    /// Source record id.
    pub record_sys_id: String,
    /// Intended action.
    pub action: RowAction,
    /// Fingerprint of the row state the action is conditioned on.
    pub precondition_hash: String,
    /// Operational metadata.
    pub metadata: RowMetadata,
    /// Encrypted row values; present exactly when `action` is not `skip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<EncryptedEnvelope>,
}

impl RowHashInput {
    fn check(&self) -> Result<(), ValidationError> {
        if let Some(table) = &self.metadata.table {
            if table != &self.table {
                return Err(ValidationError::Mismatch {
                    field: "metadata.table",
                    value: table.clone(),
                    expected: self.table.clone(),
                });
            }
        }
        if let Some(record) = &self.metadata.record_sys_id {
            if record != &self.record_sys_id {
                return Err(ValidationError::Mismatch {
                    field: "metadata.record_sys_id",
                    value: record.clone(),
                    expected: self.record_sys_id.clone(),
                });
            }
        }
        match (self.action, &self.values) {
            (RowAction::Skip, Some(_)) => Err(ValidationError::PatternMismatch {
                field: "values",
                value: format!("row {} carries values for a skip action", self.row_id),
            }),
            (RowAction::Skip, None) | (_, Some(_)) => Ok(()),
            (_, None) => Err(ValidationError::Missing {
                field: "values",
                reason: "non-skip rows carry an encrypted envelope",
            }),
        }
    }
}

impl ToCanonical for RowHashInput {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .insert("row_id", self.row_id.as_str())
            .insert("table", self.table.as_str())
            .insert("record_sys_id", self.record_sys_id.as_str())
            .insert("action", self.action.as_str())
            .insert("precondition_hash", self.precondition_hash.as_str())
            .insert_with("metadata", &self.metadata)?
            .insert_opt_with("values", self.values.as_ref())
            .map(CanonicalObject::build)
    }
}

/// Attachment considered for restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCandidate {
    /// Plan-unique candidate identifier.
    pub candidate_id: String,
    /// Source attachment record id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_sys_id: Option<String>,
    /// Media store identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    /// Size of the stored object.
    pub size_bytes: u64,
    /// Hex SHA-256 of the stored object.
    pub sha256: String,
    /// Restore decision.
    pub decision: MediaDecision,
}

impl MediaCandidate {
    fn check(&self) -> Result<(), ValidationError> {
        if self.attachment_sys_id.is_none() && self.media_id.is_none() {
            return Err(ValidationError::Missing {
                field: "attachment_sys_id",
                reason: "media candidates carry an attachment id or a media id",
            });
        }
        Ok(())
    }
}

impl ToCanonical for MediaCandidate {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .insert("candidate_id", self.candidate_id.as_str())
            .insert_opt("attachment_sys_id", self.attachment_sys_id.as_deref())
            .insert_opt("media_id", self.media_id.as_deref())
            .insert_with("size_bytes", &self.size_bytes)?
            .insert("sha256", self.sha256.as_str())
            .insert("decision", self.decision.as_str())
            .build())
    }
}

/// Every fact that determines a restore plan's identity.
///
/// Immutable once built; any change means a new plan and a new hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanHashInput {
    /// Layout version, always [`PLAN_HASH_INPUT_VERSION`].
    pub plan_hash_input_version: String,
    /// Version tag of the surrounding restore contract.
    pub contract_version: String,
    /// Point-in-time contract.
    pub pit: PitContract,
    /// Restore scope.
    pub scope: RestoreScope,
    /// Execution switches.
    pub execution_options: ExecutionOptions,
    /// Per-action totals.
    pub action_counts: ActionCounts,
    /// Rows in ascending `row_id` order.
    pub rows: Vec<RowHashInput>,
    /// Media candidates in ascending `candidate_id` order.
    pub media_candidates: Vec<MediaCandidate>,
}

impl PlanHashInput {
    /// Assembles an input and re-checks its construction invariants.
    pub fn new(
        contract_version: impl Into<String>,
        pit: PitContract,
        scope: RestoreScope,
        execution_options: ExecutionOptions,
        rows: Vec<RowHashInput>,
        media_candidates: Vec<MediaCandidate>,
    ) -> Result<Self, ValidationError> {
        let input = Self {
            plan_hash_input_version: PLAN_HASH_INPUT_VERSION.to_string(),
            contract_version: contract_version.into(),
            pit,
            scope,
            execution_options,
            action_counts: ActionCounts::tally(&rows),
            rows,
            media_candidates,
        };
        input.check()?;
        Ok(input)
    }

    /// Verifies version tags, ordering, uniqueness and per-entry invariants.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.plan_hash_input_version != PLAN_HASH_INPUT_VERSION {
            return Err(ValidationError::Mismatch {
                field: "plan_hash_input_version",
                value: self.plan_hash_input_version.clone(),
                expected: PLAN_HASH_INPUT_VERSION.to_string(),
            });
        }
        if self.pit.pit_algorithm_version != PIT_ALGORITHM_VERSION {
            return Err(ValidationError::Mismatch {
                field: "pit.pit_algorithm_version",
                value: self.pit.pit_algorithm_version.clone(),
                expected: PIT_ALGORITHM_VERSION.to_string(),
            });
        }
        if self.pit.tie_breaker != PIT_TIE_BREAKER {
            return Err(ValidationError::Mismatch {
                field: "pit.tie_breaker",
                value: self.pit.tie_breaker.join(","),
                expected: PIT_TIE_BREAKER.join(","),
            });
        }
        check_ascending("rows", self.rows.iter().map(|row| row.row_id.as_str()))?;
        check_ascending(
            "media_candidates",
            self.media_candidates.iter().map(|m| m.candidate_id.as_str()),
        )?;
        for row in &self.rows {
            row.check()?;
        }
        for candidate in &self.media_candidates {
            candidate.check()?;
        }
        let tallied = ActionCounts::tally(&self.rows);
        if tallied != self.action_counts {
            return Err(ValidationError::Mismatch {
                field: "action_counts",
                value: format!("{:?}", self.action_counts),
                expected: format!("{:?}", tallied),
            });
        }
        Ok(())
    }
}

impl ToCanonical for PlanHashInput {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalObject::new()
            .insert("plan_hash_input_version", self.plan_hash_input_version.as_str())
            .insert("contract_version", self.contract_version.as_str())
            .insert_with("pit", &self.pit)?
            .insert_with("scope", &self.scope)?
            .insert_with("execution_options", &self.execution_options)?
            .insert_with("action_counts", &self.action_counts)?
            .insert_with("rows", &self.rows)?
            .insert_with("media_candidates", &self.media_candidates)
            .map(CanonicalObject::build)
    }
}

/// Identifiers must be strictly ascending by bytes, which also rules out duplicates.
fn check_ascending<'a>(
    field: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut previous: Option<&str> = None;
    for id in ids {
        if let Some(prev) = previous {
            if id == prev {
                return Err(ValidationError::Duplicate {
                    field,
                    value: id.to_string(),
                });
            }
            if id < prev {
                return Err(ValidationError::OutOfOrder {
                    field,
                    value: id.to_string(),
                });
            }
        }
        previous = Some(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(row_id: &str, action: RowAction) -> RowHashInput {
        RowHashInput {
            row_id: row_id.into(),
            table: "incident".into(),
            record_sys_id: format!("rec-{row_id}"),
            action,
            precondition_hash: "00".repeat(32),
            metadata: RowMetadata::default(),
            values: (action != RowAction::Skip).then(|| EncryptedEnvelope {
                alg: "aes-256-gcm".into(),
                key_id: "k1".into(),
                iv: "aXY=".into(),
                ciphertext: "Y2lwaGVy".into(),
            }),
        }
    }

    #[test]
    fn ascending_check_reports_duplicates_and_order() {
        assert!(check_ascending("rows", ["a", "b", "c"].into_iter()).is_ok());
        assert!(matches!(
            check_ascending("rows", ["a", "a"].into_iter()),
            Err(ValidationError::Duplicate { .. })
        ));
        assert!(matches!(
            check_ascending("rows", ["b", "a"].into_iter()),
            Err(ValidationError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn skip_rows_must_not_carry_values() {
        let mut skipped = row("r1", RowAction::Skip);
        assert!(skipped.check().is_ok());
        skipped.values = row("r1", RowAction::Update).values;
        assert!(skipped.check().is_err());
        let mut updated = row("r2", RowAction::Update);
        updated.values = None;
        assert!(matches!(
            updated.check(),
            Err(ValidationError::Missing { field: "values", .. })
        ));
    }

    #[test]
    fn metadata_identity_must_match_row() {
        let mut r = row("r1", RowAction::Update);
        r.metadata.table = Some("problem".into());
        assert!(matches!(
            r.check(),
            Err(ValidationError::Mismatch { field: "metadata.table", .. })
        ));
    }

    #[test]
    fn tally_counts_each_action() {
        let rows = vec![
            row("a", RowAction::Update),
            row("b", RowAction::Update),
            row("c", RowAction::Skip),
            row("d", RowAction::Delete),
        ];
        assert_eq!(
            ActionCounts::tally(&rows),
            ActionCounts {
                update: 2,
                insert: 0,
                delete: 1,
                skip: 1
            }
        );
    }
}
