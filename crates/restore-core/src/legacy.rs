//! Translation of legacy event shapes into [`AuditEvent`].
//!
//! Both adapters are pure. The sentinel reason `"none"` never survives
//! translation; it becomes an absent reason code.

use restore_canonical::{CanonicalTimestamp, PlanHash};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::LegacyError;
use crate::events::{AuditEvent, AuditLifecycle, AuditOutcome, AuditService};
use crate::shared::AuditActor;

const NO_REASON: &str = "none";

/// Access decision event as emitted by the legacy auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAuthEvent {
    /// Event identifier.
    pub event_id: String,
    /// Legacy type such as `restore_execute_denied`.
    pub event_type: String,
    /// Event time in any accepted timestamp layout.
    pub occurred_at: String,
    /// Tenant scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Instance scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Legacy actor string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Reason a request was denied, or `"none"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_reason: Option<String>,
    /// Reason a request is still in flight, or `"none"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_flight_reason: Option<String>,
    /// Request id used for correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Free-form details.
    #[serde(default)]
    pub details: Map<String, Value>,
}

/// Restore job lifecycle event as emitted by the legacy job runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyJobEvent {
    /// Event identifier.
    pub event_id: String,
    /// One of the seven legacy job event types.
    pub event_type: String,
    /// Event time in any accepted timestamp layout.
    pub occurred_at: String,
    /// Job the event belongs to.
    pub job_id: String,
    /// Plan executed by the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    /// Hash of that plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_hash: Option<PlanHash>,
    /// Tenant scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Instance scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Source scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Legacy actor string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Reason code, or `"none"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    /// Correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Details; `resumed_from_pause` selects the resume mapping.
    #[serde(default)]
    pub details: Map<String, Value>,
}

/// Maps an access decision event.
///
/// Outcome follows the event type suffix (`_denied`, `_started`,
/// `_completed`, otherwise accepted). The reason code comes from
/// `deny_reason`, then `in_flight_reason`.
pub fn map_auth_event(legacy: &LegacyAuthEvent) -> Result<AuditEvent, LegacyError> {
    let event = AuditEvent {
        event_id: legacy.event_id.clone(),
        occurred_at: CanonicalTimestamp::canonicalize("occurred_at", &legacy.occurred_at)?,
        service: AuditService::Acp,
        lifecycle: AuditLifecycle::Authorize,
        action: legacy.event_type.clone(),
        outcome: outcome_from_suffix(&legacy.event_type),
        reason_code: reason(legacy.deny_reason.as_deref())
            .or_else(|| reason(legacy.in_flight_reason.as_deref())),
        tenant_id: legacy.tenant_id.clone(),
        instance_id: legacy.instance_id.clone(),
        source: None,
        plan_id: None,
        plan_hash: None,
        job_id: None,
        actor: legacy.actor.as_deref().map(AuditActor::from_legacy),
        correlation_id: legacy.request_id.clone(),
        metadata: legacy.details.clone(),
    };
    event.check_linkage()?;
    Ok(event)
}

/// Maps a restore job lifecycle event.
///
/// # Errors
///
/// Returns [`LegacyError::UnknownEventType`] for types outside the table.
pub fn map_job_event(legacy: &LegacyJobEvent) -> Result<AuditEvent, LegacyError> {
    let resumed = legacy
        .details
        .get("resumed_from_pause")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let (lifecycle, action, outcome) = job_mapping(&legacy.event_type, resumed)
        .ok_or_else(|| LegacyError::UnknownEventType(legacy.event_type.clone()))?;

    let event = AuditEvent {
        event_id: legacy.event_id.clone(),
        occurred_at: CanonicalTimestamp::canonicalize("occurred_at", &legacy.occurred_at)?,
        service: AuditService::Rrs,
        lifecycle,
        action: action.to_string(),
        outcome,
        reason_code: reason(legacy.reason_code.as_deref()),
        tenant_id: legacy.tenant_id.clone(),
        instance_id: legacy.instance_id.clone(),
        source: legacy.source.clone(),
        plan_id: legacy.plan_id.clone(),
        plan_hash: legacy.plan_hash.clone(),
        job_id: Some(legacy.job_id.clone()),
        actor: legacy.actor.as_deref().map(AuditActor::from_legacy),
        correlation_id: legacy.correlation_id.clone(),
        metadata: legacy.details.clone(),
    };
    event.check_linkage()?;
    Ok(event)
}

fn job_mapping(
    event_type: &str,
    resumed_from_pause: bool,
) -> Option<(AuditLifecycle, &'static str, AuditOutcome)> {
    use AuditLifecycle::*;
    use AuditOutcome::*;

    let mapped = match event_type {
        "job_created" => (Execute, "queued", Accepted),
        "job_started" if resumed_from_pause => (Resume, "resumed", Started),
        "job_started" => (Execute, "started", Started),
        "job_paused" => (Execute, "paused", Accepted),
        "job_completed" => (Execute, "completed", Completed),
        "job_failed" => (Execute, "failed", Failed),
        "job_cancelled" => (Execute, "cancelled", Cancelled),
        "job_override_applied" => (Override, "override_applied", Accepted),
        _ => return None,
    };
    Some(mapped)
}

fn outcome_from_suffix(event_type: &str) -> AuditOutcome {
    if event_type.ends_with("_denied") {
        AuditOutcome::Denied
    } else if event_type.ends_with("_started") {
        AuditOutcome::Started
    } else if event_type.ends_with("_completed") {
        AuditOutcome::Completed
    } else {
        AuditOutcome::Accepted
    }
}

fn reason(value: Option<&str>) -> Option<String> {
    value.filter(|r| *r != NO_REASON).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ActorType;
    use serde_json::json;

    fn auth(event_type: &str) -> LegacyAuthEvent {
        LegacyAuthEvent {
            event_id: "acp-1".into(),
            event_type: event_type.into(),
            occurred_at: "2024-05-01T10:00:00Z".into(),
            tenant_id: Some("tenant-a".into()),
            instance_id: None,
            actor: Some("ops@example.com".into()),
            deny_reason: None,
            in_flight_reason: None,
            request_id: Some("req-9".into()),
            details: Map::new(),
        }
    }

    fn job(event_type: &str) -> LegacyJobEvent {
        LegacyJobEvent {
            event_id: "rrs-1".into(),
            event_type: event_type.into(),
            occurred_at: "2024-05-01 10:00:00".into(),
            job_id: "job-1".into(),
            plan_id: Some("plan-1".into()),
            plan_hash: None,
            tenant_id: Some("tenant-a".into()),
            instance_id: Some("inst-1".into()),
            source: None,
            actor: Some("svc:scheduler".into()),
            reason_code: Some("none".into()),
            correlation_id: None,
            details: Map::new(),
        }
    }

    #[test]
    fn auth_outcome_follows_suffix() {
        let cases = [
            ("restore_execute_denied", AuditOutcome::Denied),
            ("token_refresh_started", AuditOutcome::Started),
            ("token_refresh_completed", AuditOutcome::Completed),
            ("token_issued", AuditOutcome::Accepted),
        ];
        for (event_type, expected) in cases {
            let mapped = map_auth_event(&auth(event_type)).unwrap();
            assert_eq!(mapped.outcome, expected, "{event_type}");
            assert_eq!(mapped.action, event_type);
        }
    }

    #[test]
    fn auth_reason_skips_sentinel() {
        let mut legacy = auth("restore_execute_denied");
        legacy.deny_reason = Some("none".into());
        legacy.in_flight_reason = Some("job_in_progress".into());
        let mapped = map_auth_event(&legacy).unwrap();
        assert_eq!(mapped.reason_code.as_deref(), Some("job_in_progress"));

        legacy.deny_reason = Some("missing_scope".into());
        let mapped = map_auth_event(&legacy).unwrap();
        assert_eq!(mapped.reason_code.as_deref(), Some("missing_scope"));

        legacy.deny_reason = Some("none".into());
        legacy.in_flight_reason = Some("none".into());
        assert_eq!(map_auth_event(&legacy).unwrap().reason_code, None);
    }

    #[test]
    fn auth_event_is_canonicalized() {
        let mapped = map_auth_event(&auth("token_issued")).unwrap();
        assert_eq!(mapped.service, AuditService::Acp);
        assert_eq!(mapped.occurred_at.as_str(), "2024-05-01T10:00:00.000Z");
        assert_eq!(mapped.actor.unwrap().actor_type, ActorType::User);
        assert_eq!(mapped.correlation_id.as_deref(), Some("req-9"));
    }

    #[test]
    fn job_started_branches_on_resume_flag() {
        let started = map_job_event(&job("job_started")).unwrap();
        assert_eq!(started.lifecycle, AuditLifecycle::Execute);
        assert_eq!(started.action, "started");

        let mut resumed = job("job_started");
        resumed
            .details
            .insert("resumed_from_pause".into(), json!(true));
        let resumed = map_job_event(&resumed).unwrap();
        assert_eq!(resumed.lifecycle, AuditLifecycle::Resume);
        assert_eq!(resumed.action, "resumed");
        assert_eq!(resumed.outcome, AuditOutcome::Started);
    }

    #[test]
    fn job_table_covers_seven_types() {
        let types = [
            "job_created",
            "job_started",
            "job_paused",
            "job_completed",
            "job_failed",
            "job_cancelled",
            "job_override_applied",
        ];
        for event_type in types {
            let mapped = map_job_event(&job(event_type)).unwrap();
            assert_eq!(mapped.service, AuditService::Rrs);
            assert_eq!(mapped.job_id.as_deref(), Some("job-1"));
            assert_eq!(mapped.reason_code, None, "sentinel reason leaked");
        }
        assert_eq!(
            map_job_event(&job("job_exploded")),
            Err(LegacyError::UnknownEventType("job_exploded".into()))
        );
    }

    #[test]
    fn job_failure_reason_passes_through() {
        let mut legacy = job("job_failed");
        legacy.reason_code = Some("precondition_mismatch".into());
        let mapped = map_job_event(&legacy).unwrap();
        assert_eq!(mapped.outcome, AuditOutcome::Failed);
        assert_eq!(mapped.reason_code.as_deref(), Some("precondition_mismatch"));
    }

    #[test]
    fn malformed_legacy_time_fails() {
        let mut legacy = job("job_created");
        legacy.occurred_at = "soon".into();
        assert!(matches!(
            map_job_event(&legacy),
            Err(LegacyError::Timestamp(_))
        ));
    }
}
