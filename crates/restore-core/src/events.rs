use restore_canonical::{CanonicalTimestamp, PlanHash};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::LinkageError;
use crate::shared::AuditActor;

/// Service that emitted an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditService {
    /// Auth / control plane.
    Acp,
    /// Ingestion registration.
    Reg,
    /// Restore service.
    Rrs,
}

impl AuditService {
    /// Wire name; also the replay sort key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acp => "acp",
            Self::Reg => "reg",
            Self::Rrs => "rrs",
        }
    }
}

/// Restore lifecycle stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLifecycle {
    /// Access decisions.
    Authorize,
    /// Plan creation.
    Plan,
    /// Plan approval.
    Approve,
    /// Job execution.
    Execute,
    /// Resumption of a paused job.
    Resume,
    /// Operator override on a job.
    Override,
    /// Deletion of job data.
    Delete,
}

impl AuditLifecycle {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authorize => "authorize",
            Self::Plan => "plan",
            Self::Approve => "approve",
            Self::Execute => "execute",
            Self::Resume => "resume",
            Self::Override => "override",
            Self::Delete => "delete",
        }
    }

    /// Whether events in this stage must name a job.
    pub fn requires_job(self) -> bool {
        matches!(
            self,
            Self::Execute | Self::Resume | Self::Override | Self::Delete
        )
    }
}

/// Result recorded by an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Request accepted.
    Accepted,
    /// Request denied.
    Denied,
    /// Work started.
    Started,
    /// Work completed.
    Completed,
    /// Work failed.
    Failed,
    /// Work cancelled.
    Cancelled,
}

impl AuditOutcome {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Denied => "denied",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Audit event shared by every service in the restore pipeline.
///
/// `(service, event_id)` is the event's external identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Identifier, unique per service.
    pub event_id: String,
    /// When the event happened, canonical UTC millis.
    pub occurred_at: CanonicalTimestamp,
    /// Emitting service.
    pub service: AuditService,
    /// Lifecycle stage.
    pub lifecycle: AuditLifecycle,
    /// Service-specific action name.
    pub action: String,
    /// Outcome.
    pub outcome: AuditOutcome,
    /// Stable reason code, absent when there is none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    /// Tenant scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Instance scope; requires `tenant_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Source scope; requires `tenant_id` and `instance_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Linked plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    /// Hash of the linked plan; requires `plan_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_hash: Option<PlanHash>,
    /// Linked job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Principal behind the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<AuditActor>,
    /// Cross-service correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Free-form details.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AuditEvent {
    /// Checks the scope, plan and job linkage rules.
    pub fn check_linkage(&self) -> Result<(), LinkageError> {
        require(self.instance_id.is_some(), self.tenant_id.is_some(), "instance_id", "tenant_id")?;
        require(self.source.is_some(), self.tenant_id.is_some(), "source", "tenant_id")?;
        require(self.source.is_some(), self.instance_id.is_some(), "source", "instance_id")?;
        require(self.plan_hash.is_some(), self.plan_id.is_some(), "plan_hash", "plan_id")?;
        require(
            self.lifecycle == AuditLifecycle::Plan,
            self.plan_id.is_some(),
            "lifecycle plan",
            "plan_id",
        )?;
        require(
            self.lifecycle.requires_job(),
            self.job_id.is_some(),
            "lifecycle execute|resume|override|delete",
            "job_id",
        )
    }

    /// `(service, event_id)` identity.
    pub fn identity(&self) -> (AuditService, &str) {
        (self.service, self.event_id.as_str())
    }
}

fn require(
    present: bool,
    dependency_present: bool,
    field: &'static str,
    requires: &'static str,
) -> Result<(), LinkageError> {
    if present && !dependency_present {
        return Err(LinkageError::MissingDependency { field, requires });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(lifecycle: AuditLifecycle) -> AuditEvent {
        AuditEvent {
            event_id: "evt-1".into(),
            occurred_at: CanonicalTimestamp::parse("2024-01-01T00:00:00.000Z").unwrap(),
            service: AuditService::Rrs,
            lifecycle,
            action: "created".into(),
            outcome: AuditOutcome::Accepted,
            reason_code: None,
            tenant_id: None,
            instance_id: None,
            source: None,
            plan_id: None,
            plan_hash: None,
            job_id: None,
            actor: None,
            correlation_id: None,
            metadata: Map::new(),
        }
    }

    #[test]
    fn scope_chain_is_enforced() {
        let mut e = event(AuditLifecycle::Authorize);
        e.instance_id = Some("inst".into());
        assert_eq!(
            e.check_linkage(),
            Err(LinkageError::MissingDependency {
                field: "instance_id",
                requires: "tenant_id"
            })
        );
        e.tenant_id = Some("t".into());
        assert!(e.check_linkage().is_ok());
        e.instance_id = None;
        e.source = Some("sn".into());
        assert!(e.check_linkage().is_err());
    }

    #[test]
    fn plan_and_job_linkage() {
        let mut plan = event(AuditLifecycle::Plan);
        assert!(plan.check_linkage().is_err());
        plan.plan_id = Some("plan-1".into());
        assert!(plan.check_linkage().is_ok());

        let mut exec = event(AuditLifecycle::Execute);
        assert!(exec.check_linkage().is_err());
        exec.job_id = Some("job-1".into());
        assert!(exec.check_linkage().is_ok());

        let mut hashed = event(AuditLifecycle::Approve);
        hashed.plan_hash = Some(PlanHash::of_bytes(b"plan"));
        assert!(hashed.check_linkage().is_err());
    }

    #[test]
    fn serialized_event_omits_absent_fields() {
        let json = serde_json::to_value(event(AuditLifecycle::Authorize)).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("tenant_id"));
        assert_eq!(obj["service"], "rrs");
        assert_eq!(obj["occurred_at"], "2024-01-01T00:00:00.000Z");
    }
}
