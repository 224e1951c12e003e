use serde::{Deserialize, Serialize};

/// Kind of principal behind an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    /// A human user.
    User,
    /// Another service.
    Service,
    /// The platform itself.
    System,
}

impl ActorType {
    /// Infers the actor type from a legacy actor string.
    ///
    /// `alice@example.com` is a user, `svc:rrs` or `service:rrs` a service,
    /// anything else the system.
    pub fn infer(actor: &str) -> Self {
        if actor.contains('@') {
            Self::User
        } else if actor.starts_with("svc:") || actor.starts_with("service:") {
            Self::Service
        } else {
            Self::System
        }
    }
}

/// Principal that caused an audit event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditActor {
    /// Principal kind.
    pub actor_type: ActorType,
    /// Principal identifier as reported by the emitting service.
    pub actor_id: String,
}

impl AuditActor {
    /// Builds an actor from a legacy actor string.
    pub fn from_legacy(actor: &str) -> Self {
        Self {
            actor_type: ActorType::infer(actor),
            actor_id: actor.to_string(),
        }
    }
}
