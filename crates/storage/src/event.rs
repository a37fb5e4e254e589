//! Audit entries recorded for every decision.

use chrono::{DateTime, Utc};
use policy::{Decision, Operation, PrincipalId, ResourceId, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which gate produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Module,
    Object,
    Remote,
}

impl Gate {
    pub fn as_str(self) -> &'static str {
        match self {
            Gate::Module => "module",
            Gate::Object => "object",
            Gate::Remote => "remote",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub principal: PrincipalId,
    pub gate: Gate,
    pub kind: ResourceKind,
    pub resource: Option<ResourceId>,
    pub operation: Operation,
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AuditEntry {
    pub fn new(
        principal: PrincipalId,
        gate: Gate,
        kind: ResourceKind,
        resource: Option<ResourceId>,
        operation: Operation,
        decision: &Decision,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            principal,
            gate,
            kind,
            resource,
            operation,
            allowed: decision.is_allowed(),
            reason: decision.denial().map(|d| d.to_string()),
        }
    }
}
