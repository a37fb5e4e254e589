//! Authorization gates and their decisions.

use crate::collaboration::{CollaborationSource, Direction};
use crate::tables::{self, ANONYMOUS_CREATABLE, PUBLIC_DELETABLE, REMOTE_FALLBACK, RESTRICTED_CREATION};
use crate::{Capability, Error, Operation, Principal, Resource, ResourceKind, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Why a check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The principal is not authenticated.
    Anonymous,
    /// The principal is authenticated but not active.
    Inactive,
    /// No grant path matched.
    NoGrant,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::Anonymous => "anonymous",
            DenyReason::Inactive => "inactive",
            DenyReason::NoGrant => "no_grant",
        }
    }
}

/// A denied check, with an optional human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    pub reason: DenyReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Denial {
    pub fn new(reason: DenyReason) -> Self {
        Self {
            reason,
            message: None,
        }
    }

    /// HTTP status the request layer answers with: 401 when unauthenticated.
    pub fn status_code(&self) -> u16 {
        match self.reason {
            DenyReason::Anonymous => 401,
            DenyReason::Inactive | DenyReason::NoGrant => 403,
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => f.write_str(self.reason.as_str()),
        }
    }
}

/// Result of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    fn deny(reason: DenyReason) -> Self {
        Decision::Deny(Denial::new(reason))
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::deny(DenyReason::NoGrant)
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Decision::Allow => None,
            Decision::Deny(denial) => Some(denial),
        }
    }

    /// Attach a message to a denial. Allow decisions are returned unchanged.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        match self {
            Decision::Allow => Decision::Allow,
            Decision::Deny(mut denial) => {
                denial.message = Some(message.into());
                Decision::Deny(denial)
            }
        }
    }

    /// Convert a denial into [`Error::Denied`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(Error::Denied(denial)),
        }
    }
}

/// Evaluates checks against the static tables and a collaboration source.
///
/// A `Policy` holds no state of its own; the same instance can serve any
/// number of concurrent checks.
pub struct Policy<'a, S: CollaborationSource + ?Sized> {
    source: &'a S,
}

impl<S: CollaborationSource + ?Sized> Clone for Policy<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: CollaborationSource + ?Sized> Copy for Policy<'_, S> {}

impl<'a, S: CollaborationSource + ?Sized> Policy<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &'a S {
        self.source
    }

    /// Can `principal` ever perform `op` on objects of class `kind`?
    pub fn check_module(&self, principal: &Principal, kind: ResourceKind, op: Operation) -> Decision {
        let decision = module_decision(principal, kind, op);
        debug!(
            principal = %principal.id,
            kind = %kind,
            op = %op,
            allowed = decision.is_allowed(),
            "module check"
        );
        decision
    }

    pub fn can_module(&self, principal: &Principal, kind: ResourceKind, op: Operation) -> bool {
        self.check_module(principal, kind, op).is_allowed()
    }

    /// Can `principal` perform `op` on this specific `resource`?
    pub fn check_object<R: Resource + ?Sized>(
        &self,
        principal: &Principal,
        resource: &R,
        op: Operation,
    ) -> Decision {
        let (decision, step) = self.object_decision(principal, resource, op);
        debug!(
            principal = %principal.id,
            kind = %resource.kind(),
            op = %op,
            step,
            allowed = decision.is_allowed(),
            "object check"
        );
        decision
    }

    pub fn can_object<R: Resource + ?Sized>(
        &self,
        principal: &Principal,
        resource: &R,
        op: Operation,
    ) -> bool {
        self.check_object(principal, resource, op).is_allowed()
    }

    fn object_decision<R: Resource + ?Sized>(
        &self,
        principal: &Principal,
        resource: &R,
        op: Operation,
    ) -> (Decision, &'static str) {
        let kind = resource.kind();

        if op == Operation::Read && resource.is_public() {
            return (Decision::Allow, "public");
        }
        if principal.is_anonymous() {
            return (Decision::deny(DenyReason::Anonymous), "anonymous");
        }
        if !principal.is_active() {
            return (Decision::deny(DenyReason::Inactive), "inactive");
        }
        if principal.has_any(tables::object_roles(kind, op)) {
            return (Decision::Allow, "role");
        }
        if tables::object_methods(kind, op)
            .iter()
            .any(|predicate| resource.satisfies(*predicate, principal))
        {
            return (Decision::Allow, "method");
        }
        if elevated(principal, resource, op) {
            return (Decision::Allow, "elevated");
        }
        if self.collaboration_grant(principal, resource, op) {
            return (Decision::Allow, "collaboration");
        }
        if public_data_grant(principal, resource, op) {
            return (Decision::Allow, "public_data");
        }
        (Decision::deny(DenyReason::NoGrant), "none")
    }

    /// Is `op` granted because a collaborator of `principal` could perform it?
    pub fn collaboration_grant<R: Resource + ?Sized>(
        &self,
        principal: &Principal,
        resource: &R,
        op: Operation,
    ) -> bool {
        let Some(direction) = Direction::for_operation(op) else {
            return false;
        };
        let predicates = tables::object_methods(resource.kind(), op);

        self.source
            .collaborators(principal, direction)
            .iter()
            .filter(|other| other.id != principal.id)
            .any(|other| {
                let granted = resource.is_owned_by(other)
                    || predicates.iter().any(|p| resource.satisfies(*p, other));
                trace!(
                    principal = %principal.id,
                    collaborator = %other.id,
                    granted,
                    "collaboration candidate"
                );
                granted
            })
    }

    /// Check a class/instance pair where the instance may exist only remotely.
    ///
    /// # Panics
    ///
    /// Panics if `resource` is present and its kind differs from `kind`.
    pub fn check_module_or_object<R: Resource + ?Sized>(
        &self,
        principal: &Principal,
        kind: ResourceKind,
        resource: Option<&R>,
        op: Operation,
    ) -> Decision {
        if let Some(resource) = resource {
            assert_eq!(
                resource.kind(),
                kind,
                "resource kind does not match the checked class"
            );
            return self.check_object(principal, resource, op);
        }

        let decision = remote_decision(principal, kind, op);
        debug!(
            principal = %principal.id,
            kind = %kind,
            op = %op,
            allowed = decision.is_allowed(),
            "remote check"
        );
        decision
    }

    pub fn can_module_or_object<R: Resource + ?Sized>(
        &self,
        principal: &Principal,
        kind: ResourceKind,
        resource: Option<&R>,
        op: Operation,
    ) -> bool {
        self.check_module_or_object(principal, kind, resource, op)
            .is_allowed()
    }
}

fn module_decision(principal: &Principal, kind: ResourceKind, op: Operation) -> Decision {
    if principal.is_anonymous() {
        return if op == Operation::Write && ANONYMOUS_CREATABLE.contains(&kind) {
            Decision::Allow
        } else {
            Decision::deny(DenyReason::Anonymous)
        };
    }
    if principal.has_any(tables::module_roles(kind, op)) {
        return Decision::Allow;
    }
    Decision::from_bool(
        principal.is_active() && principal.is_privileged() && !RESTRICTED_CREATION.contains(&kind),
    )
}

fn remote_decision(principal: &Principal, kind: ResourceKind, op: Operation) -> Decision {
    if principal.is_anonymous() {
        return Decision::deny(DenyReason::Anonymous);
    }
    if !REMOTE_FALLBACK.contains(&kind) {
        return Decision::deny(DenyReason::NoGrant);
    }
    let required = match op {
        Operation::Read | Operation::Delete => Capability::Researcher,
        Operation::Write => Capability::Admin,
        _ => return Decision::deny(DenyReason::NoGrant),
    };
    Decision::from_bool(principal.has(required))
}

// ReadDebug is privileged-only: owning an object does not expose its debug view.
fn elevated<R: Resource + ?Sized>(principal: &Principal, resource: &R, op: Operation) -> bool {
    if op.is_internal() {
        return false;
    }
    if op == Operation::ReadDebug {
        return principal.is_privileged();
    }
    resource.is_owned_by(principal) || principal.is_privileged()
}

fn public_data_grant<R: Resource + ?Sized>(principal: &Principal, resource: &R, op: Operation) -> bool {
    if !resource.is_public() || !(principal.is_researcher() || principal.is_admin()) {
        return false;
    }
    match op {
        Operation::Read | Operation::Write => true,
        Operation::Delete => PUBLIC_DELETABLE.contains(&resource.kind()),
        _ => false,
    }
}
