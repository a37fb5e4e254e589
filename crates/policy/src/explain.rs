//! Human-readable denial messages.
//!
//! Nothing here feeds back into a decision: messages are built after the
//! fact from the decision, the resource and the collaboration source.

use crate::collaboration::CollaborationSource;
use crate::policy::{Decision, Policy};
use crate::{Operation, Principal, Resource};

/// Display names of the resource's owners, falling back to their ids.
pub fn owner_names<S, R>(source: &S, resource: &R) -> Vec<String>
where
    S: CollaborationSource + ?Sized,
    R: Resource + ?Sized,
{
    resource
        .owners()
        .iter()
        .map(|id| {
            source
                .principal(id)
                .map(|p| p.display_name)
                .unwrap_or_else(|| id.to_string())
        })
        .collect()
}

/// Explain why `principal` may not perform `op` on `resource`.
pub fn explain_denial<S, R>(
    policy: &Policy<'_, S>,
    principal: &Principal,
    resource: &R,
    op: Operation,
) -> String
where
    S: CollaborationSource + ?Sized,
    R: Resource + ?Sized,
{
    let label = resource.kind().label();
    if principal.is_anonymous() {
        return format!("Please log in to access this {label}");
    }
    if !principal.is_active() {
        return format!("Your account is not active, so this {label} is unavailable");
    }

    let owners = owner_names(policy.source(), resource).join(", ");
    let can_view = policy.collaboration_grant(principal, resource, Operation::Read);
    let can_edit = policy.collaboration_grant(principal, resource, Operation::Write);

    if op.is_modifying() && can_view && !can_edit {
        format!("You have view-only access to this {label}; ask {owners} for edit access")
    } else if can_view || can_edit {
        format!("You are not permitted to {op} this {label}")
    } else {
        format!("You have no relationship with the owner of this {label}: {owners}")
    }
}

impl<S: CollaborationSource + ?Sized> Policy<'_, S> {
    /// Run the object gate and attach an explanation to any denial.
    pub fn check_object_explained<R: Resource + ?Sized>(
        &self,
        principal: &Principal,
        resource: &R,
        op: Operation,
    ) -> Decision {
        let decision = self.check_object(principal, resource, op);
        if decision.is_allowed() {
            return decision;
        }
        decision.with_message(explain_denial(self, principal, resource, op))
    }
}
