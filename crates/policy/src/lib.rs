//! Permission checks for Houston resources.
//!
//! Core principle: **a check is a pure function of its inputs.** A decision
//! depends only on the principal snapshot, the resource, the compiled-in
//! grant tables and the collaboration edges visible through a
//! [`CollaborationSource`]. Nothing is written while checking.
//!
//! Three gates are provided by [`Policy`]:
//!
//! - [`Policy::check_module`]: may the principal ever perform an operation on
//!   a class of resource?
//! - [`Policy::check_object`]: may the principal perform it on this instance?
//! - [`Policy::check_module_or_object`]: the object gate when the instance is
//!   local, a restricted class-level fallback when it only exists remotely.
//!
//! # Example
//!
//! ```
//! use policy::{Capability, Directory, Operation, Policy, Principal, ResourceKind, ResourceRecord};
//!
//! let owner = Principal::new("Ada").with(Capability::Active);
//! let mut directory = Directory::new();
//! directory.add_principal(owner.clone());
//!
//! let sighting = ResourceRecord::new(ResourceKind::Sighting, owner.id);
//! let policy = Policy::new(&directory);
//! assert!(policy.can_object(&owner, &sighting, Operation::Write));
//! assert!(!policy.can_object(&Principal::anonymous(), &sighting, Operation::Read));
//! ```

mod capability;
pub mod collaboration;
mod error;
pub mod explain;
mod policy;
mod principal;
mod resource;
pub mod tables;

pub use capability::{Capability, Operation};
pub use collaboration::{
    CollaborationEdge, CollaborationMember, CollaborationSource, CollaborationState, Direction,
    Directory,
};
pub use error::{Error, Result};
pub use explain::explain_denial;
pub use policy::{Decision, Denial, DenyReason, Policy};
pub use principal::{Principal, PrincipalId};
pub use resource::{Predicate, Resource, ResourceId, ResourceKind, ResourceRecord};
