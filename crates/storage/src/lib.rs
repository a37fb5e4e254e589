//! SQLite-backed storage for Houston permission checks.
//!
//! This crate persists the inputs of an authorization check and the record
//! of every decision made against them.
//!
//! # Overview
//!
//! The storage layer serves two purposes:
//!
//! 1. **Check inputs**: principals, resource records and collaboration edges.
//!    [`Store::directory`] loads them into a [`policy::Directory`] snapshot so
//!    checks run entirely in memory.
//!
//! 2. **Audit trail**: an append-only log of [`AuditEntry`] values answering
//!    "who was allowed to do what, and why not?".
//!
//! Collaboration workflows (requests, notifications) live elsewhere. The
//! store only records the approval state of each member for each direction.
//!
//! # Example
//!
//! ```no_run
//! use policy::{Capability, Operation, Policy, Principal, ResourceKind, ResourceRecord};
//! use storage::{AuditEntry, Gate, Store};
//!
//! let store = Store::open("houston.db")?;
//!
//! let owner = Principal::new("Ada").with(Capability::Active);
//! let sighting = ResourceRecord::new(ResourceKind::Sighting, owner.id);
//! store.put_principal(&owner)?;
//! store.put_resource(&sighting)?;
//!
//! let directory = store.directory()?;
//! let decision = Policy::new(&directory).check_object(&owner, &sighting, Operation::Write);
//! store.append_audit(&AuditEntry::new(
//!     owner.id,
//!     Gate::Object,
//!     sighting.kind,
//!     Some(sighting.id),
//!     Operation::Write,
//!     &decision,
//! ))?;
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod store;

pub use error::{Error, Result};
pub use event::{AuditEntry, Gate};
pub use store::Store;
