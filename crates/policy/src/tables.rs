//! Compiled-in grant tables.
//!
//! These are the whole of the static policy. They are constants on purpose:
//! nothing at runtime can add a grant.

use crate::{Capability, Operation, Predicate, ResourceKind};

use Capability::*;
use Operation::*;
use Predicate::*;
use ResourceKind as K;

type RoleEntry = ((ResourceKind, Operation), &'static [Capability]);
type MethodEntry = ((ResourceKind, Operation), &'static [Predicate]);

/// Capabilities that grant an operation on a whole resource class.
pub const MODULE_ROLE_MAP: &[RoleEntry] = &[
    ((K::SiteSetting, Read), &[Admin]),
    ((K::SiteSetting, Write), &[Admin]),
    ((K::SiteSetting, Delete), &[Admin]),
    ((K::User, Read), &[UserManager, Admin]),
    ((K::User, Write), &[UserManager]),
    ((K::User, Delete), &[UserManager]),
    ((K::User, Export), &[Exporter]),
    ((K::Sighting, Export), &[Exporter]),
    ((K::Encounter, Export), &[Exporter]),
    ((K::Individual, Export), &[Exporter]),
    ((K::Sighting, Write), &[Researcher, Contributor]),
    ((K::Encounter, Write), &[Researcher, Contributor]),
    ((K::Individual, Read), &[Researcher]),
    ((K::Individual, Write), &[Researcher]),
    ((K::Annotation, Read), &[Researcher]),
    ((K::Annotation, Write), &[Researcher]),
    ((K::Keyword, Read), &[Researcher, Admin]),
    ((K::Keyword, Write), &[Researcher, Admin]),
    ((K::SocialGroup, Read), &[Researcher]),
    ((K::SocialGroup, Write), &[Researcher]),
    ((K::SocialGroup, Delete), &[Admin]),
    ((K::Relationship, Read), &[Researcher]),
    ((K::Relationship, Write), &[Researcher]),
    ((K::Collaboration, Read), &[UserManager]),
    ((K::Collaboration, Write), &[UserManager]),
    ((K::AuditLog, Read), &[UserManager, Admin]),
    ((K::Organization, Write), &[Admin]),
    ((K::Project, Write), &[Admin]),
    ((K::Mission, Read), &[Admin]),
    ((K::Mission, Write), &[Admin]),
    ((K::Task, Read), &[Admin]),
];

/// Capabilities that grant an operation on any instance of a class.
pub const OBJECT_ROLE_MAP: &[RoleEntry] = &[
    ((K::SiteSetting, Read), &[Admin]),
    ((K::SiteSetting, Write), &[Admin]),
    ((K::SiteSetting, Delete), &[Admin]),
    ((K::User, Read), &[UserManager, Admin]),
    ((K::User, Write), &[UserManager]),
    ((K::User, Delete), &[UserManager]),
    ((K::User, ReadPrivileged), &[UserManager, Admin]),
    ((K::User, Export), &[Exporter]),
    ((K::Sighting, Read), &[Admin]),
    ((K::Encounter, Read), &[Admin]),
    ((K::Individual, Read), &[Admin]),
    ((K::Annotation, Read), &[Admin]),
    ((K::Asset, Read), &[Admin]),
    ((K::AssetGroup, Read), &[Admin]),
    ((K::AssetGroupSighting, Read), &[Admin]),
    ((K::Sighting, ReadInternal), &[Internal]),
    ((K::Sighting, WriteInternal), &[Internal]),
    ((K::Sighting, Export), &[Exporter]),
    ((K::Encounter, ReadInternal), &[Internal]),
    ((K::Encounter, WriteInternal), &[Internal]),
    ((K::Encounter, Export), &[Exporter]),
    ((K::Individual, ReadInternal), &[Internal]),
    ((K::Individual, Export), &[Exporter]),
    ((K::Asset, ReadInternal), &[Internal]),
    ((K::AssetGroup, ReadInternal), &[Internal]),
    ((K::AssetGroupSighting, ReadInternal), &[Internal]),
    ((K::Keyword, Read), &[Researcher, Admin]),
    ((K::Keyword, Write), &[Admin]),
    ((K::Keyword, Delete), &[Admin]),
    ((K::SocialGroup, Read), &[Researcher]),
    ((K::SocialGroup, Write), &[Researcher]),
    ((K::SocialGroup, Delete), &[Admin]),
    ((K::Relationship, Read), &[Researcher]),
    ((K::Relationship, Write), &[Researcher]),
    ((K::Relationship, Delete), &[Researcher]),
    ((K::Collaboration, Read), &[UserManager]),
    ((K::Collaboration, Write), &[UserManager]),
    ((K::Collaboration, Delete), &[UserManager]),
    ((K::AuditLog, Read), &[UserManager, Admin]),
    ((K::Mission, Read), &[Admin]),
    ((K::Mission, Write), &[Admin]),
    ((K::Task, Read), &[Admin]),
    ((K::Task, Write), &[Admin]),
];

/// Predicates whose truth grants an operation on a specific instance.
pub const OBJECT_METHOD_MAP: &[MethodEntry] = &[
    ((K::User, Read), &[UserIsSelf]),
    ((K::User, Write), &[UserIsSelf]),
    ((K::Sighting, Read), &[UserIsOwner, UserCanAccess]),
    ((K::Sighting, Write), &[UserIsOwner]),
    ((K::Encounter, Read), &[UserIsOwner, UserCanAccess]),
    ((K::Encounter, Write), &[UserIsOwner]),
    ((K::Individual, Read), &[UserCanAccess]),
    ((K::Individual, Write), &[UserIsOwner]),
    ((K::Annotation, Read), &[UserCanAccess]),
    ((K::Asset, Read), &[UserIsOwner, UserCanAccess]),
    ((K::AssetGroup, Read), &[UserIsOwner, UserCanAccess]),
    ((K::AssetGroup, Write), &[UserIsOwner]),
    ((K::AssetGroupSighting, Read), &[UserIsOwner]),
    ((K::AssetGroupSighting, Write), &[UserIsOwner]),
    ((K::Collaboration, Read), &[UserIsMember]),
    ((K::Collaboration, Write), &[UserIsMember]),
    ((K::Notification, Read), &[UserIsOwner]),
    ((K::Notification, Write), &[UserIsOwner]),
    ((K::Project, Read), &[UserIsMember]),
    ((K::Project, Write), &[UserIsOwner]),
    ((K::Mission, Read), &[UserIsAssigned]),
    ((K::Task, Read), &[UserIsAssigned]),
    ((K::Task, Write), &[UserIsAssigned]),
];

/// Classes an anonymous principal may create.
pub const ANONYMOUS_CREATABLE: &[ResourceKind] = &[K::AssetGroup, K::Sighting, K::Encounter];

/// Classes excluded from the privileged module fallback.
pub const RESTRICTED_CREATION: &[ResourceKind] = &[K::Organization, K::Project, K::SiteSetting];

/// Classes that may be checked without a local instance.
pub const REMOTE_FALLBACK: &[ResourceKind] =
    &[K::Sighting, K::Encounter, K::Individual, K::Annotation];

/// Classes whose public instances researchers may delete.
pub const PUBLIC_DELETABLE: &[ResourceKind] = &[K::Individual];

fn lookup<T: 'static>(
    table: &'static [((ResourceKind, Operation), &'static [T])],
    kind: ResourceKind,
    op: Operation,
) -> &'static [T] {
    table
        .iter()
        .find(|(key, _)| *key == (kind, op))
        .map(|(_, values)| *values)
        .unwrap_or(&[])
}

pub fn module_roles(kind: ResourceKind, op: Operation) -> &'static [Capability] {
    lookup(MODULE_ROLE_MAP, kind, op)
}

pub fn object_roles(kind: ResourceKind, op: Operation) -> &'static [Capability] {
    lookup(OBJECT_ROLE_MAP, kind, op)
}

pub fn object_methods(kind: ResourceKind, op: Operation) -> &'static [Predicate] {
    lookup(OBJECT_METHOD_MAP, kind, op)
}
