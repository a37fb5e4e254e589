//! Protected resource classes and instances.

use crate::{Error, Principal, PrincipalId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A category of protected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Sighting,
    Encounter,
    Individual,
    Annotation,
    Asset,
    AssetGroup,
    AssetGroupSighting,
    Collaboration,
    Keyword,
    SocialGroup,
    Relationship,
    Notification,
    SiteSetting,
    AuditLog,
    Organization,
    Project,
    Mission,
    Task,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 19] = [
        ResourceKind::User,
        ResourceKind::Sighting,
        ResourceKind::Encounter,
        ResourceKind::Individual,
        ResourceKind::Annotation,
        ResourceKind::Asset,
        ResourceKind::AssetGroup,
        ResourceKind::AssetGroupSighting,
        ResourceKind::Collaboration,
        ResourceKind::Keyword,
        ResourceKind::SocialGroup,
        ResourceKind::Relationship,
        ResourceKind::Notification,
        ResourceKind::SiteSetting,
        ResourceKind::AuditLog,
        ResourceKind::Organization,
        ResourceKind::Project,
        ResourceKind::Mission,
        ResourceKind::Task,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Sighting => "sighting",
            ResourceKind::Encounter => "encounter",
            ResourceKind::Individual => "individual",
            ResourceKind::Annotation => "annotation",
            ResourceKind::Asset => "asset",
            ResourceKind::AssetGroup => "asset_group",
            ResourceKind::AssetGroupSighting => "asset_group_sighting",
            ResourceKind::Collaboration => "collaboration",
            ResourceKind::Keyword => "keyword",
            ResourceKind::SocialGroup => "social_group",
            ResourceKind::Relationship => "relationship",
            ResourceKind::Notification => "notification",
            ResourceKind::SiteSetting => "site_setting",
            ResourceKind::AuditLog => "audit_log",
            ResourceKind::Organization => "organization",
            ResourceKind::Project => "project",
            ResourceKind::Mission => "mission",
            ResourceKind::Task => "task",
        }
    }

    /// Human-facing name used in denial messages ("asset group").
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    /// Accepts `asset_group`, `asset-group` and `AssetGroup`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().replace('_', "") == wanted)
            .ok_or_else(|| Error::Invalid(format!("unknown resource kind '{s}'")))
    }
}

/// Capability predicates a resource can answer about a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    UserIsOwner,
    UserCanAccess,
    UserIsMember,
    UserIsAssigned,
    UserIsSelf,
}

/// A concrete protected object.
///
/// Implementors answer the predicates that make sense for their type; the
/// grant tables decide which predicates are consulted for an operation.
pub trait Resource {
    fn kind(&self) -> ResourceKind;

    fn is_public(&self) -> bool;

    fn owners(&self) -> &[PrincipalId];

    fn is_owned_by(&self, principal: &Principal) -> bool {
        !principal.is_anonymous() && self.owners().contains(&principal.id)
    }

    fn satisfies(&self, predicate: Predicate, principal: &Principal) -> bool {
        match predicate {
            Predicate::UserIsOwner => self.is_owned_by(principal),
            _ => false,
        }
    }
}

/// A unique identifier for a stored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub Uuid);

impl ResourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|e| Error::Invalid(format!("invalid resource id '{s}': {e}")))
    }
}

/// A generic resource described by its ownership and membership lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: ResourceId,
    pub kind: ResourceKind,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub owners: Vec<PrincipalId>,
    #[serde(default)]
    pub members: Vec<PrincipalId>,
    #[serde(default)]
    pub assignees: Vec<PrincipalId>,
}

impl ResourceRecord {
    pub fn new(kind: ResourceKind, owner: PrincipalId) -> Self {
        Self {
            id: ResourceId::new(),
            kind,
            public: false,
            owners: vec![owner],
            members: Vec::new(),
            assignees: Vec::new(),
        }
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn with_owner(mut self, owner: PrincipalId) -> Self {
        if !self.owners.contains(&owner) {
            self.owners.push(owner);
        }
        self
    }

    pub fn with_member(mut self, member: PrincipalId) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_assignee(mut self, assignee: PrincipalId) -> Self {
        self.assignees.push(assignee);
        self
    }

    /// Every record needs at least one owner.
    pub fn validate(&self) -> crate::Result<()> {
        if self.owners.is_empty() {
            return Err(Error::Invalid(format!("{} {} has no owners", self.kind, self.id)));
        }
        Ok(())
    }
}

impl Resource for ResourceRecord {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn is_public(&self) -> bool {
        self.public
    }

    fn owners(&self) -> &[PrincipalId] {
        &self.owners
    }

    fn satisfies(&self, predicate: Predicate, principal: &Principal) -> bool {
        if principal.is_anonymous() {
            return false;
        }
        let id = &principal.id;
        match predicate {
            Predicate::UserIsOwner => self.is_owned_by(principal),
            Predicate::UserCanAccess => {
                self.owners.contains(id) || self.members.contains(id) || self.assignees.contains(id)
            }
            Predicate::UserIsMember => self.owners.contains(id) || self.members.contains(id),
            Predicate::UserIsAssigned => self.assignees.contains(id),
            Predicate::UserIsSelf => self.kind == ResourceKind::User && self.id.0 == id.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_variants() {
        for name in ["asset_group", "asset-group", "AssetGroup", "ASSETGROUP"] {
            assert_eq!(name.parse::<ResourceKind>().unwrap(), ResourceKind::AssetGroup);
        }
        assert!("Spaceship".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_record_predicates() {
        let owner = Principal::new("owner");
        let member = Principal::new("member");
        let stranger = Principal::new("stranger");
        let record = ResourceRecord::new(ResourceKind::Project, owner.id).with_member(member.id);

        assert!(record.satisfies(Predicate::UserIsOwner, &owner));
        assert!(!record.satisfies(Predicate::UserIsOwner, &member));
        assert!(record.satisfies(Predicate::UserIsMember, &member));
        assert!(record.satisfies(Predicate::UserCanAccess, &member));
        assert!(!record.satisfies(Predicate::UserCanAccess, &stranger));
        assert!(!record.satisfies(Predicate::UserIsOwner, &Principal::anonymous()));
    }

    #[test]
    fn test_user_is_self() {
        let me = Principal::new("me");
        let mut record = ResourceRecord::new(ResourceKind::User, me.id);
        record.id = ResourceId(me.id.0);
        assert!(record.satisfies(Predicate::UserIsSelf, &me));
        assert!(!record.satisfies(Predicate::UserIsSelf, &Principal::new("other")));
    }

    #[test]
    fn test_default_trait_predicates() {
        struct Bare(Vec<PrincipalId>);
        impl Resource for Bare {
            fn kind(&self) -> ResourceKind {
                ResourceKind::Keyword
            }
            fn is_public(&self) -> bool {
                false
            }
            fn owners(&self) -> &[PrincipalId] {
                &self.0
            }
        }

        let owner = Principal::new("owner");
        let bare = Bare(vec![owner.id]);
        assert!(bare.satisfies(Predicate::UserIsOwner, &owner));
        assert!(!bare.satisfies(Predicate::UserCanAccess, &owner));
    }

    #[test]
    fn test_record_without_owners_is_invalid() {
        let owner = Principal::new("owner");
        let mut record = ResourceRecord::new(ResourceKind::Sighting, owner.id);
        assert!(record.validate().is_ok());

        record.owners.clear();
        assert!(matches!(record.validate(), Err(Error::Invalid(_))));
    }
}
