//! Collaboration edges and the in-memory directory that resolves them.

use crate::{Error, Operation, Principal, PrincipalId, ResourceId, ResourceRecord, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Approval state of one member for one direction of a collaboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationState {
    #[default]
    Pending,
    Approved,
    Declined,
    Revoked,
    Creator,
    NotInitiated,
}

impl CollaborationState {
    pub const ALL: [CollaborationState; 6] = [
        CollaborationState::Pending,
        CollaborationState::Approved,
        CollaborationState::Declined,
        CollaborationState::Revoked,
        CollaborationState::Creator,
        CollaborationState::NotInitiated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollaborationState::Pending => "pending",
            CollaborationState::Approved => "approved",
            CollaborationState::Declined => "declined",
            CollaborationState::Revoked => "revoked",
            CollaborationState::Creator => "creator",
            CollaborationState::NotInitiated => "not_initiated",
        }
    }

    /// The initiator of a collaboration implicitly approves it.
    pub fn is_approved(self) -> bool {
        matches!(self, CollaborationState::Approved | CollaborationState::Creator)
    }
}

impl fmt::Display for CollaborationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CollaborationState {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CollaborationState::ALL
            .into_iter()
            .find(|state| state.as_str() == s.trim())
            .ok_or_else(|| Error::Invalid(format!("unknown collaboration state '{s}'")))
    }
}

/// Which kind of access a collaboration extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    View,
    Edit,
}

impl Direction {
    /// Only plain reads and writes are extended through collaborations.
    pub fn for_operation(op: Operation) -> Option<Self> {
        match op {
            Operation::Read => Some(Direction::View),
            Operation::Write => Some(Direction::Edit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::View => "view",
            Direction::Edit => "edit",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "view" | "read" => Ok(Direction::View),
            "edit" | "write" => Ok(Direction::Edit),
            other => Err(Error::Invalid(format!("unknown direction '{other}'"))),
        }
    }
}

/// One side of a collaboration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationMember {
    pub principal: PrincipalId,
    #[serde(default)]
    pub view: CollaborationState,
    #[serde(default = "not_initiated")]
    pub edit: CollaborationState,
}

fn not_initiated() -> CollaborationState {
    CollaborationState::NotInitiated
}

impl CollaborationMember {
    pub fn new(principal: PrincipalId) -> Self {
        Self {
            principal,
            view: CollaborationState::Pending,
            edit: CollaborationState::NotInitiated,
        }
    }

    pub fn state(&self, direction: Direction) -> CollaborationState {
        match direction {
            Direction::View => self.view,
            Direction::Edit => self.edit,
        }
    }

    pub fn set_state(&mut self, direction: Direction, state: CollaborationState) {
        match direction {
            Direction::View => self.view = state,
            Direction::Edit => self.edit = state,
        }
    }
}

/// An approved (or pending) sharing relationship between two principals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationEdge {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub members: [CollaborationMember; 2],
}

impl CollaborationEdge {
    /// A fresh edge initiated by `initiator`, awaiting the peer's approval.
    pub fn initiate(initiator: PrincipalId, peer: PrincipalId) -> Self {
        let mut first = CollaborationMember::new(initiator);
        first.view = CollaborationState::Creator;
        Self {
            id: Uuid::new_v4(),
            members: [first, CollaborationMember::new(peer)],
        }
    }

    /// An edge with both members approved for `direction` (and view).
    pub fn approved(a: PrincipalId, b: PrincipalId, direction: Direction) -> Self {
        let mut edge = Self::initiate(a, b);
        for member in &mut edge.members {
            member.view = CollaborationState::Approved;
            if direction == Direction::Edit {
                member.edit = CollaborationState::Approved;
            }
        }
        edge
    }

    pub fn validate(&self) -> Result<()> {
        if self.members[0].principal == self.members[1].principal {
            return Err(Error::Invalid(format!(
                "collaboration {} joins {} with itself",
                self.id, self.members[0].principal
            )));
        }
        Ok(())
    }

    pub fn member_mut(&mut self, principal: &PrincipalId) -> Option<&mut CollaborationMember> {
        self.members.iter_mut().find(|m| &m.principal == principal)
    }

    /// The member on the other side from `principal`.
    pub fn other(&self, principal: &PrincipalId) -> Option<&CollaborationMember> {
        match &self.members {
            [a, b] if &a.principal == principal => Some(b),
            [a, b] if &b.principal == principal => Some(a),
            _ => None,
        }
    }

    /// Edit access requires view access on both sides as well.
    pub fn is_approved(&self, direction: Direction) -> bool {
        let view = self.members.iter().all(|m| m.view.is_approved());
        match direction {
            Direction::View => view,
            Direction::Edit => view && self.members.iter().all(|m| m.edit.is_approved()),
        }
    }
}

/// Resolves principals and their collaborators for the object gate.
pub trait CollaborationSource {
    fn principal(&self, id: &PrincipalId) -> Option<Principal>;

    /// Peers on edges approved for `direction`, deduplicated, without `principal`.
    fn collaborators(&self, principal: &Principal, direction: Direction) -> Vec<Principal>;
}

/// The in-memory snapshot a check runs against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub principals: Vec<Principal>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default)]
    pub collaborations: Vec<CollaborationEdge>,
    #[serde(skip)]
    index: HashMap<PrincipalId, usize>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a directory fixture from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a directory fixture from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let directory: Directory = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        directory.validated()
    }

    /// Build a directory from parts, checking every edge.
    pub fn from_parts(
        principals: Vec<Principal>,
        resources: Vec<ResourceRecord>,
        collaborations: Vec<CollaborationEdge>,
    ) -> Result<Self> {
        Self {
            principals,
            resources,
            collaborations,
            index: HashMap::new(),
        }
        .validated()
    }

    fn validated(mut self) -> Result<Self> {
        for resource in &self.resources {
            resource.validate()?;
        }
        for edge in &self.collaborations {
            edge.validate()?;
        }
        self.reindex();
        Ok(self)
    }

    fn reindex(&mut self) {
        self.index = self
            .principals
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
    }

    pub fn add_principal(&mut self, principal: Principal) {
        match self.index.get(&principal.id) {
            Some(&i) => self.principals[i] = principal,
            None => {
                self.index.insert(principal.id, self.principals.len());
                self.principals.push(principal);
            }
        }
    }

    pub fn add_resource(&mut self, resource: ResourceRecord) {
        self.resources.retain(|r| r.id != resource.id);
        self.resources.push(resource);
    }

    pub fn add_collaboration(&mut self, edge: CollaborationEdge) -> Result<()> {
        edge.validate()?;
        self.collaborations.retain(|e| e.id != edge.id);
        self.collaborations.push(edge);
        Ok(())
    }

    pub fn resource(&self, id: &ResourceId) -> Option<&ResourceRecord> {
        self.resources.iter().find(|r| &r.id == id)
    }
}

impl CollaborationSource for Directory {
    fn principal(&self, id: &PrincipalId) -> Option<Principal> {
        self.index.get(id).map(|&i| self.principals[i].clone())
    }

    fn collaborators(&self, principal: &Principal, direction: Direction) -> Vec<Principal> {
        if principal.is_anonymous() {
            return Vec::new();
        }
        let peers: BTreeSet<PrincipalId> = self
            .collaborations
            .iter()
            .filter(|edge| edge.is_approved(direction))
            .filter_map(|edge| edge.other(&principal.id))
            .map(|member| member.principal)
            .filter(|id| id != &principal.id)
            .collect();
        peers.iter().filter_map(|id| self.principal(id)).collect()
    }
}
