//! SQLite store implementation.

use crate::{AuditEntry, Error, Result};
use policy::{
    CollaborationEdge, CollaborationSource, CollaborationState, Direction, Directory, Principal,
    PrincipalId, ResourceId, ResourceRecord,
};
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// SQLite-backed store for check inputs and the audit log.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened store");
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS principals (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS resources (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS collaborations (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS collaboration_members (
                collaboration_id TEXT NOT NULL,
                principal_id TEXT NOT NULL,
                PRIMARY KEY (collaboration_id, principal_id)
            );
            CREATE INDEX IF NOT EXISTS idx_collaboration_members_principal
                ON collaboration_members(principal_id);
            CREATE TABLE IF NOT EXISTS audit (
                id TEXT PRIMARY KEY,
                principal_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audit_principal
                ON audit(principal_id, timestamp);
            "#,
        )?;
        Ok(())
    }

    /// Insert or replace a principal.
    pub fn put_principal(&self, principal: &Principal) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO principals (id, data) VALUES (?1, ?2)",
            params![principal.id.to_string(), serde_json::to_string(principal)?],
        )?;
        Ok(())
    }

    pub fn principal(&self, id: &PrincipalId) -> Result<Principal> {
        self.load_one("SELECT data FROM principals WHERE id = ?1", &id.to_string())?
            .ok_or_else(|| Error::NotFound(format!("principal {id}")))
    }

    pub fn list_principals(&self) -> Result<Vec<Principal>> {
        self.load_all("SELECT data FROM principals ORDER BY id")
    }

    /// Insert or replace a resource record.
    pub fn put_resource(&self, resource: &ResourceRecord) -> Result<()> {
        resource.validate()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO resources (id, kind, data) VALUES (?1, ?2, ?3)",
            params![
                resource.id.to_string(),
                resource.kind.as_str(),
                serde_json::to_string(resource)?,
            ],
        )?;
        Ok(())
    }

    pub fn resource(&self, id: &ResourceId) -> Result<ResourceRecord> {
        self.load_one("SELECT data FROM resources WHERE id = ?1", &id.to_string())?
            .ok_or_else(|| Error::NotFound(format!("resource {id}")))
    }

    pub fn list_resources(&self) -> Result<Vec<ResourceRecord>> {
        self.load_all("SELECT data FROM resources ORDER BY kind, id")
    }

    /// Insert or replace a collaboration edge.
    pub fn put_collaboration(&self, edge: &CollaborationEdge) -> Result<()> {
        edge.validate()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO collaborations (id, data) VALUES (?1, ?2)",
            params![edge.id.to_string(), serde_json::to_string(edge)?],
        )?;
        self.conn.execute(
            "DELETE FROM collaboration_members WHERE collaboration_id = ?1",
            [edge.id.to_string()],
        )?;
        for member in &edge.members {
            self.conn.execute(
                "INSERT INTO collaboration_members (collaboration_id, principal_id) VALUES (?1, ?2)",
                params![edge.id.to_string(), member.principal.to_string()],
            )?;
        }
        Ok(())
    }

    pub fn collaboration(&self, id: &Uuid) -> Result<CollaborationEdge> {
        self.load_one("SELECT data FROM collaborations WHERE id = ?1", &id.to_string())?
            .ok_or_else(|| Error::NotFound(format!("collaboration {id}")))
    }

    pub fn list_collaborations(&self) -> Result<Vec<CollaborationEdge>> {
        self.load_all("SELECT data FROM collaborations ORDER BY id")
    }

    /// Edges with `principal` as one of their members.
    pub fn collaborations_of(&self, principal: &PrincipalId) -> Result<Vec<CollaborationEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.data FROM collaborations c
             JOIN collaboration_members m ON m.collaboration_id = c.id
             WHERE m.principal_id = ?1
             ORDER BY c.id",
        )?;
        let rows = stmt
            .query_map([principal.to_string()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode_all(rows)
    }

    /// Stored peers on edges approved for `direction`. Peers without a
    /// principal row are skipped.
    pub fn collaborators_of(
        &self,
        principal: &Principal,
        direction: Direction,
    ) -> Result<Vec<Principal>> {
        if principal.is_anonymous() {
            return Ok(Vec::new());
        }
        let peers: BTreeSet<PrincipalId> = self
            .collaborations_of(&principal.id)?
            .iter()
            .filter(|edge| edge.is_approved(direction))
            .filter_map(|edge| edge.other(&principal.id))
            .map(|member| member.principal)
            .filter(|id| id != &principal.id)
            .collect();

        let mut collaborators = Vec::with_capacity(peers.len());
        for id in &peers {
            match self.principal(id) {
                Ok(peer) => collaborators.push(peer),
                Err(Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(collaborators)
    }

    /// Record one member's approval state for one direction of an edge.
    pub fn set_collaboration_state(
        &self,
        edge: &Uuid,
        member: &PrincipalId,
        direction: Direction,
        state: CollaborationState,
    ) -> Result<CollaborationEdge> {
        let mut collaboration = self.collaboration(edge)?;
        collaboration
            .member_mut(member)
            .ok_or_else(|| Error::NotFound(format!("member {member} of collaboration {edge}")))?
            .set_state(direction, state);
        self.put_collaboration(&collaboration)?;
        debug!(%edge, %member, direction = direction.as_str(), state = %state, "collaboration state changed");
        Ok(collaboration)
    }

    /// Load everything a check needs into an in-memory snapshot.
    pub fn directory(&self) -> Result<Directory> {
        let directory = Directory::from_parts(
            self.list_principals()?,
            self.list_resources()?,
            self.list_collaborations()?,
        )?;
        Ok(directory)
    }

    /// Write a directory snapshot into the store in one transaction.
    pub fn import(&self, directory: &Directory) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for principal in &directory.principals {
            self.put_principal(principal)?;
        }
        for resource in &directory.resources {
            self.put_resource(resource)?;
        }
        for edge in &directory.collaborations {
            self.put_collaboration(edge)?;
        }
        tx.commit()?;
        debug!(
            principals = directory.principals.len(),
            resources = directory.resources.len(),
            collaborations = directory.collaborations.len(),
            "imported directory"
        );
        Ok(())
    }

    /// Append a decision to the audit log.
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO audit (id, principal_id, timestamp, data) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.id.to_string(),
                entry.principal.to_string(),
                entry.timestamp.to_rfc3339(),
                serde_json::to_string(entry)?,
            ],
        )?;
        Ok(())
    }

    /// The most recent `limit` audit entries, newest first.
    pub fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM audit ORDER BY timestamp DESC LIMIT ?1")?;
        let rows = stmt
            .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode_all(rows)
    }

    /// All audit entries for a principal, oldest first.
    pub fn audit_for_principal(&self, principal: &PrincipalId) -> Result<Vec<AuditEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM audit WHERE principal_id = ?1 ORDER BY timestamp")?;
        let rows = stmt
            .query_map([principal.to_string()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode_all(rows)
    }

    fn load_one<T: DeserializeOwned>(&self, sql: &str, id: &str) -> Result<Option<T>> {
        let data: Option<String> = self
            .conn
            .query_row(sql, [id], |row| row.get(0))
            .optional()?;
        data.map(|d| serde_json::from_str(&d).map_err(Error::from))
            .transpose()
    }

    fn load_all<T: DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        decode_all(rows)
    }
}

/// Stored principals answer collaboration lookups directly from SQL.
///
/// Read failures resolve to "no principal" and "no collaborators", so a
/// broken database can only narrow access.
impl CollaborationSource for Store {
    fn principal(&self, id: &PrincipalId) -> Option<Principal> {
        Store::principal(self, id).ok()
    }

    fn collaborators(&self, principal: &Principal, direction: Direction) -> Vec<Principal> {
        match self.collaborators_of(principal, direction) {
            Ok(collaborators) => collaborators,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load collaborations");
                Vec::new()
            }
        }
    }
}

fn decode_all<T: DeserializeOwned>(rows: Vec<String>) -> Result<Vec<T>> {
    rows.iter()
        .map(|data| serde_json::from_str(data).map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gate;
    use policy::{Capability, Decision, Operation, Policy, ResourceKind};

    fn seeded() -> (Store, Principal, Principal, ResourceRecord) {
        let store = Store::in_memory().unwrap();
        let owner = Principal::new("Owner").with(Capability::Active);
        let friend = Principal::new("Friend").with(Capability::Active);
        let sighting = ResourceRecord::new(ResourceKind::Sighting, owner.id);
        store.put_principal(&owner).unwrap();
        store.put_principal(&friend).unwrap();
        store.put_resource(&sighting).unwrap();
        (store, owner, friend, sighting)
    }

    #[test]
    fn test_principal_roundtrip_and_missing() {
        let (store, owner, _, _) = seeded();
        assert_eq!(store.principal(&owner.id).unwrap(), owner);
        assert!(matches!(
            store.principal(&PrincipalId::new()),
            Err(Error::NotFound(_))
        ));
        assert_eq!(store.list_principals().unwrap().len(), 2);
    }

    #[test]
    fn test_collaboration_state_changes_flow_into_checks() {
        let (store, owner, friend, sighting) = seeded();
        let edge = CollaborationEdge::initiate(owner.id, friend.id);
        store.put_collaboration(&edge).unwrap();

        let dir = store.directory().unwrap();
        assert!(!Policy::new(&dir).can_object(&friend, &sighting, Operation::Read));

        store
            .set_collaboration_state(&edge.id, &friend.id, Direction::View, CollaborationState::Approved)
            .unwrap();
        let dir = store.directory().unwrap();
        assert!(Policy::new(&dir).can_object(&friend, &sighting, Operation::Read));
        assert!(Policy::new(&store).can_object(&friend, &sighting, Operation::Read));
    }

    #[test]
    fn test_collaborators_come_from_member_edges_only() {
        let (store, owner, friend, _) = seeded();
        let editor = Principal::new("Editor").with(Capability::Active);
        store.put_principal(&editor).unwrap();
        store
            .put_collaboration(&CollaborationEdge::approved(owner.id, friend.id, Direction::View))
            .unwrap();
        store
            .put_collaboration(&CollaborationEdge::approved(friend.id, editor.id, Direction::Edit))
            .unwrap();

        assert_eq!(store.collaborations_of(&owner.id).unwrap().len(), 1);
        assert_eq!(store.collaborations_of(&friend.id).unwrap().len(), 2);

        let viewers = store.collaborators_of(&owner, Direction::View).unwrap();
        assert_eq!(viewers, vec![friend.clone()]);
        assert!(store.collaborators_of(&owner, Direction::Edit).unwrap().is_empty());
        assert_eq!(store.collaborators_of(&friend, Direction::View).unwrap().len(), 2);
        assert_eq!(
            store.collaborators(&editor, Direction::Edit),
            store.directory().unwrap().collaborators(&editor, Direction::Edit)
        );
    }

    #[test]
    fn test_collaborators_skip_unknown_peers() {
        let (store, owner, _, _) = seeded();
        let ghost = PrincipalId::new();
        store
            .put_collaboration(&CollaborationEdge::approved(owner.id, ghost, Direction::View))
            .unwrap();
        assert!(store.collaborators_of(&owner, Direction::View).unwrap().is_empty());
    }

    #[test]
    fn test_ownerless_resource_rejected() {
        let (store, owner, _, _) = seeded();
        let mut record = ResourceRecord::new(ResourceKind::Asset, owner.id);
        record.owners.clear();
        assert!(matches!(store.put_resource(&record), Err(Error::Policy(_))));
    }

    #[test]
    fn test_set_state_for_non_member_fails() {
        let (store, owner, friend, _) = seeded();
        let edge = CollaborationEdge::initiate(owner.id, friend.id);
        store.put_collaboration(&edge).unwrap();

        let err = store
            .set_collaboration_state(&edge.id, &PrincipalId::new(), Direction::Edit, CollaborationState::Approved)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_import_directory() {
        let store = Store::in_memory().unwrap();
        let a = Principal::new("a");
        let b = Principal::new("b");
        let dir = Directory::from_parts(
            vec![a.clone(), b.clone()],
            vec![ResourceRecord::new(ResourceKind::Project, a.id)],
            vec![CollaborationEdge::approved(a.id, b.id, Direction::View)],
        )
        .unwrap();

        store.import(&dir).unwrap();
        assert_eq!(store.list_principals().unwrap().len(), 2);
        assert_eq!(store.list_resources().unwrap().len(), 1);
        assert_eq!(store.list_collaborations().unwrap().len(), 1);
    }

    #[test]
    fn test_audit_log() {
        let (store, owner, friend, sighting) = seeded();
        let allow = AuditEntry::new(
            owner.id,
            Gate::Object,
            ResourceKind::Sighting,
            Some(sighting.id),
            Operation::Write,
            &Decision::Allow,
        );
        let dir = store.directory().unwrap();
        let deny_decision = Policy::new(&dir).check_object(&friend, &sighting, Operation::Write);
        let deny = AuditEntry::new(
            friend.id,
            Gate::Object,
            ResourceKind::Sighting,
            Some(sighting.id),
            Operation::Write,
            &deny_decision,
        );
        store.append_audit(&allow).unwrap();
        store.append_audit(&deny).unwrap();

        assert_eq!(store.recent_audit(10).unwrap().len(), 2);
        assert_eq!(store.recent_audit(1).unwrap().len(), 1);
        assert_eq!(store.recent_audit(usize::MAX).unwrap().len(), 2);
        let friend_entries = store.audit_for_principal(&friend.id).unwrap();
        assert_eq!(friend_entries.len(), 1);
        assert!(!friend_entries[0].allowed);
        assert_eq!(friend_entries[0].reason.as_deref(), Some("no_grant"));
    }
}
