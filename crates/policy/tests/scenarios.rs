use policy::tables::{MODULE_ROLE_MAP, OBJECT_ROLE_MAP};
use policy::{
    Capability, CollaborationEdge, Direction, Directory, Operation, Policy, Principal,
    ResourceKind, ResourceRecord,
};

fn active(name: &str) -> Principal {
    Principal::new(name).with(Capability::Active)
}

fn directory_of(principals: &[&Principal]) -> Directory {
    let mut dir = Directory::new();
    for p in principals {
        dir.add_principal((*p).clone());
    }
    dir
}

#[test]
fn public_instances_are_readable_by_anyone() {
    let owner = active("owner");
    let dir = directory_of(&[&owner]);
    let policy = Policy::new(&dir);
    let everyone = [
        Principal::anonymous(),
        Principal::new("inactive"),
        active("plain"),
        active("admin").with(Capability::Admin),
    ];

    for kind in ResourceKind::ALL {
        let resource = ResourceRecord::new(kind, owner.id).public();
        for who in &everyone {
            assert!(
                policy.can_object(who, &resource, Operation::Read),
                "{} could not read public {kind}",
                who.display_name
            );
        }
    }
}

#[test]
fn role_map_flags_grant_and_their_absence_denies() {
    let owner = active("owner");
    let plain = active("plain");
    let dir = directory_of(&[&owner, &plain]);
    let policy = Policy::new(&dir);

    for ((kind, op), flags) in MODULE_ROLE_MAP {
        for flag in *flags {
            let holder = active("holder").with(*flag);
            assert!(policy.can_module(&holder, *kind, *op), "{flag} on {kind}/{op}");
        }
        assert!(!policy.can_module(&plain, *kind, *op), "plain on {kind}/{op}");
    }

    for ((kind, op), flags) in OBJECT_ROLE_MAP {
        let resource = ResourceRecord::new(*kind, owner.id);
        for flag in *flags {
            let holder = active("holder").with(*flag);
            assert!(policy.can_object(&holder, &resource, *op), "{flag} on {kind}/{op}");
        }
        assert!(!policy.can_object(&plain, &resource, *op), "plain on {kind}/{op}");
    }
}

#[test]
fn checks_are_idempotent() {
    let owner = active("owner");
    let friend = active("friend");
    let mut dir = directory_of(&[&owner, &friend]);
    dir.add_collaboration(CollaborationEdge::approved(owner.id, friend.id, Direction::View))
        .unwrap();
    let policy = Policy::new(&dir);
    let resource = ResourceRecord::new(ResourceKind::Encounter, owner.id);

    for op in Operation::ALL {
        let first = policy.check_object(&friend, &resource, op);
        let second = policy.check_object(&friend, &resource, op);
        assert_eq!(first, second);
    }
}

#[test]
fn adding_a_collaboration_never_revokes_access() {
    let a = active("a");
    let b = active("b");
    let before = directory_of(&[&a, &b]);
    let mut after = before.clone();
    after
        .add_collaboration(CollaborationEdge::approved(a.id, b.id, Direction::View))
        .unwrap();

    for kind in ResourceKind::ALL {
        let owned_by_b = ResourceRecord::new(kind, b.id);
        for op in Operation::ALL {
            let had = Policy::new(&before).can_object(&a, &owned_by_b, op);
            let has = Policy::new(&after).can_object(&a, &owned_by_b, op);
            assert!(!had || has, "collaboration revoked {op} on {kind}");
        }
    }

    let sighting = ResourceRecord::new(ResourceKind::Sighting, b.id);
    assert!(!Policy::new(&before).can_object(&a, &sighting, Operation::Read));
    assert!(Policy::new(&after).can_object(&a, &sighting, Operation::Read));
}

#[test]
fn scenario_stranger_cannot_read_private_instance() {
    let owner = active("owner");
    let reader = active("reader");
    let dir = directory_of(&[&owner, &reader]);
    let policy = Policy::new(&dir);
    let sighting = ResourceRecord::new(ResourceKind::Sighting, owner.id);

    assert!(!policy.can_object(&reader, &sighting, Operation::Read));
}

#[test]
fn scenario_same_reader_as_admin_reads_through_role_map() {
    let owner = active("owner");
    let reader = active("reader");
    let dir = directory_of(&[&owner, &reader]);
    let policy = Policy::new(&dir);
    let sighting = ResourceRecord::new(ResourceKind::Sighting, owner.id);
    assert!(!policy.can_object(&reader, &sighting, Operation::Read));

    let admin = reader.with(Capability::Admin);
    assert!(policy.can_object(&admin, &sighting, Operation::Read));
}

#[test]
fn admin_reads_private_instances_of_every_data_kind() {
    let owner = active("owner");
    let admin = active("admin").with(Capability::Admin);
    let dir = directory_of(&[&owner, &admin]);
    let policy = Policy::new(&dir);

    for kind in [
        ResourceKind::Sighting,
        ResourceKind::Encounter,
        ResourceKind::Individual,
        ResourceKind::Annotation,
        ResourceKind::Asset,
        ResourceKind::AssetGroup,
        ResourceKind::AssetGroupSighting,
        ResourceKind::User,
    ] {
        let resource = ResourceRecord::new(kind, owner.id);
        assert!(policy.can_object(&admin, &resource, Operation::Read), "admin on {kind}");
    }
}

#[test]
fn scenario_owner_writes_without_role_flags() {
    let owner = active("owner");
    let dir = directory_of(&[&owner]);
    let policy = Policy::new(&dir);

    let sighting = ResourceRecord::new(ResourceKind::Sighting, owner.id);
    assert!(policy.can_object(&owner, &sighting, Operation::Write));

    // No method entry for relationships: ownership elevation alone grants it.
    let relationship = ResourceRecord::new(ResourceKind::Relationship, owner.id);
    assert!(policy.can_object(&owner, &relationship, Operation::Write));
}

#[test]
fn scenario_edit_collaborator_writes_and_stranger_does_not() {
    let a = active("a");
    let b = active("b");
    let c = active("c");
    let mut dir = directory_of(&[&a, &b, &c]);
    dir.add_collaboration(CollaborationEdge::approved(b.id, a.id, Direction::Edit))
        .unwrap();
    let policy = Policy::new(&dir);
    let encounter = ResourceRecord::new(ResourceKind::Encounter, a.id);

    assert!(policy.can_object(&b, &encounter, Operation::Write));
    assert!(!policy.can_object(&c, &encounter, Operation::Write));
}

#[test]
fn scenario_researcher_edits_public_data_but_deletes_only_individuals() {
    let owner = active("owner");
    let researcher = active("researcher").with(Capability::Researcher);
    let dir = directory_of(&[&owner, &researcher]);
    let policy = Policy::new(&dir);

    let sighting = ResourceRecord::new(ResourceKind::Sighting, owner.id).public();
    assert!(policy.can_object(&researcher, &sighting, Operation::Write));
    assert!(!policy.can_object(&researcher, &sighting, Operation::Delete));

    let individual = ResourceRecord::new(ResourceKind::Individual, owner.id).public();
    assert!(policy.can_object(&researcher, &individual, Operation::Delete));
}

#[test]
fn sample_fixture_grants_view_only_collaboration() {
    let dir = Directory::parse(include_str!("../../../fixtures/sample.toml")).unwrap();
    let policy = Policy::new(&dir);
    let jane = dir
        .principals
        .iter()
        .find(|p| p.display_name == "Jane Goodall")
        .unwrap();
    let former_staff = dir
        .principals
        .iter()
        .find(|p| p.display_name == "Former Staff")
        .unwrap();
    let sighting = dir
        .resources
        .iter()
        .find(|r| r.kind == ResourceKind::Sighting)
        .unwrap();

    assert!(policy.can_object(jane, sighting, Operation::Read));
    assert!(!policy.can_object(jane, sighting, Operation::Write));
    assert!(!policy.can_object(former_staff, sighting, Operation::ReadDebug));
    assert!(!policy.can_module(former_staff, ResourceKind::Sighting, Operation::Delete));
}
