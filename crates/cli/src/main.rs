mod config;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, TimeZone};
use clap::{Args, Parser, Subcommand};
use policy::explain::owner_names;
use policy::{
    CollaborationSource, CollaborationState, Decision, Direction, Directory, Operation, Policy,
    Principal, PrincipalId, ResourceId, ResourceKind, ResourceRecord, explain_denial,
};
use storage::{AuditEntry, Gate, Store};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "houston.toml";
const ANONYMOUS: &str = "anonymous";

#[derive(Parser)]
#[command(name = "houston")]
#[command(about = "Permission checks for Houston resources", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import principals, resources and collaborations from a TOML fixture
    Seed {
        /// Fixture file
        fixture: PathBuf,
    },
    /// List stored principals
    Principals,
    /// List stored resources
    Resources,
    /// List stored collaborations
    Collaborations,
    /// Record a member's approval state on a collaboration
    SetState {
        /// Collaboration id
        collaboration: Uuid,
        /// Member principal id
        member: String,
        /// view or edit
        direction: String,
        /// pending, approved, declined, revoked, creator or not_initiated
        state: String,
    },
    /// Run a permission check
    #[command(subcommand)]
    Check(CheckCommand),
    /// Show recorded decisions
    Audit {
        /// Show only the last N decisions
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only decisions for this principal
        #[arg(short, long)]
        principal: Option<String>,
    },
}

#[derive(Subcommand)]
enum CheckCommand {
    /// May the principal perform the operation on a class of resource?
    Module {
        #[command(flatten)]
        target: Target,
        /// Resource kind (sighting, asset_group, ...)
        #[arg(short, long)]
        kind: String,
    },
    /// May the principal perform the operation on a stored resource?
    Object {
        #[command(flatten)]
        target: Target,
        /// Resource id
        #[arg(short, long)]
        resource: String,
    },
    /// Check a resource that may only exist on a remote system
    Remote {
        #[command(flatten)]
        target: Target,
        /// Resource kind
        #[arg(short, long)]
        kind: String,
        /// Resource id, if a local copy exists
        #[arg(short, long)]
        resource: Option<String>,
    },
}

#[derive(Args)]
struct Target {
    /// Principal id, or "anonymous"
    #[arg(short, long, default_value = ANONYMOUS)]
    principal: String,
    /// Operation (read, write, delete, read_debug, export, ...)
    #[arg(short, long)]
    op: String,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when a check was denied.
fn run() -> Result<bool> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    init_logging(&config.log.level)?;
    debug!(config = %cli.config.display(), db = %config.storage.path.display(), "loaded config");

    match cli.command {
        Commands::Seed { fixture } => cmd_seed(&config, &fixture),
        Commands::Principals => cmd_principals(&open_store(&config)?),
        Commands::Resources => cmd_resources(&open_store(&config)?),
        Commands::Collaborations => cmd_collaborations(&open_store(&config)?),
        Commands::SetState {
            collaboration,
            member,
            direction,
            state,
        } => cmd_set_state(&open_store(&config)?, &collaboration, &member, &direction, &state),
        Commands::Check(check) => cmd_check(&open_store(&config)?, check),
        Commands::Audit { limit, principal } => {
            cmd_audit(&open_store(&config)?, limit, principal.as_deref())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| Error::Logging(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

fn cmd_seed(config: &Config, fixture: &Path) -> Result<bool> {
    let directory = Directory::load(fixture)?;
    if let Some(parent) = config.storage.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Store::open(&config.storage.path)?;
    store.import(&directory)?;
    info!(fixture = %fixture.display(), "seeded store");
    println!(
        "Imported {} principals, {} resources, {} collaborations into {}",
        directory.principals.len(),
        directory.resources.len(),
        directory.collaborations.len(),
        config.storage.path.display()
    );
    Ok(true)
}

fn cmd_principals(store: &Store) -> Result<bool> {
    let principals = store.list_principals()?;
    if principals.is_empty() {
        println!("No principals found.");
        return Ok(true);
    }

    println!("{:<36}  {:<20}  CAPABILITIES", "PRINCIPAL ID", "NAME");
    println!("{}", "-".repeat(80));
    for p in principals {
        let caps: Vec<_> = p.capabilities.iter().map(|c| c.as_str()).collect();
        println!("{:<36}  {:<20}  {}", p.id, p.display_name, caps.join(","));
    }
    Ok(true)
}

fn cmd_resources(store: &Store) -> Result<bool> {
    let resources = store.list_resources()?;
    if resources.is_empty() {
        println!("No resources found.");
        return Ok(true);
    }

    println!("{:<36}  {:<20}  {:<7}  OWNERS", "RESOURCE ID", "KIND", "PUBLIC");
    println!("{}", "-".repeat(80));
    for r in resources {
        let owners = owner_names(store, &r).join(", ");
        let public = if r.public { "yes" } else { "no" };
        println!("{:<36}  {:<20}  {public:<7}  {owners}", r.id, r.kind.as_str());
    }
    Ok(true)
}

fn cmd_collaborations(store: &Store) -> Result<bool> {
    let edges = store.list_collaborations()?;
    if edges.is_empty() {
        println!("No collaborations found.");
        return Ok(true);
    }

    for edge in edges {
        let view = if edge.is_approved(Direction::View) { "view" } else { "-" };
        let edit = if edge.is_approved(Direction::Edit) { "edit" } else { "-" };
        println!("{}  [{view} {edit}]", edge.id);
        for member in &edge.members {
            let name = store
                .principal(&member.principal)
                .map(|p| p.display_name)
                .unwrap_or_else(|_| member.principal.to_string());
            println!(
                "    {name:<20}  view={:<13}  edit={}",
                member.state(Direction::View),
                member.state(Direction::Edit)
            );
        }
    }
    Ok(true)
}

fn cmd_set_state(
    store: &Store,
    collaboration: &Uuid,
    member: &str,
    direction: &str,
    state: &str,
) -> Result<bool> {
    let member: PrincipalId = member.parse()?;
    let direction: Direction = direction.parse()?;
    let state: CollaborationState = state.parse()?;
    let edge = store.set_collaboration_state(collaboration, &member, direction, state)?;
    println!(
        "Collaboration {}: view {}, edit {}",
        edge.id,
        if edge.is_approved(Direction::View) { "approved" } else { "not approved" },
        if edge.is_approved(Direction::Edit) { "approved" } else { "not approved" },
    );
    Ok(true)
}

fn cmd_check(store: &Store, check: CheckCommand) -> Result<bool> {
    let directory = store.directory()?;
    let policy = Policy::new(&directory);

    let (target, gate, kind, resource) = match check {
        CheckCommand::Module { target, kind } => (target, Gate::Module, parse_kind(&kind)?, None),
        CheckCommand::Object { target, resource } => {
            let record = find_resource(&directory, &resource)?;
            (target, Gate::Object, record.kind, Some(record))
        }
        CheckCommand::Remote {
            target,
            kind,
            resource,
        } => {
            let kind = parse_kind(&kind)?;
            let record = resource
                .map(|id| find_resource(&directory, &id))
                .transpose()?;
            if let Some(record) = &record {
                if record.kind != kind {
                    return Err(Error::InvalidArgument(format!(
                        "resource {} is a {}, not a {kind}",
                        record.id, record.kind
                    )));
                }
            }
            (target, Gate::Remote, kind, record)
        }
    };

    let principal = resolve_principal(&directory, &target.principal)?;
    let op: Operation = target.op.parse()?;

    let decision = decide(&policy, &principal, gate, kind, resource.as_ref(), op);

    store.append_audit(&AuditEntry::new(
        principal.id,
        gate,
        kind,
        resource.as_ref().map(|r| r.id),
        op,
        &decision,
    ))?;

    match &decision {
        Decision::Allow => println!("allowed"),
        Decision::Deny(denial) => println!("denied ({}): {denial}", denial.status_code()),
    }
    Ok(decision.is_allowed())
}

/// Run the gate a check command asked for, explaining denials of stored resources.
fn decide(
    policy: &Policy<'_, Directory>,
    principal: &Principal,
    gate: Gate,
    kind: ResourceKind,
    resource: Option<&ResourceRecord>,
    op: Operation,
) -> Decision {
    match (gate, resource) {
        (Gate::Module, _) => policy.check_module(principal, kind, op),
        (Gate::Object, Some(record)) => policy.check_object_explained(principal, record, op),
        (Gate::Remote, Some(record)) => {
            let decision = policy.check_module_or_object(principal, kind, Some(record), op);
            if decision.is_allowed() {
                decision
            } else {
                decision.with_message(explain_denial(policy, principal, record, op))
            }
        }
        (Gate::Remote, None) | (Gate::Object, None) => {
            policy.check_module_or_object::<ResourceRecord>(principal, kind, None, op)
        }
    }
}

fn cmd_audit(store: &Store, limit: usize, principal: Option<&str>) -> Result<bool> {
    let entries = match principal {
        Some(p) => {
            let id = if p == ANONYMOUS {
                PrincipalId::anonymous()
            } else {
                p.parse()?
            };
            let mut entries = store.audit_for_principal(&id)?;
            entries.reverse();
            entries.truncate(limit);
            entries
        }
        None => store.recent_audit(limit)?,
    };

    if entries.is_empty() {
        println!("No decisions recorded.");
        return Ok(true);
    }

    for entry in entries {
        print_entry(&entry);
    }
    Ok(true)
}

fn print_entry(entry: &AuditEntry) {
    let time = Local
        .from_utc_datetime(&entry.timestamp.naive_utc())
        .format("%Y-%m-%d %H:%M:%S");
    let target = entry
        .resource
        .map(|r| format!("{} {r}", entry.kind))
        .unwrap_or_else(|| entry.kind.to_string());
    let outcome = if entry.allowed { "ALLOW" } else { "DENY" };
    print!(
        "[{time}] {outcome:<5} {:<6} {} {} {target}",
        entry.gate, entry.principal, entry.operation
    );
    match &entry.reason {
        Some(reason) => println!(" ({reason})"),
        None => println!(),
    }
}

fn parse_kind(kind: &str) -> Result<ResourceKind> {
    Ok(kind.parse()?)
}

fn find_resource(directory: &Directory, id: &str) -> Result<ResourceRecord> {
    let id: ResourceId = id.parse()?;
    directory
        .resource(&id)
        .cloned()
        .ok_or_else(|| Error::Storage(storage::Error::NotFound(format!("resource {id}"))))
}

fn resolve_principal(directory: &Directory, arg: &str) -> Result<Principal> {
    if arg == ANONYMOUS {
        return Ok(Principal::anonymous());
    }
    let id: PrincipalId = arg.parse()?;
    directory
        .principal(&id)
        .ok_or_else(|| Error::Storage(storage::Error::NotFound(format!("principal {id}"))))
}

fn open_store(config: &Config) -> Result<Store> {
    let path = &config.storage.path;
    if !path.exists() {
        return Err(Error::DatabaseNotFound { path: path.clone() });
    }
    Ok(Store::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use policy::Capability;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_object() {
        let cli = Cli::try_parse_from([
            "houston",
            "check",
            "object",
            "--principal",
            "anonymous",
            "--resource",
            "00000000-0000-0000-0000-00000000000a",
            "--op",
            "read",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Check(CheckCommand::Object { .. })));
    }

    #[test]
    fn test_remote_gate_explains_only_denials() {
        let owner = Principal::new("Owner").with(Capability::Active);
        let stranger = Principal::new("Stranger").with(Capability::Active);
        let mut directory = Directory::new();
        directory.add_principal(owner.clone());
        directory.add_principal(stranger.clone());
        let policy = Policy::new(&directory);
        let sighting = ResourceRecord::new(ResourceKind::Sighting, owner.id);
        let decide_for = |who: &Principal| {
            decide(&policy, who, Gate::Remote, ResourceKind::Sighting, Some(&sighting), Operation::Write)
        };

        assert_eq!(decide_for(&owner), Decision::Allow);
        let denied = decide_for(&stranger);
        let message = denied.denial().and_then(|d| d.message.clone()).unwrap();
        assert_eq!(
            message,
            "You have no relationship with the owner of this sighting: Owner"
        );
    }

    #[test]
    fn test_remote_gate_without_local_copy() {
        let directory = Directory::new();
        let policy = Policy::new(&directory);
        let researcher = Principal::new("r")
            .with(Capability::Active)
            .with(Capability::Researcher);

        let decision = decide(&policy, &researcher, Gate::Remote, ResourceKind::Individual, None, Operation::Read);
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_resolve_anonymous() {
        let directory = Directory::new();
        assert!(resolve_principal(&directory, "anonymous").unwrap().is_anonymous());
        assert!(resolve_principal(&directory, "nobody").is_err());
    }
}
