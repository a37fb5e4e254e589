use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named boolean flags a principal may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Active,
    Staff,
    Internal,
    Admin,
    Researcher,
    Contributor,
    UserManager,
    Exporter,
    EmailConfirmed,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::Active,
        Capability::Staff,
        Capability::Internal,
        Capability::Admin,
        Capability::Researcher,
        Capability::Contributor,
        Capability::UserManager,
        Capability::Exporter,
        Capability::EmailConfirmed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Active => "active",
            Capability::Staff => "staff",
            Capability::Internal => "internal",
            Capability::Admin => "admin",
            Capability::Researcher => "researcher",
            Capability::Contributor => "contributor",
            Capability::UserManager => "user_manager",
            Capability::Exporter => "exporter",
            Capability::EmailConfirmed => "email_confirmed",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = Error;

    /// Accepts `researcher` as well as `is_researcher`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let name = name.strip_prefix("is_").unwrap_or(name);
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| Error::Invalid(format!("unknown capability '{s}'")))
    }
}

/// An action requested against a resource class or instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
    Delete,
    ReadDebug,
    ReadPrivileged,
    ReadInternal,
    WriteInternal,
    Export,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Read,
        Operation::Write,
        Operation::Delete,
        Operation::ReadDebug,
        Operation::ReadPrivileged,
        Operation::ReadInternal,
        Operation::WriteInternal,
        Operation::Export,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
            Operation::ReadDebug => "read_debug",
            Operation::ReadPrivileged => "read_privileged",
            Operation::ReadInternal => "read_internal",
            Operation::WriteInternal => "write_internal",
            Operation::Export => "export",
        }
    }

    /// Internal operations are never granted through ownership or elevation.
    pub fn is_internal(self) -> bool {
        matches!(self, Operation::ReadInternal | Operation::WriteInternal)
    }

    /// Operations that modify data, used when phrasing denials.
    pub fn is_modifying(self) -> bool {
        matches!(
            self,
            Operation::Write | Operation::Delete | Operation::WriteInternal
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('-', "_");
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == name)
            .ok_or_else(|| Error::Invalid(format!("unknown operation '{s}'")))
    }
}
