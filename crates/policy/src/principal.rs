//! Acting principals.

use crate::{Capability, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id carried by the anonymous principal.
    pub fn anonymous() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PrincipalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|e| Error::Invalid(format!("invalid principal id '{s}': {e}")))
    }
}

/// The actor a check is evaluated for.
///
/// A principal is a capability snapshot taken at authentication time and is
/// never modified by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
}

impl Principal {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(),
            display_name: display_name.into(),
            capabilities: BTreeSet::new(),
        }
    }

    /// The unauthenticated principal.
    pub fn anonymous() -> Self {
        Self {
            id: PrincipalId::anonymous(),
            display_name: "anonymous".to_string(),
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_id(mut self, id: PrincipalId) -> Self {
        self.id = id;
        self
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == PrincipalId::anonymous()
    }

    pub fn has(&self, capability: Capability) -> bool {
        !self.is_anonymous() && self.capabilities.contains(&capability)
    }

    /// True if any of `capabilities` is held.
    pub fn has_any(&self, capabilities: &[Capability]) -> bool {
        capabilities.iter().any(|c| self.has(*c))
    }

    pub fn is_active(&self) -> bool {
        self.has(Capability::Active)
    }

    pub fn is_admin(&self) -> bool {
        self.has(Capability::Admin)
    }

    pub fn is_researcher(&self) -> bool {
        self.has(Capability::Researcher)
    }

    /// Staff and internal principals have broad cross-object access.
    pub fn is_privileged(&self) -> bool {
        self.has(Capability::Staff) || self.has(Capability::Internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_holds_nothing() {
        let mut anon = Principal::anonymous();
        anon.capabilities.insert(Capability::Admin);
        assert!(anon.is_anonymous());
        assert!(!anon.is_admin());
    }

    #[test]
    fn test_privileged_is_staff_or_internal() {
        let staff = Principal::new("s").with(Capability::Staff);
        let internal = Principal::new("i").with(Capability::Internal);
        let admin = Principal::new("a").with(Capability::Admin);
        assert!(staff.is_privileged());
        assert!(internal.is_privileged());
        assert!(!admin.is_privileged());
    }

    #[test]
    fn test_principal_id_parse() {
        let id = PrincipalId::new();
        assert_eq!(id.to_string().parse::<PrincipalId>().unwrap(), id);
        assert!("not-a-uuid".parse::<PrincipalId>().is_err());
    }
}
