//! User roles
//!
//! Roles are a closed set and are matched exactly. There is no hierarchy:
//! `Admin` does not imply `Manager`, and call sites that should admit both
//! must list both.

use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse-grained user classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full administrative access
    Admin,
    /// Manages projects, staff and finances
    Manager,
    /// Regular bookkeeping user
    User,
    /// Read-only access
    Viewer,
}

impl Role {
    /// Every known role
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::User, Role::Viewer];

    /// Wire name of the role
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| IdentityError::UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_roundtrips_wire_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn role_parse_is_exact() {
        assert!("Admin".parse::<Role>().is_err());
        assert!(" admin".parse::<Role>().is_err());
        assert!(matches!(
            "owner".parse::<Role>(),
            Err(IdentityError::UnknownRole(s)) if s == "owner"
        ));
    }

    #[test]
    fn role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Manager).unwrap();
        assert_eq!(json, "\"manager\"");
        let role: Role = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, Role::Viewer);
    }
}
