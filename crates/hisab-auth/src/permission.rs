//! Permission tokens and permission sets
//!
//! A [`Permission`] is an opaque capability name such as `manage_users`.
//! The set of tokens is open (the server may grant new ones), but the syntax
//! is checked when a token enters the process, so a typo in a payload fails
//! at deserialization instead of silently never matching.

use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Maximum token length in bytes
pub const MAX_TOKEN_LEN: usize = 64;

/// Single grantable capability
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Manage user accounts and their grants
    pub const MANAGE_USERS: Permission = Permission::from_static("manage_users");
    /// View financial reports and the dashboard
    pub const VIEW_REPORTS: Permission = Permission::from_static("view_reports");
    /// Create, edit and archive projects
    pub const MANAGE_PROJECTS: Permission = Permission::from_static("manage_projects");
    /// View projects
    pub const VIEW_PROJECTS: Permission = Permission::from_static("view_projects");
    /// Record income and expense transactions
    pub const MANAGE_TRANSACTIONS: Permission = Permission::from_static("manage_transactions");
    /// View transactions
    pub const VIEW_TRANSACTIONS: Permission = Permission::from_static("view_transactions");
    /// Manage employees and salaries
    pub const MANAGE_EMPLOYEES: Permission = Permission::from_static("manage_employees");
    /// Upload and delete documents
    pub const MANAGE_DOCUMENTS: Permission = Permission::from_static("manage_documents");
    /// View documents
    pub const VIEW_DOCUMENTS: Permission = Permission::from_static("view_documents");
    /// Change application settings
    pub const MANAGE_SETTINGS: Permission = Permission::from_static("manage_settings");

    /// Tokens the application itself checks for
    pub const WELL_KNOWN: [Permission; 10] = [
        Permission::MANAGE_USERS,
        Permission::VIEW_REPORTS,
        Permission::MANAGE_PROJECTS,
        Permission::VIEW_PROJECTS,
        Permission::MANAGE_TRANSACTIONS,
        Permission::VIEW_TRANSACTIONS,
        Permission::MANAGE_EMPLOYEES,
        Permission::MANAGE_DOCUMENTS,
        Permission::VIEW_DOCUMENTS,
        Permission::MANAGE_SETTINGS,
    ];

    // Unchecked; only used for the constants above, which are covered by tests.
    const fn from_static(token: &'static str) -> Self {
        Self(Cow::Borrowed(token))
    }

    /// Parse and validate a token
    ///
    /// # Errors
    /// - `IdentityError::InvalidPermission` if the token is empty, too long,
    ///   does not start with a lowercase letter, or contains anything other
    ///   than lowercase ASCII letters, digits and `_`
    pub fn new(token: impl Into<String>) -> Result<Self, IdentityError> {
        let token = token.into();
        validate(&token)?;
        Ok(Self(Cow::Owned(token)))
    }

    /// Token text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(token: &str) -> Result<(), IdentityError> {
    let Some(first) = token.chars().next() else {
        return Err(IdentityError::invalid_permission(token, "empty token"));
    };
    if token.len() > MAX_TOKEN_LEN {
        return Err(IdentityError::invalid_permission(token, "token too long"));
    }
    if !first.is_ascii_lowercase() {
        return Err(IdentityError::invalid_permission(
            token,
            "must start with a lowercase letter",
        ));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(IdentityError::invalid_permission(
            token,
            "only lowercase letters, digits and '_' are allowed",
        ));
    }
    Ok(())
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Permission {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Permission {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.0.into_owned()
    }
}

/// Unordered set of granted permissions
///
/// Serialized as a JSON list. Iteration order is sorted so persisted
/// payloads are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    inner: BTreeSet<Permission>,
}

impl PermissionSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a permission; returns `false` if it was already present
    #[inline]
    pub fn insert(&mut self, permission: Permission) -> bool {
        self.inner.insert(permission)
    }

    /// Membership test
    #[inline]
    #[must_use]
    pub fn contains(&self, permission: &Permission) -> bool {
        self.inner.contains(permission)
    }

    /// True iff at least one of `permissions` is granted
    ///
    /// An empty list yields `false`.
    #[must_use]
    pub fn contains_any<'a, I>(&self, permissions: I) -> bool
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        permissions.into_iter().any(|p| self.contains(p))
    }

    /// True iff every one of `permissions` is granted
    ///
    /// An empty list yields `false`, not vacuous truth.
    #[must_use]
    pub fn contains_all<'a, I>(&self, permissions: I) -> bool
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        let mut seen_any = false;
        for p in permissions {
            if !self.contains(p) {
                return false;
            }
            seen_any = true;
        }
        seen_any
    }

    /// Number of granted permissions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if no permission is granted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate granted permissions in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.inner.iter()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PermissionSet {
    type Item = Permission;
    type IntoIter = std::collections::btree_set::IntoIter<Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::collections::btree_set::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_tokens_are_valid() {
        for permission in Permission::WELL_KNOWN {
            assert!(
                Permission::new(permission.as_str()).is_ok(),
                "{permission} should pass validation"
            );
        }
    }

    #[test]
    fn parsed_token_equals_constant() {
        let parsed: Permission = "manage_users".parse().unwrap();
        assert_eq!(parsed, Permission::MANAGE_USERS);
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["", "Manage_users", "manage users", "1st_token", "view-reports", "_x"] {
            assert!(Permission::new(bad).is_err(), "'{bad}' should be rejected");
        }
        let long = "a".repeat(MAX_TOKEN_LEN + 1);
        assert!(Permission::new(long).is_err());
    }

    #[test]
    fn accepts_tokens_outside_well_known_list() {
        let custom = Permission::new("export_ledger_v2").unwrap();
        assert_eq!(custom.as_str(), "export_ledger_v2");
    }

    #[test]
    fn deserialize_rejects_typos() {
        let result: Result<Permission, _> = serde_json::from_str("\"Manage-Users\"");
        assert!(result.is_err());
    }

    #[test]
    fn set_empty_combinators_fail_closed() {
        let set: PermissionSet = [Permission::VIEW_REPORTS].into_iter().collect();
        let none: [Permission; 0] = [];
        assert!(!set.contains_any(&none));
        assert!(!set.contains_all(&none));
    }

    #[test]
    fn set_any_and_all() {
        let set: PermissionSet = [Permission::VIEW_REPORTS, Permission::VIEW_PROJECTS]
            .into_iter()
            .collect();

        assert!(set.contains_any(&[Permission::MANAGE_USERS, Permission::VIEW_REPORTS]));
        assert!(!set.contains_all(&[Permission::MANAGE_USERS, Permission::VIEW_REPORTS]));
        assert!(set.contains_all(&[Permission::VIEW_PROJECTS, Permission::VIEW_REPORTS]));
    }

    #[test]
    fn set_serializes_sorted() {
        let set: PermissionSet = [Permission::VIEW_REPORTS, Permission::MANAGE_USERS]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["manage_users","view_reports"]"#);
    }

    #[test]
    fn set_moves_into_another_set() {
        let set: PermissionSet = [Permission::MANAGE_USERS, Permission::VIEW_REPORTS]
            .into_iter()
            .collect();
        let empty = PermissionSet::new();
        let merged: PermissionSet = empty.into_iter().chain(set).collect();
        assert_eq!(
            merged.iter().cloned().collect::<Vec<_>>(),
            vec![Permission::MANAGE_USERS, Permission::VIEW_REPORTS]
        );
    }
}
