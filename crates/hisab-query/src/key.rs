//! Resource keys
//!
//! A [`ResourceKey`] names a logical server collection (`transactions`,
//! `projects`, ...). The cache holds at most one entry per key.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Logical name of a cached server collection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey(Cow<'static, str>);

impl ResourceKey {
    /// Income and expense transactions
    pub const TRANSACTIONS: ResourceKey = ResourceKey::from_static("transactions");
    /// Projects and their balances
    pub const PROJECTS: ResourceKey = ResourceKey::from_static("projects");
    /// Employees
    pub const EMPLOYEES: ResourceKey = ResourceKey::from_static("employees");
    /// Uploaded documents
    pub const DOCUMENTS: ResourceKey = ResourceKey::from_static("documents");
    /// User accounts
    pub const USERS: ResourceKey = ResourceKey::from_static("users");
    /// Expense categories
    pub const EXPENSE_TYPES: ResourceKey = ResourceKey::from_static("expense_types");
    /// Dashboard aggregates
    pub const DASHBOARD: ResourceKey = ResourceKey::from_static("dashboard");

    const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    /// Parse and validate a key
    ///
    /// # Errors
    /// - `QueryError::InvalidKey` unless the key is 1-64 chars of lowercase
    ///   ASCII letters, digits and `_`, starting with a letter
    pub fn new(key: impl Into<String>) -> Result<Self, QueryError> {
        let key = key.into();
        if key.is_empty() || key.len() > 64 {
            return Err(QueryError::invalid_key(key, "length must be 1-64"));
        }
        if !key.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(QueryError::invalid_key(key, "must start with a lowercase letter"));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(QueryError::invalid_key(
                key,
                "only lowercase letters, digits and '_' are allowed",
            ));
        }
        Ok(Self(Cow::Owned(key)))
    }

    /// Key text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.0.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_keys_are_valid() {
        for key in [
            ResourceKey::TRANSACTIONS,
            ResourceKey::PROJECTS,
            ResourceKey::EMPLOYEES,
            ResourceKey::DOCUMENTS,
            ResourceKey::USERS,
            ResourceKey::EXPENSE_TYPES,
            ResourceKey::DASHBOARD,
        ] {
            assert_eq!(ResourceKey::new(key.as_str()).unwrap(), key);
        }
    }

    #[test]
    fn rejects_bad_keys() {
        for bad in ["", "Transactions", "tx/list", "9lives", "with space"] {
            assert!(ResourceKey::new(bad).is_err(), "'{bad}' should be rejected");
        }
    }
}
