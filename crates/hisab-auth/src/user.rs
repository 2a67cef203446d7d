//! Authenticated user identity
//!
//! The identity payload comes from a login response or from local storage.
//! It is validated once, here, into a [`User`]; everything downstream works
//! with typed roles and permission tokens.

use crate::error::IdentityError;
use crate::permission::{Permission, PermissionSet};
use crate::role::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned user identifier
///
/// Accepts numeric or string ids on input; always serialized as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawUserId", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create identifier
    ///
    /// # Errors
    /// - `IdentityError::MissingField` if the id is empty
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdentityError::MissingField("id"));
        }
        Ok(Self(id))
    }

    /// Identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Number(i64),
    Text(String),
}

impl TryFrom<RawUserId> for UserId {
    type Error = IdentityError;

    fn try_from(raw: RawUserId) -> Result<Self, Self::Error> {
        match raw {
            RawUserId::Number(n) => UserId::new(n.to_string()),
            RawUserId::Text(s) => UserId::new(s),
        }
    }
}

/// Authenticated user as seen by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawUser")]
pub struct User {
    /// Server identifier
    pub id: UserId,
    /// Login name
    pub username: String,
    /// Name shown in the interface
    pub display_name: String,
    /// Assigned role
    pub role: Role,
    /// Granted permissions
    pub permissions: PermissionSet,
}

impl User {
    /// Create user with no permissions
    ///
    /// # Errors
    /// - `IdentityError::MissingField` if `username` is empty
    pub fn new(id: UserId, username: impl Into<String>, role: Role) -> Result<Self, IdentityError> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(IdentityError::MissingField("username"));
        }
        Ok(Self {
            id,
            display_name: username.clone(),
            username,
            role,
            permissions: PermissionSet::new(),
        })
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// With granted permissions
    #[must_use]
    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }

    /// Parse and validate a JSON identity payload
    ///
    /// # Errors
    /// - `IdentityError::Malformed` if the payload is not a user object
    /// - `IdentityError::UnknownRole` / `InvalidPermission` on bad values
    pub fn from_json(payload: &str) -> Result<Self, IdentityError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Validate an already-parsed JSON value
    ///
    /// # Errors
    /// Same as [`User::from_json`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, IdentityError> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Identity payload before validation
///
/// Role and permissions are kept as strings so the validation error names the
/// offending value rather than a generic serde message.
#[derive(Debug, Deserialize)]
struct RawUser {
    id: UserId,
    username: String,
    #[serde(default, alias = "displayName", alias = "name")]
    display_name: Option<String>,
    role: String,
    #[serde(default)]
    permissions: Vec<String>,
}

impl TryFrom<RawUser> for User {
    type Error = IdentityError;

    fn try_from(raw: RawUser) -> Result<Self, Self::Error> {
        let role: Role = raw.role.parse()?;
        let permissions = raw
            .permissions
            .into_iter()
            .map(Permission::new)
            .collect::<Result<PermissionSet, _>>()?;

        let user = User::new(raw.id, raw.username, role)?.with_permissions(permissions);
        Ok(match raw.display_name {
            Some(name) if !name.trim().is_empty() => user.with_display_name(name),
            _ => user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_login_payload() {
        let user = User::from_json(
            r#"{
                "id": 7,
                "username": "salma",
                "displayName": "سلمى",
                "role": "manager",
                "permissions": ["view_reports", "manage_projects"]
            }"#,
        )
        .unwrap();

        assert_eq!(user.id.as_str(), "7");
        assert_eq!(user.display_name, "سلمى");
        assert_eq!(user.role, Role::Manager);
        assert!(user.permissions.contains(&Permission::VIEW_REPORTS));
        assert!(user.permissions.contains(&Permission::MANAGE_PROJECTS));
        assert_eq!(user.permissions.len(), 2);
    }

    #[test]
    fn display_name_defaults_to_username() {
        let user = User::from_json(r#"{"id":"u1","username":"omar","role":"viewer"}"#).unwrap();
        assert_eq!(user.display_name, "omar");
        assert!(user.permissions.is_empty());
    }

    #[test]
    fn rejects_unknown_role() {
        let err = User::from_json(r#"{"id":1,"username":"x","role":"superuser"}"#).unwrap_err();
        assert!(err.to_string().contains("superuser"), "{err}");
    }

    #[test]
    fn rejects_malformed_permission() {
        let err = User::from_json(
            r#"{"id":1,"username":"x","role":"user","permissions":["View Reports"]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("View Reports"), "{err}");
    }

    #[test]
    fn rejects_empty_username_and_id() {
        assert!(User::from_json(r#"{"id":1,"username":"  ","role":"user"}"#).is_err());
        assert!(User::from_json(r#"{"id":"","username":"x","role":"user"}"#).is_err());
    }

    #[test]
    fn serialized_form_reparses() {
        let user = User::new(UserId::new("42").unwrap(), "admin", Role::Admin)
            .unwrap()
            .with_permissions([Permission::MANAGE_USERS]);
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(User::from_json(&json).unwrap(), user);
    }
}
