//! Access guard
//!
//! The single place where permission and role requirements are composed.
//! An [`AccessRequirement`] may name any combination of:
//! - a single permission
//! - a permission list, matched with [`PermissionMatch::Any`] or [`PermissionMatch::All`]
//! - a single role
//! - a role list (any-of)
//!
//! The decision is the logical AND of every kind that is specified. Kinds
//! that are not specified do not participate. An absent user is always
//! denied; a present user facing a requirement with no kinds is granted.
//!
//! # Example
//!
//! ```rust
//! use hisab_auth::{AccessGuard, AccessRequirement, Permission, Rendered, Role};
//!
//! let guard = AccessGuard::new(
//!     AccessRequirement::new()
//!         .permission(Permission::VIEW_REPORTS)
//!         .role(Role::Admin),
//! );
//!
//! let page = guard.render(None, || "reports", None::<fn() -> &'static str>);
//! assert!(matches!(page, Rendered::Denied(_)));
//! ```

use crate::evaluator;
use crate::permission::Permission;
use crate::role::Role;
use crate::user::User;
use std::fmt;

/// How a permission list is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionMatch {
    /// At least one listed permission
    #[default]
    Any,
    /// Every listed permission
    All,
}

/// Declared access requirement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRequirement {
    permission: Option<Permission>,
    permissions: Option<(Vec<Permission>, PermissionMatch)>,
    role: Option<Role>,
    roles: Option<Vec<Role>>,
}

impl AccessRequirement {
    /// Requirement with no kinds specified
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a single permission
    #[inline]
    #[must_use]
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Require a permission list
    #[must_use]
    pub fn permissions(
        mut self,
        permissions: impl IntoIterator<Item = Permission>,
        matching: PermissionMatch,
    ) -> Self {
        self.permissions = Some((permissions.into_iter().collect(), matching));
        self
    }

    /// Require an exact role
    #[inline]
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Require one of the listed roles
    #[must_use]
    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = Some(roles.into_iter().collect());
        self
    }

    /// Check if no requirement kind is specified
    #[inline]
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.permission.is_none()
            && self.permissions.is_none()
            && self.role.is_none()
            && self.roles.is_none()
    }

    /// Evaluate against `user`
    ///
    /// Kinds are checked in declaration order (permission, permission list,
    /// role, role list); the reason reports the first one that fails.
    #[must_use]
    pub fn evaluate(&self, user: Option<&User>) -> AccessDecision {
        if user.is_none() {
            return AccessDecision::Denied(DenialReason::NotAuthenticated);
        }

        if let Some(permission) = &self.permission {
            if !evaluator::has_permission(user, permission) {
                return AccessDecision::Denied(DenialReason::MissingPermission(permission.clone()));
            }
        }

        if let Some((permissions, matching)) = &self.permissions {
            let ok = match matching {
                PermissionMatch::Any => evaluator::has_any_permission(user, permissions),
                PermissionMatch::All => evaluator::has_all_permissions(user, permissions),
            };
            if !ok {
                return AccessDecision::Denied(DenialReason::MissingPermissions {
                    required: permissions.clone(),
                    matching: *matching,
                });
            }
        }

        if let Some(role) = self.role {
            if !evaluator::has_role(user, role) {
                return AccessDecision::Denied(DenialReason::RoleMismatch(vec![role]));
            }
        }

        if let Some(roles) = &self.roles {
            if !evaluator::has_any_role(user, roles) {
                return AccessDecision::Denied(DenialReason::RoleMismatch(roles.clone()));
            }
        }

        AccessDecision::Granted
    }
}

/// Why access was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// No user is signed in
    NotAuthenticated,
    /// Single required permission is missing
    MissingPermission(Permission),
    /// Permission list was not satisfied
    MissingPermissions {
        /// Listed permissions
        required: Vec<Permission>,
        /// How they were matched
        matching: PermissionMatch,
    },
    /// User role is not among the accepted roles
    RoleMismatch(Vec<Role>),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => f.write_str("not signed in"),
            Self::MissingPermission(p) => write!(f, "missing permission '{p}'"),
            Self::MissingPermissions { required, matching } => {
                let list = required.iter().map(Permission::as_str).collect::<Vec<_>>();
                let mode = match matching {
                    PermissionMatch::Any => "any of",
                    PermissionMatch::All => "all of",
                };
                write!(f, "requires {mode} [{}]", list.join(", "))
            }
            Self::RoleMismatch(roles) => {
                let list = roles.iter().map(Role::as_str).collect::<Vec<_>>();
                write!(f, "role must be one of [{}]", list.join(", "))
            }
        }
    }
}

/// Outcome of evaluating a requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access allowed
    Granted,
    /// Access denied
    Denied(DenialReason),
}

impl AccessDecision {
    /// Check if access is allowed
    #[inline]
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Default notice shown when no fallback is supplied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDeniedNotice {
    /// User-facing message
    pub message: &'static str,
    /// Why access was denied
    pub reason: DenialReason,
}

impl AccessDeniedNotice {
    /// Default user-facing message
    pub const DEFAULT_MESSAGE: &'static str = "ليس لديك صلاحية للوصول إلى هذه الصفحة";

    /// Create notice for reason
    #[inline]
    #[must_use]
    pub fn new(reason: DenialReason) -> Self {
        Self {
            message: Self::DEFAULT_MESSAGE,
            reason,
        }
    }
}

impl fmt::Display for AccessDeniedNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.reason)
    }
}

/// What a guard rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<T> {
    /// Access granted; the guarded content
    Content(T),
    /// Access denied; the caller-supplied fallback
    Fallback(T),
    /// Access denied and no fallback was supplied
    Denied(AccessDeniedNotice),
}

impl<T> Rendered<T> {
    /// Guarded content, if access was granted
    #[inline]
    pub fn content(self) -> Option<T> {
        match self {
            Self::Content(t) => Some(t),
            _ => None,
        }
    }
}

/// Rendering gate around a requirement
///
/// Holds no state besides the requirement; the decision is recomputed on
/// every call so a changed user or requirement takes effect immediately.
#[derive(Debug, Clone, Default)]
pub struct AccessGuard {
    requirement: AccessRequirement,
}

impl AccessGuard {
    /// Create guard for requirement
    #[inline]
    #[must_use]
    pub fn new(requirement: AccessRequirement) -> Self {
        Self { requirement }
    }

    /// Declared requirement
    #[inline]
    #[must_use]
    pub fn requirement(&self) -> &AccessRequirement {
        &self.requirement
    }

    /// Evaluate the requirement for `user`
    #[inline]
    #[must_use]
    pub fn decide(&self, user: Option<&User>) -> AccessDecision {
        self.requirement.evaluate(user)
    }

    /// Render `content` if allowed, otherwise `fallback` or the default notice
    ///
    /// Only the branch that is chosen is invoked.
    pub fn render<T, C, F>(&self, user: Option<&User>, content: C, fallback: Option<F>) -> Rendered<T>
    where
        C: FnOnce() -> T,
        F: FnOnce() -> T,
    {
        match self.decide(user) {
            AccessDecision::Granted => Rendered::Content(content()),
            AccessDecision::Denied(reason) => {
                tracing::debug!(%reason, "access denied");
                match fallback {
                    Some(fallback) => Rendered::Fallback(fallback()),
                    None => Rendered::Denied(AccessDeniedNotice::new(reason)),
                }
            }
        }
    }
}
