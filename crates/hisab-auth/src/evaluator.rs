//! Permission evaluator
//!
//! Pure functions of `(user, requirement)`. Every check fails closed: an
//! absent user is denied, and an empty requirement list is denied rather
//! than vacuously satisfied.

use crate::permission::Permission;
use crate::role::Role;
use crate::user::User;

/// True iff `user` is present and holds `permission`
#[inline]
#[must_use]
pub fn has_permission(user: Option<&User>, permission: &Permission) -> bool {
    user.is_some_and(|u| u.permissions.contains(permission))
}

/// True iff `user` is present and holds at least one of `permissions`
#[inline]
#[must_use]
pub fn has_any_permission(user: Option<&User>, permissions: &[Permission]) -> bool {
    user.is_some_and(|u| u.permissions.contains_any(permissions))
}

/// True iff `user` is present and holds every one of `permissions`
///
/// `permissions` must be non-empty for this to return `true`.
#[inline]
#[must_use]
pub fn has_all_permissions(user: Option<&User>, permissions: &[Permission]) -> bool {
    user.is_some_and(|u| u.permissions.contains_all(permissions))
}

/// True iff `user` is present and has exactly `role`
#[inline]
#[must_use]
pub fn has_role(user: Option<&User>, role: Role) -> bool {
    user.is_some_and(|u| u.role == role)
}

/// True iff `user` is present and its role is listed in `roles`
#[inline]
#[must_use]
pub fn has_any_role(user: Option<&User>, roles: &[Role]) -> bool {
    user.is_some_and(|u| roles.contains(&u.role))
}
