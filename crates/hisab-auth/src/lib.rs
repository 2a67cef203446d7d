//! Hisab authorization layer
//!
//! Decides what the signed-in user may see and do.
//!
//! # Components
//!
//! - **Identity**: [`User`], [`Role`], [`Permission`], validated where the
//!   payload is deserialized
//! - **Evaluator**: pure checks in [`evaluator`], all failing closed
//! - **Guard**: [`AccessGuard`] composes requirement kinds with AND and picks
//!   content, fallback or the default notice
//! - **Session**: [`SessionStore`] holds and persists the current user
//!
//! # Example
//!
//! ```rust
//! use hisab_auth::{evaluator, AccessRequirement, Permission, Role, SessionStore};
//!
//! let session = SessionStore::in_memory();
//! let user = session
//!     .sign_in_json(r#"{"user":{"id":1,"username":"huda","role":"manager","permissions":["view_reports"]}}"#)
//!     .unwrap();
//!
//! assert!(evaluator::has_permission(Some(&*user), &Permission::VIEW_REPORTS));
//! assert!(!evaluator::has_any_role(Some(&*user), &[Role::Admin]));
//!
//! let requirement = AccessRequirement::new().roles([Role::Admin, Role::Manager]);
//! assert!(requirement.evaluate(session.current().as_deref()).is_granted());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod evaluator;
pub mod guard;
pub mod permission;
pub mod role;
pub mod session;
pub mod user;

// Re-exports for convenience
pub use error::{IdentityError, SessionError, SessionResult};
pub use evaluator::{has_all_permissions, has_any_permission, has_any_role, has_permission, has_role};
pub use guard::{
    AccessDecision, AccessDeniedNotice, AccessGuard, AccessRequirement, DenialReason,
    PermissionMatch, Rendered,
};
pub use permission::{Permission, PermissionSet};
pub use role::Role;
pub use session::{FileStorage, IdentityStorage, MemoryStorage, SessionStore};
pub use user::{User, UserId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for authorization checks
    pub use crate::{
        AccessDecision, AccessGuard, AccessRequirement, Permission, PermissionMatch, Rendered,
        Role, SessionStore, User,
    };
}
