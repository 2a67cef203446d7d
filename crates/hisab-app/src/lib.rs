//! Hisab application layer
//!
//! Wires configuration, the identity session and the query client into one
//! [`AppContext`], and backs the `hisab` command-line tool.
//!
//! # Example
//!
//! ```rust,no_run
//! use hisab_app::{AppContext, HisabConfig};
//! use hisab_auth::{AccessRequirement, Permission};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HisabConfig::load(None)?;
//! let ctx = AppContext::from_config(config)?;
//!
//! let reports = AccessRequirement::new().permission(Permission::VIEW_REPORTS);
//! println!("reports: {:?}", ctx.check(&reports));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod context;
pub mod error;

pub use config::{ApiConfig, CacheConfig, HisabConfig, SessionConfig, API_URL_ENV};
pub use context::AppContext;
pub use error::{AppError, AppResult, ConfigError, ConfigResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
