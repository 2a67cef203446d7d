//! Hisab query layer
//!
//! Read-through caching of server collections with write-then-invalidate
//! mutations.
//!
//! # Architecture
//!
//! ```text
//! QueryClient ──get/refetch──► QueryCache (moka, per-key coalescing) ──miss──► Transport
//!      │                            ▲
//!      └──mutate──► MutationDispatcher ──write──► Transport
//!                                   └──success──► invalidate(dependents)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use hisab_query::{HttpTransport, Mutation, QueryClient, ResourceKey};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new("https://db.example.com/rest/v1", None, Duration::from_secs(30))?;
//! let client = QueryClient::with_defaults(Arc::new(transport));
//!
//! let transactions = client.get(&ResourceKey::TRANSACTIONS).await?;
//! println!("{} transactions", transactions.len());
//!
//! // Invalidates transactions, dashboard and projects on success
//! client
//!     .mutate(Mutation::create(ResourceKey::TRANSACTIONS, serde_json::json!({"amount": 250})))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod catalog;
pub mod client;
pub mod error;
pub mod key;
pub mod mutation;
pub mod transport;

// Re-exports for convenience
pub use cache::{CacheEntry, CacheStats, EntryState, FreshnessWindow, QueryCache};
pub use catalog::{RecordPath, ResourceCatalog, ResourceSpec};
pub use client::QueryClient;
pub use error::{QueryError, QueryResult, TransportError};
pub use key::ResourceKey;
pub use mutation::{Mutation, MutationDispatcher, MutationKind};
pub use transport::{HttpTransport, Method, Transport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for data access
    pub use crate::{
        CacheEntry, EntryState, Mutation, QueryClient, QueryError, ResourceKey, Transport,
        TransportError,
    };
}
