//! Session identity store
//!
//! Holds the signed-in user for the lifetime of the application root and
//! mirrors it to an [`IdentityStorage`] so the session survives restarts.
//! The persisted form is the serialized [`User`]; it is re-validated on
//! every restore.

use crate::error::{SessionError, SessionResult};
use crate::user::User;
use parking_lot::{Mutex, RwLock};
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Persistence backend for the serialized identity
pub trait IdentityStorage: Debug + Send + Sync {
    /// Read the stored payload, if any
    fn load(&self) -> SessionResult<Option<String>>;

    /// Replace the stored payload
    fn save(&self, payload: &str) -> SessionResult<()>;

    /// Remove the stored payload
    fn clear(&self) -> SessionResult<()>;
}

/// In-process storage; lost on exit
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    /// Create empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage holding `payload`
    #[must_use]
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(payload.into())),
        }
    }
}

impl IdentityStorage for MemoryStorage {
    fn load(&self) -> SessionResult<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, payload: &str) -> SessionResult<()> {
        *self.slot.lock() = Some(payload.to_string());
        Ok(())
    }

    fn clear(&self) -> SessionResult<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create storage at `path`; the file is created on first save
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStorage for FileStorage {
    fn load(&self) -> SessionResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::io_error(&self.path, e)),
        }
    }

    fn save(&self, payload: &str) -> SessionResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SessionError::io_error(parent, e))?;
        }
        fs::write(&self.path, payload).map_err(|e| SessionError::io_error(&self.path, e))
    }

    fn clear(&self) -> SessionResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::io_error(&self.path, e)),
        }
    }
}

/// Current signed-in user plus its persistence
#[derive(Debug)]
pub struct SessionStore {
    storage: Arc<dyn IdentityStorage>,
    current: RwLock<Option<Arc<User>>>,
}

impl SessionStore {
    /// Create an empty session over `storage` without reading it
    #[must_use]
    pub fn new(storage: Arc<dyn IdentityStorage>) -> Self {
        Self {
            storage,
            current: RwLock::new(None),
        }
    }

    /// Empty session backed by [`MemoryStorage`]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Restore the persisted session at startup
    ///
    /// A payload that no longer validates is discarded and the session starts
    /// empty.
    ///
    /// # Errors
    /// - `SessionError::Io` if the storage cannot be read or a corrupt payload
    ///   cannot be removed
    pub fn restore(storage: Arc<dyn IdentityStorage>) -> SessionResult<Self> {
        let store = Self::new(storage);
        if let Some(payload) = store.storage.load()? {
            match User::from_json(&payload) {
                Ok(user) => {
                    tracing::debug!(user = %user.username, role = %user.role, "restored session");
                    *store.current.write() = Some(Arc::new(user));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding invalid persisted identity");
                    store.storage.clear()?;
                }
            }
        }
        Ok(store)
    }

    /// Sign `user` in and persist it
    ///
    /// # Errors
    /// - `SessionError::Encode` / `SessionError::Io` if persisting fails; the
    ///   in-memory session is left unchanged in that case
    pub fn sign_in(&self, user: User) -> SessionResult<Arc<User>> {
        let payload = serde_json::to_string(&user)?;
        self.storage.save(&payload)?;

        let user = Arc::new(user);
        *self.current.write() = Some(Arc::clone(&user));
        tracing::info!(user = %user.username, role = %user.role, "signed in");
        Ok(user)
    }

    /// Validate a login response and sign its user in
    ///
    /// Accepts either `{"user": {...}}` or a bare user object.
    ///
    /// # Errors
    /// - `SessionError::Identity` if the payload does not validate
    /// - Same as [`SessionStore::sign_in`] otherwise
    pub fn sign_in_json(&self, payload: &str) -> SessionResult<Arc<User>> {
        let mut value: serde_json::Value =
            serde_json::from_str(payload).map_err(crate::IdentityError::from)?;
        let user_value = if value.get("user").is_some() {
            value["user"].take()
        } else {
            value
        };
        let user = User::from_value(user_value)?;
        self.sign_in(user)
    }

    /// Sign out and clear persisted identity
    ///
    /// # Errors
    /// - `SessionError::Io` if the storage cannot be cleared; the in-memory
    ///   session is cleared regardless
    pub fn sign_out(&self) -> SessionResult<()> {
        let previous = self.current.write().take();
        if let Some(user) = previous {
            tracing::info!(user = %user.username, "signed out");
        }
        self.storage.clear()
    }

    /// Signed-in user, if any
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<Arc<User>> {
        self.current.read().clone()
    }

    /// Check if a user is signed in
    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }
}
