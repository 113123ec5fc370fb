//! Session finalization and storage.
//!
//! DESIGN
//! ======
//! [`SessionFinalizer`] is the only writer of the current [`Session`]. It is
//! invoked solely for granted outcomes and persists through a
//! [`SessionStore`], so the flow never depends on where sessions live.
//! Finalizing twice with the same input overwrites storage with identical
//! content.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::api::types::{AuthError, Role};
use crate::outcome::Profile;

/// An authenticated session issued by the portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub profile: Profile,
    pub role: Role,
}

// =============================================================================
// STORE
// =============================================================================

/// Persistence for the single active session.
pub trait SessionStore: Send + Sync {
    /// Replace any stored session with `session`.
    fn save(&self, session: &Session) -> Result<(), AuthError>;

    /// Load the stored session, if any.
    fn load(&self) -> Result<Option<Session>, AuthError>;

    /// Forget the stored session. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), AuthError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Session>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn save(&self, session: &Session) -> Result<(), AuthError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file store used by the command-line client.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStore for FileStore {
    fn save(&self, session: &Session) -> Result<(), AuthError> {
        let json = serde_json::to_vec_pretty(session).map_err(|e| AuthError::Storage(e.to_string()))?;
        // Write-then-rename so a crash never leaves a half-written session.
        let tmp = self.temp_path();
        write_private(&tmp, &json).map_err(|e| storage_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, &e))
    }

    fn load(&self) -> Result<Option<Session>, AuthError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&self.path, &e)),
        }
    }
}

/// Write `bytes` to `path` readable by the owner only.
#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its bits.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn storage_error(path: &Path, error: &std::io::Error) -> AuthError {
    AuthError::Storage(format!("{}: {error}", path.display()))
}

// =============================================================================
// FINALIZER
// =============================================================================

pub struct SessionFinalizer {
    store: Arc<dyn SessionStore>,
    current: Option<Session>,
}

impl SessionFinalizer {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store, current: None }
    }

    /// Persist a granted session and make it current.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot write; the previous session is
    /// left in place.
    pub fn finalize(&mut self, token: &str, profile: Profile, role: Role) -> Result<Session, AuthError> {
        let session = Session { token: token.to_owned(), profile, role };
        self.store.save(&session)?;
        tracing::info!(role = ?role, user = session.profile.display_name().unwrap_or("unknown"), "session established");
        self.current = Some(session.clone());
        Ok(session)
    }

    /// Load a previously persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn restore(&mut self) -> Result<Option<&Session>, AuthError> {
        self.current = self.store.load()?;
        Ok(self.current.as_ref())
    }

    #[must_use]
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Destroy the current session locally and in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub fn clear(&mut self) -> Result<(), AuthError> {
        self.current = None;
        self.store.clear()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
