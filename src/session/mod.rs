//! Session credential: the bearer token and user profile held in persistent storage.
//!
//! The credential is shared by the request client and the realtime manager.
//! It is mutated only by login/logout and by the 401-triggered expiry, all of
//! which go through [`Session`] and are announced as [`SessionEvent`]s.

pub mod storage;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::auth::User;
use crate::error::StorageError;

pub use storage::{FileStorage, MemoryStorage, Storage};

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Storage key of the serialized user profile.
pub const USER_KEY: &str = "user";

/// Session lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credential was stored by login/register.
    LoggedIn,
    /// The credential was removed by an explicit logout.
    LoggedOut,
    /// The server rejected the credential; re-authentication is required.
    Expired,
}

struct Inner {
    storage: Arc<dyn Storage>,
    events: broadcast::Sender<SessionEvent>,
    /// Serializes credential mutations so compare-and-clear is atomic.
    write_guard: Mutex<()>,
}

/// Handle to the persisted session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                storage,
                events,
                write_guard: Mutex::new(()),
            }),
        }
    }

    /// An empty session on volatile storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// The stored bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.inner.storage.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// The stored user profile. A corrupt entry reads as absent.
    pub fn user(&self) -> Option<User> {
        let raw = self.inner.storage.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("Ignoring unreadable stored user profile: {}", e);
                None
            }
        }
    }

    /// Whether both the token and the profile are present.
    ///
    /// This is the startup decision; it does not contact the server.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some() && self.user().is_some()
    }

    /// Store a fresh credential and profile.
    ///
    /// Both keys are written or neither is: if either write fails, whatever
    /// was stored is removed and the session reads as logged out.
    pub fn establish(&self, token: &str, user: &User) -> Result<(), StorageError> {
        let profile = serde_json::to_string(user)?;
        {
            let _guard = self.inner.write_guard.lock();
            let stored = self
                .inner
                .storage
                .set(TOKEN_KEY, token.to_string())
                .and_then(|()| self.inner.storage.set(USER_KEY, profile));
            if let Err(e) = stored {
                self.remove_entries();
                return Err(e);
            }
        }
        self.emit(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Replace the stored profile, keeping the token.
    pub fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let profile = serde_json::to_string(user)?;
        let _guard = self.inner.write_guard.lock();
        self.inner.storage.set(USER_KEY, profile)
    }

    /// Explicit logout. Returns whether a credential was present.
    pub fn clear(&self) -> bool {
        let had_token = {
            let _guard = self.inner.write_guard.lock();
            let had_token = self.token().is_some();
            self.remove_entries();
            had_token
        };
        if had_token {
            self.emit(SessionEvent::LoggedOut);
        }
        had_token
    }

    /// Expire the session because the server rejected `rejected_token`.
    ///
    /// Only clears storage if the stored token is still the rejected one, so
    /// concurrent 401s for the same token expire the session exactly once and
    /// a 401 racing a fresh login does not wipe the new credential. Returns
    /// whether this call performed the expiry.
    pub fn expire(&self, rejected_token: Option<&str>) -> bool {
        let Some(rejected) = rejected_token else {
            return false;
        };
        {
            let _guard = self.inner.write_guard.lock();
            if self.token().as_deref() != Some(rejected) {
                return false;
            }
            self.remove_entries();
        }
        tracing::warn!("Session credential rejected by server; re-authentication required");
        self.emit(SessionEvent::Expired);
        true
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn remove_entries(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.inner.storage.remove(key) {
                tracing::error!("Failed to remove {} from session storage: {}", key, e);
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.inner.events.send(event);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
