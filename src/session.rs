//! Session Store: a single persisted slot holding the current auth token.
//!
//! Expiry is lazy. Every [`SessionStore::get`] compares the token's
//! `expires_at` with the clock and deletes an expired or unreadable value
//! before reporting the slot as empty. There is no background sweep.

use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::model::SessionToken;

/// The one key the store ever uses.
pub const SESSION_KEY: &str = "daymare.session";

/// Default lifetime of a stored token.
pub const DEFAULT_TTL_DAYS: i64 = 7;

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE BACKENDS
// ═══════════════════════════════════════════════════════════════════════════════

/// String key/value persistence in the manner of browser local storage.
pub trait SlotStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One file per key inside a directory. Survives process restarts.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe_name = key.replace(['/', '\\', ':'], "_");
        self.dir.join(format!("{}.json", safe_name))
    }
}

impl SlotStorage for FileStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        // Readers never observe a partially written slot.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(tmp, path)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStorage for MemoryStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION STORE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct SessionStore {
    storage: Rc<dyn SlotStorage>,
    clock: Rc<dyn Clock>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(storage: Rc<dyn SlotStorage>, clock: Rc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current token, or `None` when the slot is empty, expired or unreadable.
    pub fn get(&self) -> Option<SessionToken> {
        let raw = match self.storage.read(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "session slot unreadable, treating as empty");
                return None;
            }
        };

        let token: SessionToken = match serde_json::from_str(&raw) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "malformed session discarded");
                self.purge();
                return None;
            }
        };

        if token.is_expired(self.clock.now()) {
            debug!(expired_at = %token.expires_at, "session expired");
            self.purge();
            return None;
        }
        Some(token)
    }

    /// Stores `token`, replacing whatever the slot held.
    pub fn set(&self, token: &SessionToken) -> Result<(), SessionError> {
        let encoded = serde_json::to_string(token)?;
        self.storage.write(SESSION_KEY, &encoded)?;
        debug!(expires_at = %token.expires_at, "session stored");
        Ok(())
    }

    /// Stores `token` with an expiry of now plus `ttl`.
    pub fn set_for(&self, token: &str, ttl: Duration) -> Result<SessionToken, SessionError> {
        let session = SessionToken::new(token, self.clock.now() + ttl);
        self.set(&session)?;
        Ok(session)
    }

    /// Stores `token` with the store's default lifetime.
    pub fn set_token(&self, token: &str) -> Result<SessionToken, SessionError> {
        self.set_for(token, self.ttl)
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        self.storage.remove(SESSION_KEY)?;
        Ok(())
    }

    fn purge(&self) {
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            warn!(error = %e, "failed to remove stale session");
        }
    }
}
