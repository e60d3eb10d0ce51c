//! Durable session persistence.
//!
//! The in-memory [`SessionStore`](super::store::SessionStore) evaporates with
//! the process; these backends give a session the same lifetime the browser
//! original got from its cookie. Three implementations:
//!
//! - `KeyringStorage`: the record as a JSON secret in the OS keychain
//! - `FileStorage`: `session.json` under a caller-supplied directory
//! - `MemoryStorage`: in-process, for tests and embedding
//!
//! A restored record may carry a long-expired access credential. That is
//! fine: the first use goes through the normal renewal path.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;

use super::store::SessionRecord;

/// Session file name inside the storage directory.
const SESSION_FILE: &str = "session.json";

/// Keychain service name for persisted sessions.
const SERVICE_NAME: &str = "keywarden";

/// Keychain account under which the session record is stored.
const SESSION_ACCOUNT: &str = "session";

/// Where a signed-in session is kept between process runs.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<SessionRecord>>;
    fn save(&self, record: &SessionRecord) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<SessionRecord>> {
        (**self).load()
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        (**self).save(record)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

// ===== OS keychain =====

/// Stores the serialized record as a keychain secret.
pub struct KeyringStorage;

impl KeyringStorage {
    pub fn new() -> Self {
        Self
    }

    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, SESSION_ACCOUNT).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for KeyringStorage {
    fn load(&self) -> Result<Option<SessionRecord>> {
        let entry = Self::entry()?;
        match entry.get_password() {
            Ok(secret) => {
                let record = serde_json::from_str(&secret)
                    .context("Failed to parse stored session record")?;
                Ok(Some(record))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let secret = serde_json::to_string(record)?;
        Self::entry()?
            .set_password(&secret)
            .context("Failed to store session in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

// ===== File =====

/// Stores the record as pretty JSON in `session.json`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<SessionRecord>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read session file")?;
        let record =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(record))
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .context("Failed to create session directory")?;
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(self.session_path(), contents)
            .context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

// ===== Memory =====

/// Keeps the record in process memory only.
#[derive(Default)]
pub struct MemoryStorage {
    record: Mutex<Option<SessionRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<SessionRecord>> {
        Ok(self.record.lock().ok().and_then(|g| g.clone()))
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        if let Ok(mut guard) = self.record.lock() {
            *guard = Some(record.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut guard) = self.record.lock() {
            *guard = None;
        }
        Ok(())
    }
}
