//! Registry Store
//!
//! Durable, checksummed storage for the registry state. Each mutating
//! operation runs as a transaction under an exclusive lock on the store
//! directory: the state is loaded, the operation is applied, and the result
//! is written back only if the operation succeeded.
//!
//! ```text
//! .charity/
//! ├── .lock           # held exclusively for the length of a transaction
//! ├── state.json      # checksum + serialized state, replaced by one rename
//! └── events.jsonl    # delivered events (optional)
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::error::{RegistryError, Result};
use crate::event::{EventSink, MemorySink};
use crate::identity::Identity;
use crate::registry::{CharityRegistry, RegistryState};

pub const STATE_FILE: &str = "state.json";
pub const LOCK_FILE: &str = ".lock";
pub const EVENTS_FILE: &str = "events.jsonl";

/// Version of the on-disk state layout written by this crate
pub const FORMAT_VERSION: &str = "2.0.0";

/// The serialized registry state with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub format_version: Version,
    pub updated_at: DateTime<Utc>,
    pub state: RegistryState,
}

impl StateFile {
    fn wrap(state: RegistryState) -> Result<Self> {
        Ok(Self {
            format_version: Version::parse(FORMAT_VERSION)?,
            updated_at: Utc::now(),
            state,
        })
    }
}

/// Contents of `state.json`: `body` is a serialized [`StateFile`] and
/// `checksum` its SHA256. Both live in one file so a single rename commits
/// them together.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    checksum: String,
    body: String,
}

impl Envelope {
    fn seal(file: &StateFile) -> Result<Self> {
        let body = serde_json::to_string(file)?;
        Ok(Self {
            checksum: sha256_hex(&body),
            body,
        })
    }

    fn is_intact(&self) -> bool {
        sha256_hex(&self.body) == self.checksum
    }
}

fn sha256_hex(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Exclusive lock on a store directory, released on drop
struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()?;
        debug!(path = %path.display(), "store lock acquired");
        Ok(Self { file, path })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            error!(path = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

/// File-backed registry storage
#[derive(Debug, Clone)]
pub struct RegistryStore {
    root: PathBuf,
}

impl RegistryStore {
    /// Create a new registry at `path` administered by `administrator`
    pub fn init(path: impl AsRef<Path>, administrator: Identity) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let store = Self { root };
        let _lock = StoreLock::acquire(&store.root)?;
        if store.state_path().exists() {
            return Err(RegistryError::AlreadyInitialized { path: store.root.clone() });
        }

        store.save(RegistryState::new(administrator))?;
        info!(path = %store.root.display(), %administrator, "registry initialized");
        Ok(store)
    }

    /// Open an existing registry
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.join(STATE_FILE).exists() {
            return Err(RegistryError::NotInitialized { path: root });
        }
        Ok(Self { root })
    }

    /// Get the root path of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    pub fn events_path(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    /// Load and validate the persisted state
    pub fn load(&self) -> Result<RegistryState> {
        let envelope = self.read_envelope()?;
        if !envelope.is_intact() {
            warn!(path = %self.root.display(), "state checksum mismatch");
            return Err(RegistryError::ChecksumMismatch {
                expected: envelope.checksum.clone(),
                actual: sha256_hex(&envelope.body),
            });
        }

        let file: StateFile = serde_json::from_str(&envelope.body)?;
        let supported = Version::parse(FORMAT_VERSION)?;
        if file.format_version.major != supported.major {
            return Err(RegistryError::IncompatibleFormat {
                found: file.format_version.to_string(),
                supported: supported.to_string(),
            });
        }

        if !file.state.is_consistent() {
            return Err(RegistryError::CorruptState(format!(
                "counter {} does not match {} stored slots",
                file.state.counter,
                file.state.records.len()
            )));
        }

        debug!(counter = file.state.counter, updated_at = %file.updated_at, "state loaded");
        Ok(file.state)
    }

    /// Check the state body against its stored checksum
    pub fn verify(&self) -> Result<bool> {
        Ok(self.read_envelope()?.is_intact())
    }

    /// Run a read-only operation against the current state
    pub fn read<T>(&self, op: impl FnOnce(&CharityRegistry) -> T) -> Result<T> {
        let registry = CharityRegistry::from_state(self.load()?, Default::default());
        Ok(op(&registry))
    }

    /// Apply one operation atomically.
    ///
    /// Transactions on the same directory are serialized by the store lock,
    /// across handles and processes. The new state is written only if `op`
    /// succeeds. Events raised by `op` are delivered to `sink` after the
    /// state has been persisted and the lock released.
    pub fn transact<T, S, F>(&self, sink: &mut S, op: F) -> Result<T>
    where
        S: EventSink + ?Sized,
        F: FnOnce(&mut CharityRegistry<MemorySink>) -> Result<T>,
    {
        let (output, mut pending) = {
            let _lock = StoreLock::acquire(&self.root)?;

            let before = self.load()?;
            let mut registry = CharityRegistry::from_state(before.clone(), MemorySink::new());

            let output = op(&mut registry)?;

            let (after, pending) = registry.into_parts();
            if after != before {
                self.save(after)?;
            }
            (output, pending)
        };

        for event in pending.drain() {
            sink.emit(&event);
        }

        Ok(output)
    }

    fn read_envelope(&self) -> Result<Envelope> {
        let content = fs::read_to_string(self.state_path())?;
        serde_json::from_str(&content)
            .map_err(|e| RegistryError::CorruptState(format!("unreadable {}: {}", STATE_FILE, e)))
    }

    /// Write the sealed state to a fresh temp file and rename it into place
    fn save(&self, state: RegistryState) -> Result<()> {
        let envelope = Envelope::seal(&StateFile::wrap(state)?)?;
        let content = serde_json::to_string_pretty(&envelope)?;

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.state_path()).map_err(|e| e.error)?;

        debug!(path = %self.root.display(), checksum = %envelope.checksum, "state saved");
        Ok(())
    }
}
