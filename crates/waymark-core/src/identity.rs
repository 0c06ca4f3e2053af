// ── Device identity ──
//
// One opaque identifier per installation, generated on first use and
// reused on every later run. Storage goes through `IdentityStore` so the
// CLI can keep it in a file while tests keep it in memory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::DeviceId;

/// Key under which the identifier is persisted.
pub const DEVICE_ID_KEY: &str = "DEVICE_ID";

#[derive(Debug, Error)]
pub enum IdentityStoreError {
    #[error("identity storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("identity storage is corrupt: {0}")]
    Corrupt(String),
}

/// Durable slot holding at most one device identifier.
pub trait IdentityStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<DeviceId>, IdentityStoreError>;

    fn save(&self, id: &DeviceId) -> Result<(), IdentityStoreError>;

    /// Human-readable location, for diagnostics.
    fn describe(&self) -> String;
}

// ── File store ───────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct IdentityFile {
    #[serde(rename = "DEVICE_ID", default)]
    device_id: Option<String>,
}

/// Stores the identifier as `{"DEVICE_ID": "<uuid>"}` in a JSON file.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<DeviceId>, IdentityStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: IdentityFile = serde_json::from_str(&raw)
            .map_err(|e| IdentityStoreError::Corrupt(e.to_string()))?;
        Ok(file
            .device_id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .map(DeviceId::new))
    }

    fn save(&self, id: &DeviceId) -> Result<(), IdentityStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&IdentityFile {
            device_id: Some(id.as_str().to_owned()),
        })
        .map_err(|e| IdentityStoreError::Corrupt(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ── Memory store ─────────────────────────────────────────────────────

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    slot: Mutex<Option<DeviceId>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded with an existing identifier.
    pub fn with_id(id: DeviceId) -> Self {
        Self {
            slot: Mutex::new(Some(id)),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<DeviceId>, IdentityStoreError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, id: &DeviceId) -> Result<(), IdentityStoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(id.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}

// ── DeviceIdentity ───────────────────────────────────────────────────

#[derive(Debug)]
struct Resolved {
    id: DeviceId,
    persistent: bool,
}

/// Lazily resolved, process-wide device identifier.
///
/// The first call to [`get_or_create`](Self::get_or_create) reads the
/// store, generating and persisting a new UUID when it is empty. Every
/// later call returns the same value without touching storage. A corrupt
/// store is overwritten. When the store cannot be read or written, a
/// session-only identifier is used, the store is left as it was, and
/// [`is_persistent`](Self::is_persistent) reports `false`.
pub struct DeviceIdentity {
    store: Box<dyn IdentityStore>,
    resolved: OnceLock<Resolved>,
}

impl DeviceIdentity {
    pub fn new(store: impl IdentityStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            resolved: OnceLock::new(),
        }
    }

    /// Identity backed by a [`MemoryIdentityStore`].
    pub fn ephemeral() -> Self {
        Self::new(MemoryIdentityStore::new())
    }

    pub fn get_or_create(&self) -> DeviceId {
        self.resolved.get_or_init(|| self.resolve()).id.clone()
    }

    /// Whether the identifier will survive a restart.
    pub fn is_persistent(&self) -> bool {
        self.resolved.get_or_init(|| self.resolve()).persistent
    }

    pub fn storage_location(&self) -> String {
        self.store.describe()
    }

    fn resolve(&self) -> Resolved {
        match self.store.load() {
            Ok(Some(id)) => {
                debug!(device_id = %id, store = %self.store.describe(), "loaded device identity");
                return Resolved {
                    id,
                    persistent: true,
                };
            }
            Ok(None) => {}
            Err(IdentityStoreError::Corrupt(reason)) => {
                warn!(%reason, store = %self.store.describe(), "device identity is corrupt; replacing it");
            }
            // An unreadable store may still hold a valid identifier.
            Err(e @ IdentityStoreError::Io(_)) => {
                let id = DeviceId::generate();
                warn!(
                    error = %e,
                    device_id = %id,
                    store = %self.store.describe(),
                    "cannot read device identity; using a session-only identifier"
                );
                return Resolved {
                    id,
                    persistent: false,
                };
            }
        }

        let id = DeviceId::generate();
        match self.store.save(&id) {
            Ok(()) => {
                info!(device_id = %id, store = %self.store.describe(), "generated device identity");
                Resolved {
                    id,
                    persistent: true,
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    device_id = %id,
                    "cannot persist device identity; using a session-only identifier"
                );
                Resolved {
                    id,
                    persistent: false,
                }
            }
        }
    }
}

impl std::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("store", &self.store.describe())
            .field("resolved", &self.resolved.get())
            .finish()
    }
}
