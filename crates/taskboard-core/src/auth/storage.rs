//! Persisted session slots.
//!
//! The session record is kept as named string slots, the same way a browser
//! client would use local storage. Three backends are provided:
//!
//! - `FileSlotStore`: a JSON map on disk (default)
//! - `KeyringSlotStore`: one OS keychain entry per slot
//! - `MemorySlotStore`: nothing survives the process

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use keyring::Entry;

/// Slot holding the raw bearer token
pub const TOKEN_SLOT: &str = "token";

/// Slot holding the serialized identity record
pub const USER_SLOT: &str = "user";

/// Service name used for keychain entries
const KEYRING_SERVICE: &str = "taskboard";

/// Named string storage for the persisted session record.
pub trait SlotStore: Send + Sync {
    fn get(&self, slot: &str) -> Result<Option<String>>;
    fn set(&self, slot: &str, value: &str) -> Result<()>;
    fn remove(&self, slot: &str) -> Result<()>;
}

/// Slots stored as a JSON object in a single file.
pub struct FileSlotStore {
    path: PathBuf,
    // Serializes read-modify-write of the file
    lock: Mutex<()>,
}

impl FileSlotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn write_all(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        if slots.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove session file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(slots)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl SlotStore for FileSlotStore {
    fn get(&self, slot: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(slot))
    }

    fn set(&self, slot: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // An unreadable file is replaced rather than blocking new sessions
        let mut slots = self.read_all().unwrap_or_default();
        slots.insert(slot.to_string(), value.to_string());
        self.write_all(&slots)
    }

    fn remove(&self, slot: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut slots = match self.read_all() {
            Ok(slots) => slots,
            // Corrupt file: removing any slot discards it entirely
            Err(_) => BTreeMap::new(),
        };
        slots.remove(slot);
        self.write_all(&slots)
    }
}

/// Slots stored in the OS keychain.
pub struct KeyringSlotStore {
    service: String,
}

impl KeyringSlotStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, slot: &str) -> Result<Entry> {
        Entry::new(&self.service, slot).context("Failed to create keyring entry")
    }
}

impl Default for KeyringSlotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotStore for KeyringSlotStore {
    fn get(&self, slot: &str) -> Result<Option<String>> {
        match self.entry(slot)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read slot from keychain"),
        }
    }

    fn set(&self, slot: &str, value: &str) -> Result<()> {
        self.entry(slot)?
            .set_password(value)
            .context("Failed to store slot in keychain")
    }

    fn remove(&self, slot: &str) -> Result<()> {
        match self.entry(slot)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete slot from keychain"),
        }
    }
}

/// Slots kept only for the lifetime of the process.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: Mutex<BTreeMap<String, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate slots, e.g. with a record left by an earlier run
    pub fn with_slots<'a>(slots: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.slots.lock().unwrap_or_else(PoisonError::into_inner);
            for (slot, value) in slots {
                map.insert(slot.to_string(), value.to_string());
            }
        }
        store
    }

    pub fn is_empty(&self) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl SlotStore for MemorySlotStore {
    fn get(&self, slot: &str) -> Result<Option<String>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(slot).cloned())
    }

    fn set(&self, slot: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(slot);
        Ok(())
    }
}
