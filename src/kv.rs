//! Durable local key/value storage
//!
//! The registry keeps whole JSON documents under a handful of string keys:
//! - `land_registry_parcels` - the parcel collection
//! - `land_registry_council` - council roster
//! - `land_registry_council_auth` - council session flag

use crate::error::RegistryError;
use sled::Db;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub const PARCELS_KEY: &str = "land_registry_parcels";
pub const COUNCIL_KEY: &str = "land_registry_council";
pub const SESSION_KEY: &str = "land_registry_council_auth";

/// String key/value storage backing the registry
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, RegistryError>;

    /// Write `value`; returns once the write is durable
    fn set(&self, key: &str, value: &str) -> Result<(), RegistryError>;

    fn remove(&self, key: &str) -> Result<(), RegistryError>;
}

/// sled-backed store on local disk
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let db = sled::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Opened registry database");
        Ok(Self { db })
    }

    /// Open a throwaway database that is removed on drop
    pub fn temporary() -> Result<Self, RegistryError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, RegistryError> {
        match self.db.get(key.as_bytes())? {
            Some(value) => String::from_utf8(value.to_vec())
                .map(Some)
                .map_err(|e| RegistryError::Storage(format!("non UTF-8 value under {}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), RegistryError> {
        self.db.remove(key.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, RegistryError> {
        self.entries
            .lock()
            .map_err(|_| RegistryError::Storage("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), RegistryError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
