//! Durable key-value storage for state that survives process restarts.
//!
//! The core persists the last-known location, the trusted-contact list, and
//! the impact threshold. The trait is narrow on purpose — get/set of JSON
//! values — so a platform binding (mobile preferences, a file, a database)
//! can slot in without touching the core.

pub mod contacts;

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// The most recently persisted `GeoFix`.
    pub const LAST_LOCATION: &str = "lastLocation";

    /// The trusted-contact list, newest first.
    pub const TRUSTED_CONTACTS: &str = "trustedContacts";

    /// The configured impact threshold.
    pub const IMPACT_THRESHOLD: &str = "impactThreshold";
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage read failed: {0}")]
    ReadFailed(String),

    #[error("Storage write failed: {0}")]
    WriteFailed(String),
}

/// A durable key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` means the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;
}

/// In-memory store for tests, demos, and as the default before a platform
/// binding is configured.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            entries: RwLock::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.entries.write().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}
