//! Overlay persistence keyed by document identity
//!
//! One JSON record per document, keyed by a namespaced, reversible encoding of
//! the document URL. Last write wins; there is no versioning or expiry.

use crate::error::{OverlayError, StoreError};
use crate::model::OverlayCollection;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_NAMESPACE: &str = "pdf-overlays:";

/// Stable persistence key for one document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    key: String,
    namespace_len: usize,
}

impl DocumentKey {
    pub fn from_url(namespace: &str, url: &str) -> Self {
        Self {
            key: format!("{}{}", namespace, URL_SAFE_NO_PAD.encode(url.as_bytes())),
            namespace_len: namespace.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Recover the URL this key was derived from
    pub fn url(&self) -> Option<String> {
        let encoded = &self.key[self.namespace_len..];
        let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// String key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One file per key under a directory.
///
/// File names are the SHA-256 of the key, so arbitrary keys stay file-system safe.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{:x}.json", digest))
    }
}

impl KeyValueStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("empty key".to_string()));
        }
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// Read the saved overlays for `key`, distinguishing "none saved" from failure
pub fn read_overlays(
    store: &dyn KeyValueStore,
    key: &DocumentKey,
) -> Result<Option<OverlayCollection>, OverlayError> {
    let Some(json) = store
        .get(key.as_str())
        .map_err(|e| OverlayError::PersistenceRead(e.to_string()))?
    else {
        return Ok(None);
    };

    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| OverlayError::PersistenceRead(e.to_string()))
}

/// Saved overlays for `key`; unreadable or missing records yield an empty collection
pub fn load_overlays(store: &dyn KeyValueStore, key: &DocumentKey) -> OverlayCollection {
    match read_overlays(store, key) {
        Ok(Some(collection)) => collection,
        Ok(None) => OverlayCollection::new(),
        Err(e) => {
            tracing::warn!("Ignoring saved overlays for {}: {}", key, e);
            OverlayCollection::new()
        }
    }
}

pub fn save_overlays(
    store: &mut dyn KeyValueStore,
    key: &DocumentKey,
    collection: &OverlayCollection,
) -> Result<(), OverlayError> {
    let json = serde_json::to_string(collection)
        .map_err(|e| OverlayError::PersistenceWrite(e.to_string()))?;
    store
        .set(key.as_str(), &json)
        .map_err(|e| OverlayError::PersistenceWrite(e.to_string()))
}
