//! Key/value store implementations.
//!
//! [`TomlKeyValueStore`] keeps every key in one TOML document and
//! rewrites it atomically (tmp file + rename, fsync before the rename)
//! on each mutation; an in-memory copy avoids re-reading the file on
//! every `get`. [`MemoryKeyValueStore`] backs tests and ephemeral runs.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use bililink_core::error::{LinkError, Result};
use bililink_core::store::KeyValueStore;

/// Durable store over a single TOML document of string keys and values.
#[derive(Clone)]
pub struct TomlKeyValueStore {
    path: PathBuf,
    values: Arc<Mutex<BTreeMap<String, String>>>,
}

impl TomlKeyValueStore {
    /// Opens the store, loading the document if it exists.
    ///
    /// A missing or empty file yields an empty store; the file is
    /// created on the first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = Self::load_document(&path)?;
        Ok(Self {
            path,
            values: Arc::new(Mutex::new(values)),
        })
    }

    fn load_document(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(toml::from_str(&content)?)
    }

    /// Writes the whole document atomically via tmp file + rename.
    fn save_document(path: &Path, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let serialized = toml::to_string_pretty(values)?;

        let file_name = path
            .file_name()
            .ok_or_else(|| LinkError::store("store path has no file name"))?;
        let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(serialized.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Persists the current snapshot off the async thread.
    async fn persist(&self, snapshot: BTreeMap<String, String>) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::save_document(&path, &snapshot))
            .await
            .map_err(|e| LinkError::store(format!("persist task failed: {e}")))?
    }
}

#[async_trait]
impl KeyValueStore for TomlKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let snapshot = {
            let mut values = self.values.lock().await;
            values.insert(key.to_string(), value);
            values.clone()
        };
        debug!(key, "store write");
        self.persist(snapshot).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let snapshot = {
            let mut values = self.values.lock().await;
            if values.remove(key).is_none() {
                return Ok(());
            }
            values.clone()
        };
        self.persist(snapshot).await
    }
}

/// Volatile store for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}
