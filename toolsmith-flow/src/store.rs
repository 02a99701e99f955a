//! Durable and in-memory flow stores.

use crate::spec::{FlowSpec, validate};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use toolsmith_types::StoreError;
use toolsmith_types::fsname::{file_name, name_from_file};

const EXTENSION: &str = "json";

/// Storage for flow specifications, one unit per name.
///
/// # Example
///
/// ```ignore
/// let store = InMemoryFlowStore::new();
/// let spec = store.save(&json!({"name": "f", "steps": [{"tool": "t"}]})).await?;
/// assert_eq!(store.get("f").await?, Some(spec));
/// ```
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Validate, normalize and persist a spec, replacing any spec with the
    /// same name. Returns the normalized spec.
    async fn save(&self, raw: &Value) -> Result<FlowSpec, StoreError>;

    /// Load a spec. `None` when no spec has this name.
    async fn get(&self, name: &str) -> Result<Option<FlowSpec>, StoreError>;

    /// Stored flow names, sorted.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Delete a spec. Returns whether one existed.
    async fn delete(&self, name: &str) -> Result<bool, StoreError>;
}

/// Filesystem-backed flow store.
///
/// Directory layout:
/// ```text
/// flows_dir/
///   <encoded-name>.json
/// ```
///
/// Specs are written pretty-printed, through a temporary file and a
/// rename, under a store-wide lock.
pub struct FileFlowStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileFlowStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory is created lazily on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory holding the specs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(file_name(name, EXTENSION))
    }
}

#[async_trait]
impl FlowStore for FileFlowStore {
    async fn save(&self, raw: &Value) -> Result<FlowSpec, StoreError> {
        let spec = validate(raw)?;
        let contents = serde_json::to_string_pretty(&spec)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path(&spec.name);
        let tmp = self
            .dir
            .join(format!(".{}.tmp", file_name(&spec.name, EXTENSION)));
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::info!(flow = %spec.name, steps = spec.steps.len(), "saved flow");
        Ok(spec)
    }

    async fn get(&self, name: &str) -> Result<Option<FlowSpec>, StoreError> {
        let contents = match tokio::fs::read_to_string(self.path(name)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let raw: Value = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Serialization(format!("flow {name}: {e}")))?;
        validate(&raw).map(Some)
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|f| name_from_file(f, EXTENSION))
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.path(name)).await {
            Ok(()) => {
                tracing::info!(flow = name, "deleted flow");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for FileFlowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFlowStore")
            .field("dir", &self.dir)
            .finish()
    }
}

/// In-memory flow store.
///
/// Suitable for testing and short-lived processes.
#[derive(Debug, Default)]
pub struct InMemoryFlowStore {
    flows: RwLock<BTreeMap<String, FlowSpec>>,
}

impl InMemoryFlowStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn save(&self, raw: &Value) -> Result<FlowSpec, StoreError> {
        let spec = validate(raw)?;
        self.flows
            .write()
            .await
            .insert(spec.name.clone(), spec.clone());
        Ok(spec)
    }

    async fn get(&self, name: &str) -> Result<Option<FlowSpec>, StoreError> {
        Ok(self.flows.read().await.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.flows.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.flows.write().await.remove(name).is_some())
    }
}
