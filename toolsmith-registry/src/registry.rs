//! The durable tool registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::AsyncReadExt;
use tokio::sync::{Mutex, RwLock};
use toolsmith_types::fsname::{file_name, name_from_file};
use toolsmith_types::{
    Args, ArtifactLoader, Callable, LoadedArtifact, ParamKind, RegistryError, ToolFailure,
    ToolSignature, TypeInfo,
};

const EXTENSION: &str = "tool";

/// Identity of an artifact file's contents as seen by the filesystem.
///
/// A record is stale when the stamp of its artifact no longer matches
/// the stamp taken when it was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl ArtifactStamp {
    fn of(metadata: &std::fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

/// One loaded tool. Replaced wholesale on reload, never mutated.
pub struct ToolRecord {
    name: String,
    source: String,
    entrypoint: String,
    signature: ToolSignature,
    doc: Option<String>,
    callable: Arc<dyn Callable>,
    loaded_at: DateTime<Utc>,
    stamp: ArtifactStamp,
}

impl ToolRecord {
    fn new(name: &str, source: String, artifact: LoadedArtifact, stamp: ArtifactStamp) -> Self {
        Self {
            name: name.to_string(),
            source,
            entrypoint: artifact.entrypoint,
            signature: artifact.signature,
            doc: artifact.doc,
            callable: artifact.callable,
            loaded_at: Utc::now(),
            stamp,
        }
    }

    /// Tool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source text the record was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Name of the primary callable the source declares.
    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    /// Parameter schema.
    pub fn signature(&self) -> &ToolSignature {
        &self.signature
    }

    /// Docstring.
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// When this record was loaded.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Bind `args` against the schema and call the tool.
    pub async fn invoke(&self, args: &Args) -> Result<Value, ToolFailure> {
        let bound = self.signature.bind(args)?;
        self.callable.call(bound).await
    }

    /// The record's public description.
    pub fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            docstring: self.doc.clone(),
            entrypoint: self.entrypoint.clone(),
            parameters: self
                .signature
                .params
                .iter()
                .map(|p| ParamDescription {
                    name: p.name.clone(),
                    kind: p.kind,
                    required: p.required(),
                    has_default: p.default.is_some(),
                    default: p.default.clone(),
                    annotation: TypeInfo::of(p.annotation.as_deref()),
                })
                .collect(),
            returns: TypeInfo::of(self.signature.returns.as_deref()),
            loaded_at: self.loaded_at,
        }
    }
}

impl std::fmt::Debug for ToolRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRecord")
            .field("name", &self.name)
            .field("entrypoint", &self.entrypoint)
            .field("signature", &self.signature)
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}

/// What `describe` reports for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescription {
    /// Parameter name.
    pub name: String,
    /// Positional-or-keyword, or keyword-only.
    pub kind: ParamKind,
    /// Whether a caller must supply it.
    pub required: bool,
    /// Whether a default is declared. Distinguishes a `null` default
    /// from none.
    pub has_default: bool,
    /// The default, when declared.
    pub default: Option<Value>,
    /// Annotation and its classification.
    pub annotation: TypeInfo,
}

/// What `describe` reports for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescription {
    /// Tool name.
    pub name: String,
    /// Leading documentation text.
    pub docstring: Option<String>,
    /// Name of the primary callable in the source.
    pub entrypoint: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ParamDescription>,
    /// Return annotation and its classification.
    pub returns: TypeInfo,
    /// When the described record was loaded.
    pub loaded_at: DateTime<Utc>,
}

#[derive(Default)]
struct Index {
    names: BTreeSet<String>,
    records: HashMap<String, Arc<ToolRecord>>,
}

/// Durable map from tool name to loaded artifact.
///
/// Directory layout:
/// ```text
/// tools_dir/
///   <encoded-name>.tool
/// ```
///
/// Artifacts are loaded lazily. Every `resolve` compares the artifact's
/// current stamp with the one recorded at load time and reloads when they
/// differ, so edits made on disk take effect without an explicit reload.
/// Writes are serialized by a registry-wide lock; resolves may race on
/// reload since loading the same source twice yields the same record.
pub struct ToolRegistry {
    dir: PathBuf,
    loader: Arc<dyn ArtifactLoader>,
    index: RwLock<Index>,
    write_lock: Mutex<()>,
}

impl ToolRegistry {
    /// Open a registry over `dir`, indexing the artifacts already there.
    /// Nothing is loaded until first use. A missing directory is created
    /// on first registration.
    pub async fn open(
        dir: impl Into<PathBuf>,
        loader: Arc<dyn ArtifactLoader>,
    ) -> Result<Self, RegistryError> {
        let dir = dir.into();
        let mut names = BTreeSet::new();
        match tokio::fs::read_dir(&dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    if let Some(name) = entry
                        .file_name()
                        .to_str()
                        .and_then(|f| name_from_file(f, EXTENSION))
                    {
                        names.insert(name);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(dir = %dir.display(), tools = names.len(), "opened tool registry");
        Ok(Self {
            dir,
            loader,
            index: RwLock::new(Index {
                names,
                records: HashMap::new(),
            }),
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `name`.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(file_name(name, EXTENSION))
    }

    /// Persist `source` under `name` and make it the live record.
    ///
    /// The source is loaded before anything is written, so a `LoadError`
    /// leaves the registry and the disk untouched.
    pub async fn register(&self, name: &str, source: &str) -> Result<Arc<ToolRecord>, RegistryError> {
        check_name(name)?;
        let _guard = self.write_lock.lock().await;

        let artifact = self
            .loader
            .load(name, source)
            .map_err(|source| RegistryError::Load {
                name: name.to_string(),
                source,
            })?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.artifact_path(name);
        let tmp = self.dir.join(format!(".{}.tmp", file_name(name, EXTENSION)));
        tokio::fs::write(&tmp, source).await?;
        tokio::fs::rename(&tmp, &path).await?;
        let stamp = ArtifactStamp::of(&tokio::fs::metadata(&path).await?);

        let record = Arc::new(ToolRecord::new(name, source.to_string(), artifact, stamp));
        let existed = {
            let mut index = self.index.write().await;
            index.records.insert(name.to_string(), Arc::clone(&record));
            !index.names.insert(name.to_string())
        };
        if existed {
            tracing::warn!(tool = name, "overwriting existing tool");
        }
        tracing::info!(tool = name, entrypoint = %record.entrypoint, "registered tool");
        Ok(record)
    }

    /// The current record for `name`, reloading it if its artifact
    /// changed since it was loaded.
    ///
    /// Reloads are serialized with [`register`](Self::register), so a
    /// reload never replaces a newer record with an older source.
    pub async fn resolve(&self, name: &str) -> Result<Arc<ToolRecord>, RegistryError> {
        if let Some(record) = self.cached(name).await? {
            return Ok(record);
        }

        let _guard = self.write_lock.lock().await;
        if let Some(record) = self.cached(name).await? {
            return Ok(record);
        }
        tracing::debug!(tool = name, "loading artifact from disk");

        let path = self.artifact_path(name);
        let (stamp, source) = match read_artifact(&path).await {
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.evict(name).await;
                return Err(RegistryError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let artifact = match self.loader.load(name, &source) {
            Ok(artifact) => artifact,
            Err(source) => {
                self.index.write().await.records.remove(name);
                return Err(RegistryError::Load {
                    name: name.to_string(),
                    source,
                });
            }
        };

        let record = Arc::new(ToolRecord::new(name, source, artifact, stamp));
        let mut index = self.index.write().await;
        index.records.insert(name.to_string(), Arc::clone(&record));
        index.names.insert(name.to_string());
        Ok(record)
    }

    /// The cached record when its artifact is unchanged on disk. A
    /// vanished artifact evicts the record and reports `NotFound`.
    async fn cached(&self, name: &str) -> Result<Option<Arc<ToolRecord>>, RegistryError> {
        let stamp = match tokio::fs::metadata(self.artifact_path(name)).await {
            Ok(metadata) => ArtifactStamp::of(&metadata),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.evict(name).await;
                return Err(RegistryError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(self
            .index
            .read()
            .await
            .records
            .get(name)
            .filter(|record| record.stamp == stamp)
            .cloned())
    }

    /// Describe a tool: docstring, parameter schema, return type.
    pub async fn describe(&self, name: &str) -> Result<ToolDescription, RegistryError> {
        Ok(self.resolve(name).await?.describe())
    }

    /// The persisted source text of a tool.
    pub async fn source(&self, name: &str) -> Result<String, RegistryError> {
        match tokio::fs::read_to_string(self.artifact_path(name)).await {
            Ok(source) => Ok(source),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.evict(name).await;
                Err(RegistryError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Registered tool names, sorted.
    pub async fn list(&self) -> Vec<String> {
        self.index.read().await.names.iter().cloned().collect()
    }

    /// Descriptions of every tool that can be described. A tool that
    /// fails is logged and left out.
    pub async fn catalog(&self) -> Vec<ToolDescription> {
        let mut catalog = Vec::new();
        for name in self.list().await {
            match self.describe(&name).await {
                Ok(description) => catalog.push(description),
                Err(e) => tracing::warn!(tool = %name, error = %e, "skipping tool in catalog"),
            }
        }
        catalog
    }

    /// Delete a tool's artifact and record. Returns `false`, with a
    /// warning, when there was nothing to remove.
    pub async fn remove(&self, name: &str) -> Result<bool, RegistryError> {
        let _guard = self.write_lock.lock().await;
        let removed = match tokio::fs::remove_file(self.artifact_path(name)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        self.evict(name).await;
        if removed {
            tracing::info!(tool = name, "removed tool");
        } else {
            tracing::warn!(tool = name, "remove requested for unknown tool");
        }
        Ok(removed)
    }

    async fn evict(&self, name: &str) {
        let mut index = self.index.write().await;
        index.records.remove(name);
        index.names.remove(name);
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// Stamp and source text of an artifact, both taken from one open file.
async fn read_artifact(path: &Path) -> std::io::Result<(ArtifactStamp, String)> {
    let mut file = tokio::fs::File::open(path).await?;
    let stamp = ArtifactStamp::of(&file.metadata().await?);
    let mut source = String::new();
    file.read_to_string(&mut source).await?;
    Ok((stamp, source))
}

fn check_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}
