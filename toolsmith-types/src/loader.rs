//! The loading seam between artifact source text and a runnable tool.

use crate::callable::Callable;
use crate::error::LoadError;
use crate::schema::ToolSignature;
use std::sync::Arc;

/// Everything the registry needs from a loaded artifact.
#[derive(Clone)]
pub struct LoadedArtifact {
    /// The primary callable.
    pub callable: Arc<dyn Callable>,
    /// Name the source declares for its primary callable. It need not
    /// match the tool name.
    pub entrypoint: String,
    /// Static parameter schema published at load time.
    pub signature: ToolSignature,
    /// Leading documentation text, if any.
    pub doc: Option<String>,
}

impl std::fmt::Debug for LoadedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArtifact")
            .field("entrypoint", &self.entrypoint)
            .field("signature", &self.signature)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// Turns source text into a [`LoadedArtifact`].
///
/// How loading happens (compiled-in plugins, a subprocess interpreter,
/// generated code) is the implementation's business. Loading the same
/// source twice must yield an equivalent artifact, since concurrent
/// resolves may both reload a stale record.
pub trait ArtifactLoader: Send + Sync {
    /// Load the artifact registered under `name` from `source`.
    fn load(&self, name: &str, source: &str) -> Result<LoadedArtifact, LoadError>;
}
