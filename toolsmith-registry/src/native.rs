//! Artifact loader backed by compiled-in implementations.

use crate::descriptor;
use std::collections::BTreeMap;
use std::sync::Arc;
use toolsmith_types::{ArtifactLoader, Callable, LoadError, LoadedArtifact};

/// Loads artifacts by binding the callable their descriptor declares to
/// an implementation compiled into the host.
///
/// The artifact source decides which implementation a tool name runs:
/// editing a stored artifact from `fn double(..)` to `fn triple(..)`
/// switches the tool to the `triple` binding on its next resolve.
#[derive(Default, Clone)]
pub struct NativeLoader {
    bindings: BTreeMap<String, Arc<dyn Callable>>,
}

impl NativeLoader {
    /// Create a loader with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an entrypoint name to an implementation, builder style.
    #[must_use]
    pub fn with(mut self, entrypoint: impl Into<String>, callable: impl Callable + 'static) -> Self {
        self.bind(entrypoint, callable);
        self
    }

    /// Bind an entrypoint name to an implementation, replacing any
    /// previous binding.
    pub fn bind(
        &mut self,
        entrypoint: impl Into<String>,
        callable: impl Callable + 'static,
    ) -> &mut Self {
        self.bindings.insert(entrypoint.into(), Arc::new(callable));
        self
    }

    /// Bound entrypoint names, sorted.
    pub fn entrypoints(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

impl ArtifactLoader for NativeLoader {
    fn load(&self, name: &str, source: &str) -> Result<LoadedArtifact, LoadError> {
        let descriptor = descriptor::parse(source)?;
        let callable = self
            .bindings
            .get(&descriptor.entrypoint)
            .cloned()
            .ok_or_else(|| {
                LoadError::new(format!(
                    "no implementation bound for {} (declared by {name})",
                    descriptor.entrypoint
                ))
            })?;
        Ok(LoadedArtifact {
            callable,
            entrypoint: descriptor.entrypoint,
            signature: descriptor.signature,
            doc: descriptor.doc,
        })
    }
}

impl std::fmt::Debug for NativeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLoader")
            .field("entrypoints", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}
