//! The synthesis seam.

use crate::error::SynthesisError;
use async_trait::async_trait;

/// Produces artifact source text for a tool from a natural-language
/// description.
///
/// The only contract is that the returned source defines one primary
/// callable the configured [`ArtifactLoader`](crate::ArtifactLoader) can
/// load. Implementations may iterate and self-test internally.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Generate source text for `name`.
    async fn synthesize(&self, name: &str, description: &str) -> Result<String, SynthesisError>;
}
