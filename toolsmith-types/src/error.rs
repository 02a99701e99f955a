//! Error types for each component.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Whatever an invoked tool raised, with its identity preserved.
///
/// `kind` is the error's type name as the tool reported it (for example
/// `RuntimeError` or `TypeError`); `message` is its text. Both are carried
/// unchanged into audit records and back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct ToolFailure {
    /// Error type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Error message.
    pub message: String,
}

impl ToolFailure {
    /// Create a failure with an explicit kind.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// A generic runtime failure raised by the tool body.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new("RuntimeError", message)
    }

    /// Arguments did not match the tool's parameter schema.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }
}

/// The source text of an artifact has no usable primary callable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LoadError(pub String);

impl LoadError {
    /// Create a load error from a reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Tool registry errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No artifact exists under this name.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// The artifact exists but could not be loaded.
    #[error("failed to load tool {name}: {source}")]
    Load {
        /// Name of the tool.
        name: String,
        /// Why loading failed.
        #[source]
        source: LoadError,
    },

    /// The tool name cannot be used as a registry key.
    #[error("invalid tool name: {0:?}")]
    InvalidName(String),

    /// Reading or writing the artifact failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl RegistryError {
    /// Error type name recorded in audit entries.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFoundError",
            Self::Load { .. } => "LoadError",
            Self::InvalidName(_) => "ValidationError",
            Self::Storage(_) => "StorageError",
        }
    }
}

/// Flow store errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The flow specification is malformed.
    #[error("invalid flow spec: {0}")]
    Validation(String),

    /// Reading or writing a stored spec failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A stored spec could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Namespace a reference expression resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// `$inputs.<key>`: the inputs supplied to the run.
    Inputs,
    /// `$ctx.<key>`: results saved by earlier steps of the run.
    Ctx,
}

impl Namespace {
    /// The namespace as written in a reference expression.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inputs => "inputs",
            Self::Ctx => "ctx",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from invoking a single tool.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The tool could not be resolved.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The tool itself raised.
    #[error(transparent)]
    Execution(#[from] ToolFailure),
}

impl InvokeError {
    /// Error type name recorded in audit entries.
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Registry(err) => err.kind_name(),
            Self::Execution(failure) => &failure.kind,
        }
    }

    /// Error message recorded in audit entries.
    pub fn message(&self) -> String {
        match self {
            Self::Registry(err) => err.to_string(),
            Self::Execution(failure) => failure.message.clone(),
        }
    }
}

/// Flow execution errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FlowError {
    /// No flow is stored under this name.
    #[error("flow not found: {0}")]
    NotFound(String),

    /// The run request itself is malformed.
    #[error("invalid flow request: {0}")]
    Validation(String),

    /// Declared inputs were absent from the supplied mapping (sorted).
    #[error("missing required inputs: {}", .0.join(", "))]
    MissingInput(Vec<String>),

    /// A reference expression did not resolve.
    #[error("cannot resolve {expr}: no such key in {namespace}")]
    Reference {
        /// The expression as written.
        expr: String,
        /// The namespace it was looked up in.
        namespace: Namespace,
    },

    /// A step's tool could not be resolved.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A step's tool raised; the original failure is preserved.
    #[error(transparent)]
    ToolExecution(#[from] ToolFailure),

    /// The flow store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InvokeError> for FlowError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::Registry(err) => Self::Registry(err),
            InvokeError::Execution(failure) => Self::ToolExecution(failure),
        }
    }
}

/// Audit log errors. Callers treat these as best-effort and log them.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AuditError {
    /// Reading or appending a stream failed.
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be encoded.
    #[error("audit serialization error: {0}")]
    Serialization(String),
}

/// Code synthesis errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The synthesizer could not produce source text.
    #[error("synthesis failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
