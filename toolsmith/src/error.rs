//! The facade error and its coarse classification.

use thiserror::Error;
use toolsmith_types::{
    AuditError, FlowError, InvokeError, RegistryError, StoreError, SynthesisError,
};

/// Coarse error classes a request boundary maps to its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Tool or flow absent.
    NotFound,
    /// Malformed request or flow spec.
    Validation,
    /// A declared flow input was not supplied.
    MissingInput,
    /// A reference expression did not resolve.
    Reference,
    /// Tool source has no usable primary callable.
    Load,
    /// The invoked tool raised.
    ToolExecution,
    /// Durable storage failed.
    Storage,
}

/// Errors returned by [`Toolsmith`](crate::Toolsmith).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Tool registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Direct tool invocation error.
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// Flow store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Flow execution error.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// Audit log read error.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Code synthesis error.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// The request is malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// No flow is stored under this name.
    #[error("flow not found: {0}")]
    FlowNotFound(String),
}

/// Result alias for the facade.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Registry(err) => registry_kind(err),
            Self::Invoke(InvokeError::Registry(err)) => registry_kind(err),
            Self::Invoke(_) => ErrorKind::ToolExecution,
            Self::Store(err) => store_kind(err),
            Self::Flow(err) => match err {
                FlowError::NotFound(_) => ErrorKind::NotFound,
                FlowError::Validation(_) => ErrorKind::Validation,
                FlowError::MissingInput(_) => ErrorKind::MissingInput,
                FlowError::Reference { .. } => ErrorKind::Reference,
                FlowError::Registry(err) => registry_kind(err),
                FlowError::ToolExecution(_) => ErrorKind::ToolExecution,
                FlowError::Store(err) => store_kind(err),
                _ => ErrorKind::Storage,
            },
            Self::Audit(_) => ErrorKind::Storage,
            Self::Synthesis(_) => ErrorKind::Load,
            Self::Validation(_) => ErrorKind::Validation,
            Self::FlowNotFound(_) => ErrorKind::NotFound,
        }
    }
}

fn registry_kind(err: &RegistryError) -> ErrorKind {
    match err {
        RegistryError::NotFound(_) => ErrorKind::NotFound,
        RegistryError::Load { .. } => ErrorKind::Load,
        RegistryError::InvalidName(_) => ErrorKind::Validation,
        _ => ErrorKind::Storage,
    }
}

fn store_kind(err: &StoreError) -> ErrorKind {
    match err {
        StoreError::Validation(_) => ErrorKind::Validation,
        _ => ErrorKind::Storage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolsmith_types::{LoadError, Namespace, ToolFailure};

    #[test]
    fn kinds() {
        let cases: Vec<(Error, ErrorKind)> = vec![
            (RegistryError::NotFound("t".into()).into(), ErrorKind::NotFound),
            (
                RegistryError::Load {
                    name: "t".into(),
                    source: LoadError::new("no callable"),
                }
                .into(),
                ErrorKind::Load,
            ),
            (
                InvokeError::Execution(ToolFailure::runtime("Boom!")).into(),
                ErrorKind::ToolExecution,
            ),
            (
                InvokeError::Registry(RegistryError::NotFound("t".into())).into(),
                ErrorKind::NotFound,
            ),
            (StoreError::Validation("bad".into()).into(), ErrorKind::Validation),
            (
                FlowError::MissingInput(vec!["value".into()]).into(),
                ErrorKind::MissingInput,
            ),
            (
                FlowError::Reference {
                    expr: "$ctx.x".into(),
                    namespace: Namespace::Ctx,
                }
                .into(),
                ErrorKind::Reference,
            ),
            (
                FlowError::ToolExecution(ToolFailure::runtime("Boom!")).into(),
                ErrorKind::ToolExecution,
            ),
            (
                FlowError::Store(StoreError::Serialization("x".into())).into(),
                ErrorKind::Storage,
            ),
            (Error::FlowNotFound("f".into()), ErrorKind::NotFound),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn tool_failures_display_with_their_identity() {
        let err: Error = FlowError::ToolExecution(ToolFailure::runtime("Boom!")).into();
        assert_eq!(err.to_string(), "RuntimeError: Boom!");
    }
}
