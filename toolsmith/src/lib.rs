#![deny(missing_docs)]
//! # toolsmith: register tools, compose flows, run and audit them
//!
//! [`Toolsmith`] is the explicit context object: open one from a
//! [`ToolsmithConfig`] and an artifact loader, and every operation goes
//! through it. Nothing is process-global.
//!
//! | Part | Crate |
//! |------|-------|
//! | Errors, schemas, loader and callable traits | [`toolsmith_types`] |
//! | Tool registry, native loader | [`toolsmith_registry`] |
//! | Flow specs and stores | [`toolsmith_flow`] |
//! | Flow engine, audited invocation | [`toolsmith_engine`] |
//! | Audit log | [`toolsmith_audit`] |

pub mod config;
pub mod error;
mod instance;

pub use config::ToolsmithConfig;
pub use error::{Error, ErrorKind, Result};
pub use instance::Toolsmith;

pub use toolsmith_audit;
pub use toolsmith_engine;
pub use toolsmith_flow;
pub use toolsmith_registry;
pub use toolsmith_types;

/// Happy-path imports.
pub mod prelude {
    pub use crate::{Error, ErrorKind, Toolsmith, ToolsmithConfig};
    pub use toolsmith_audit::{AuditEntry, RunStatus};
    pub use toolsmith_flow::{FlowSpec, ParamExpr};
    pub use toolsmith_registry::{NativeLoader, ToolDescription};
    pub use toolsmith_types::{
        Args, ArtifactLoader, Callable, Synthesizer, SynthesisError, ToolFailure, TypeClass,
        callable_fn,
    };
}
