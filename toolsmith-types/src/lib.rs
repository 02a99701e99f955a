//! # toolsmith-types: protocol vocabulary for the toolsmith runtime
//!
//! This crate defines the shared types that the registry, flow store,
//! execution engine and audit log exchange. It holds no state and does
//! no I/O.
//!
//! ## The Seams
//!
//! | Seam | Trait | What it does |
//! |------|-------|-------------|
//! | Loading | [`ArtifactLoader`] | Turns artifact source text into a callable plus its static schema |
//! | Invocation | [`Callable`] | Executes one tool against bound JSON arguments |
//! | Synthesis | [`Synthesizer`] | Produces source text for a named tool from a description |
//!
//! ## Schemas
//!
//! A loader publishes a [`ToolSignature`] at load time. The registry never
//! inspects a live callable; everything `describe` reports comes from the
//! signature and the [`classify`] function over its annotation strings.

#![deny(missing_docs)]

pub mod callable;
pub mod error;
pub mod fsname;
pub mod loader;
pub mod schema;
pub mod synth;

pub use callable::{Args, Callable, FnCallable, callable_fn};
pub use error::{
    AuditError, FlowError, InvokeError, LoadError, Namespace, RegistryError, StoreError,
    SynthesisError, ToolFailure,
};
pub use loader::{ArtifactLoader, LoadedArtifact};
pub use schema::{ParamKind, ParamSpec, ToolSignature, TypeClass, TypeInfo, classify};
pub use synth::Synthesizer;
