#![deny(missing_docs)]
//! Durable tool registry for toolsmith.
//!
//! A tool is a named artifact: source text persisted under the registry
//! directory and turned into a callable by an
//! [`ArtifactLoader`](toolsmith_types::ArtifactLoader). The registry
//! never inspects a live callable; the loader publishes the parameter
//! schema at load time.
//!
//! [`NativeLoader`] is the loader shipped here. It reads the artifact's
//! static descriptor (see [`descriptor`]) and binds the declared
//! entrypoint to an implementation compiled into the host.

pub mod descriptor;
pub mod native;
pub mod registry;

pub use descriptor::Descriptor;
pub use native::NativeLoader;
pub use registry::{ArtifactStamp, ParamDescription, ToolDescription, ToolRecord, ToolRegistry};
