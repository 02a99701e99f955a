#![deny(missing_docs)]
//! Flow execution for toolsmith.
//!
//! [`FlowEngine`] runs stored flows step by step against a
//! [`ToolRegistry`](toolsmith_registry::ToolRegistry), threading a
//! run-scoped [`RunContext`] and writing one audit entry per step to the
//! flow's stream. [`ToolInvoker`] does the same for a single tool called
//! directly, writing to the tool's stream.
//!
//! Per run:
//!
//! ```text
//! NotStarted -> (ResolvingParams -> Invoking -> StepSucceeded | StepFailed)* -> Succeeded | Failed
//! ```

pub mod context;
pub mod engine;
pub mod invoke;

pub use context::RunContext;
pub use engine::{FlowEngine, FlowReport};
pub use invoke::ToolInvoker;
