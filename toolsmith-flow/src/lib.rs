#![deny(missing_docs)]
//! Flow specifications and flow stores for toolsmith.
//!
//! A flow is a named, ordered list of tool invocations. Step parameters
//! are literals or reference expressions:
//!
//! | Expression | Resolves to |
//! |------------|-------------|
//! | `$inputs.<key>` | the run input `<key>` |
//! | `$ctx.<key>` | the result an earlier step saved as `<key>` |
//! | `$$text` | the literal string `$text` |
//!
//! References are parsed by [`validate`] when a spec is saved, so a
//! stored [`FlowSpec`] never carries a malformed one.

pub mod spec;
pub mod store;

pub use spec::{FlowSpec, FlowStep, ParamExpr, validate};
pub use store::{FileFlowStore, FlowStore, InMemoryFlowStore};
