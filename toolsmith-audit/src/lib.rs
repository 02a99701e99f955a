#![deny(missing_docs)]
//! Append-only invocation audit log for toolsmith.
//!
//! Every direct tool call and every flow step produces exactly one
//! [`AuditEntry`], written after the invocation completes. Entries go to
//! one JSON-lines stream per subject:
//!
//! | Stream | File |
//! |--------|------|
//! | Direct calls of tool `t` | `<log_dir>/<t>.jsonl` |
//! | Steps of flow `f` | `<log_dir>/flow_<f>.jsonl` |
//!
//! Stream names are sanitized, so a subject name can never address a file
//! outside the log directory.

pub mod entry;
pub mod log;
pub mod summary;

pub use entry::{AuditEntry, EntryKind, ErrorRecord, Invocation, RunStatus};
pub use log::{AuditLog, DEFAULT_LIMIT, coerce_limit, coerce_limit_value};
