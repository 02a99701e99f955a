//! The JSONL-backed audit log.

use crate::entry::{AuditEntry, EntryKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use toolsmith_types::AuditError;
use toolsmith_types::fsname::sanitize;

/// Records returned when a caller does not ask for a usable count.
pub const DEFAULT_LIMIT: usize = 20;

/// Coerce a requested record count: non-positive or absent requests
/// become [`DEFAULT_LIMIT`].
pub fn coerce_limit(limit: Option<i64>) -> usize {
    match limit {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(DEFAULT_LIMIT),
        _ => DEFAULT_LIMIT,
    }
}

/// Coerce an untyped limit as received at a request boundary. Anything
/// but a positive integer becomes [`DEFAULT_LIMIT`].
pub fn coerce_limit_value(limit: &serde_json::Value) -> usize {
    coerce_limit(limit.as_i64())
}

/// Append-only audit log: one JSONL stream per tool and per flow.
///
/// Directory layout:
/// ```text
/// root/
///   <tool>.jsonl
///   flow_<flow>.jsonl
/// ```
///
/// Writers to one stream are serialized so records never interleave;
/// different streams are independent. Reads take the same stream lock,
/// so they never observe a half-written line.
pub struct AuditLog {
    root: PathBuf,
    streams: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AuditLog {
    /// Create a log rooted at the given directory.
    ///
    /// The directory is created lazily on first append.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Directory the streams live in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stream name for a tool.
    pub fn tool_stream(tool: &str) -> String {
        sanitize(tool)
    }

    /// Stream name for a flow.
    pub fn flow_stream(flow: &str) -> String {
        format!("flow_{}", sanitize(flow))
    }

    /// Path of a stream's file.
    pub fn stream_path(&self, stream: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", sanitize(stream)))
    }

    async fn lock_for(&self, stream: &str) -> Arc<Mutex<()>> {
        let mut streams = self.streams.lock().await;
        Arc::clone(streams.entry(stream.to_string()).or_default())
    }

    /// Append one completed record to a stream.
    pub async fn append(&self, stream: &str, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line =
            serde_json::to_string(entry).map_err(|e| AuditError::Serialization(e.to_string()))?;
        line.push('\n');

        let lock = self.lock_for(stream).await;
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.root).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.stream_path(stream))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Append a direct tool call record.
    pub async fn record_tool(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.append(&Self::tool_stream(&entry.tool), entry).await
    }

    /// Append a flow step record.
    pub async fn record_flow(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.append(&Self::flow_stream(&entry.name), entry).await
    }

    /// The most recent records of a stream, most recent first.
    ///
    /// Lines that are not UTF-8 or not a record are skipped with a
    /// warning. A stream that was never written reads as empty.
    pub async fn recent(&self, stream: &str, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        self.recent_where(stream, limit, |_| true).await
    }

    async fn recent_where(
        &self,
        stream: &str,
        limit: usize,
        keep: impl Fn(&AuditEntry) -> bool,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let path = self.stream_path(stream);
        let contents = {
            let lock = self.lock_for(stream).await;
            let _guard = lock.lock().await;
            match tokio::fs::read(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
                Err(e) => return Err(AuditError::Io(e)),
            }
        };

        let mut entries = Vec::new();
        for (lineno, raw) in contents.split(|b| *b == b'\n').enumerate() {
            let line = match std::str::from_utf8(raw) {
                Ok(line) => line.trim(),
                Err(e) => {
                    tracing::warn!(
                        stream,
                        line = lineno + 1,
                        error = %e,
                        "skipping non-UTF-8 audit record"
                    );
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(line) {
                Ok(entry) if keep(&entry) => entries.push(entry),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        stream,
                        line = lineno + 1,
                        error = %e,
                        "skipping malformed audit record"
                    );
                }
            }
        }

        Ok(entries.into_iter().rev().take(limit).collect())
    }

    /// Recent direct calls of a tool.
    ///
    /// Distinct names can sanitize to the same stream; only records whose
    /// subject is exactly `tool` are returned.
    pub async fn tool_runs(
        &self,
        tool: &str,
        limit: Option<i64>,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        self.recent_where(&Self::tool_stream(tool), coerce_limit(limit), |e| {
            e.kind == EntryKind::Tool && e.tool == tool
        })
        .await
    }

    /// Recent step records of a flow.
    pub async fn flow_runs(
        &self,
        flow: &str,
        limit: Option<i64>,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        self.recent_where(&Self::flow_stream(flow), coerce_limit(limit), |e| {
            e.kind == EntryKind::FlowStep && e.name == flow
        })
        .await
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn limits_coerce_to_default() {
        assert_eq!(coerce_limit(None), DEFAULT_LIMIT);
        assert_eq!(coerce_limit(Some(0)), DEFAULT_LIMIT);
        assert_eq!(coerce_limit(Some(-4)), DEFAULT_LIMIT);
        assert_eq!(coerce_limit(Some(3)), 3);
        assert_eq!(coerce_limit_value(&json!(3)), 3);
        assert_eq!(coerce_limit_value(&json!("3")), DEFAULT_LIMIT);
        assert_eq!(coerce_limit_value(&json!(2.5)), DEFAULT_LIMIT);
        assert_eq!(coerce_limit_value(&json!(null)), DEFAULT_LIMIT);
    }

    #[test]
    fn stream_names_are_sanitized() {
        assert_eq!(AuditLog::tool_stream("adder"), "adder");
        assert_eq!(AuditLog::flow_stream("math_chain"), "flow_math_chain");
        assert_eq!(AuditLog::tool_stream("../evil"), ".._evil");
    }

    #[test]
    fn stream_paths_stay_under_root() {
        let log = AuditLog::new(Path::new("/logs"));
        let path = log.stream_path("../../etc/passwd");
        assert_eq!(path.parent(), Some(Path::new("/logs")));
    }
}
