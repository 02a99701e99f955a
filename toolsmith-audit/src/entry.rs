//! Audit records and the timer that produces them.

use crate::summary::{snapshot, summarize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use toolsmith_types::{InvokeError, ToolFailure};

/// What was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A tool called directly.
    Tool,
    /// One step of a flow run.
    FlowStep,
}

/// Outcome of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Completed and produced a result.
    Success,
    /// Raised.
    Error,
}

/// Structured error captured in a failed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Error message.
    pub message: String,
}

impl From<&ToolFailure> for ErrorRecord {
    fn from(failure: &ToolFailure) -> Self {
        Self {
            kind: failure.kind.clone(),
            message: failure.message.clone(),
        }
    }
}

impl From<&InvokeError> for ErrorRecord {
    fn from(err: &InvokeError) -> Self {
        Self {
            kind: err.kind_name().to_string(),
            message: err.message(),
        }
    }
}

/// One immutable audit record. Written once, after the invocation it
/// describes has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Run identifier. Shared by every step of one flow run.
    pub run_id: String,
    /// Tool call or flow step.
    pub kind: EntryKind,
    /// Subject: the tool name, or the flow name for flow steps.
    pub name: String,
    /// Step id for flow steps.
    #[serde(default)]
    pub step_id: Option<String>,
    /// Tool that was invoked.
    pub tool: String,
    /// When the invocation started.
    pub started_at: DateTime<Utc>,
    /// When it finished.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Outcome.
    pub status: RunStatus,
    /// Sanitized parameter snapshot.
    pub params: Value,
    /// Bounded text summary of the result on success.
    #[serde(default)]
    pub result_summary: Option<String>,
    /// Structured error on failure.
    #[serde(default)]
    pub error: Option<ErrorRecord>,
}

/// An invocation in progress. Consumed into an [`AuditEntry`] when it
/// completes, so no record can exist for an unfinished call.
#[derive(Debug)]
pub struct Invocation {
    run_id: String,
    kind: EntryKind,
    name: String,
    step_id: Option<String>,
    tool: String,
    params: Value,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl Invocation {
    /// Start timing a direct tool call.
    pub fn tool(run_id: impl Into<String>, tool: &str, params: &Value) -> Self {
        Self::start(run_id.into(), EntryKind::Tool, tool, None, tool, params)
    }

    /// Start timing one step of a flow run.
    pub fn step(
        run_id: impl Into<String>,
        flow: &str,
        step_id: &str,
        tool: &str,
        params: &Value,
    ) -> Self {
        Self::start(
            run_id.into(),
            EntryKind::FlowStep,
            flow,
            Some(step_id.to_string()),
            tool,
            params,
        )
    }

    fn start(
        run_id: String,
        kind: EntryKind,
        name: &str,
        step_id: Option<String>,
        tool: &str,
        params: &Value,
    ) -> Self {
        Self {
            run_id,
            kind,
            name: name.to_string(),
            step_id,
            tool: tool.to_string(),
            params: snapshot(params),
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    /// Complete with a result.
    pub fn succeeded(self, result: &Value) -> AuditEntry {
        let summary = summarize(result);
        self.finish(RunStatus::Success, Some(summary), None)
    }

    /// Complete with an error.
    pub fn failed(self, error: ErrorRecord) -> AuditEntry {
        self.finish(RunStatus::Error, None, Some(error))
    }

    fn finish(
        self,
        status: RunStatus,
        result_summary: Option<String>,
        error: Option<ErrorRecord>,
    ) -> AuditEntry {
        let elapsed = self.clock.elapsed();
        AuditEntry {
            run_id: self.run_id,
            kind: self.kind,
            name: self.name,
            step_id: self.step_id,
            tool: self.tool,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            status,
            params: self.params,
            result_summary,
            error,
        }
    }
}
