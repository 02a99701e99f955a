//! Audited invocation of a single tool, outside any flow.

use serde_json::Value;
use std::sync::Arc;
use toolsmith_audit::{AuditEntry, AuditLog, ErrorRecord, Invocation};
use toolsmith_registry::ToolRegistry;
use toolsmith_types::{Args, InvokeError};

/// Resolve `name`, bind `args` against its schema and call it.
pub(crate) async fn call(
    registry: &ToolRegistry,
    name: &str,
    args: &Args,
) -> Result<Value, InvokeError> {
    let record = registry.resolve(name).await?;
    Ok(record.invoke(args).await?)
}

/// Append an entry, logging instead of failing when the write does not
/// go through.
pub(crate) async fn record(audit: &AuditLog, stream: &str, entry: &AuditEntry) {
    if let Err(e) = audit.append(stream, entry).await {
        tracing::warn!(stream, run_id = %entry.run_id, error = %e, "failed to write audit entry");
    }
}

/// Invokes tools by name and writes one entry per call to the tool's
/// audit stream.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    audit: Arc<AuditLog>,
}

impl ToolInvoker {
    /// Create an invoker over a registry and an audit log.
    pub fn new(registry: Arc<ToolRegistry>, audit: Arc<AuditLog>) -> Self {
        Self { registry, audit }
    }

    /// Invoke a tool with a parameter mapping.
    ///
    /// Resolution failures and tool failures are both recorded, then
    /// returned with their identity intact.
    pub async fn invoke(&self, name: &str, params: &Args) -> Result<Value, InvokeError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let invocation = Invocation::tool(&run_id, name, &Value::Object(params.clone()));
        let outcome = call(&self.registry, name, params).await;
        let entry = match &outcome {
            Ok(result) => invocation.succeeded(result),
            Err(err) => invocation.failed(ErrorRecord::from(err)),
        };
        record(&self.audit, &AuditLog::tool_stream(name), &entry).await;

        match &outcome {
            Ok(_) => tracing::debug!(tool = name, %run_id, "tool invoked"),
            Err(e) => tracing::warn!(tool = name, %run_id, error = %e, "tool invocation failed"),
        }
        outcome
    }
}
