//! The flow execution engine.

use crate::context::RunContext;
use crate::invoke::{call, record};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use toolsmith_audit::{AuditEntry, AuditLog, ErrorRecord, Invocation};
use toolsmith_flow::FlowStore;
use toolsmith_registry::ToolRegistry;
use toolsmith_types::FlowError;

/// Outcome of a successful flow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    /// Identifier shared by every audit entry of the run.
    pub run_id: String,
    /// The flow's output.
    pub output: Value,
    /// Audit entries of the completed steps, in execution order.
    pub steps: Vec<AuditEntry>,
}

/// Runs stored flows against a tool registry.
///
/// Each run owns a fresh [`RunContext`]. Steps run strictly in declared
/// order; the first failure aborts the run and nothing is retried.
#[derive(Clone)]
pub struct FlowEngine {
    registry: Arc<ToolRegistry>,
    flows: Arc<dyn FlowStore>,
    audit: Arc<AuditLog>,
}

impl FlowEngine {
    /// Create an engine.
    pub fn new(
        registry: Arc<ToolRegistry>,
        flows: Arc<dyn FlowStore>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            registry,
            flows,
            audit,
        }
    }

    /// Run a flow and return its output.
    pub async fn run(&self, name: &str, inputs: &Value) -> Result<Value, FlowError> {
        Ok(self.run_with_report(name, inputs).await?.output)
    }

    /// Run a flow and return its output together with the step records.
    ///
    /// - The flow must exist and `inputs` must be a mapping holding every
    ///   declared input; otherwise nothing runs and nothing is logged.
    /// - A reference that does not resolve aborts the run before the
    ///   step's tool is invoked, so no entry is written for that step.
    /// - A step whose tool cannot be resolved or raises is logged as a
    ///   failed entry, then its error is returned unchanged.
    pub async fn run_with_report(&self, name: &str, inputs: &Value) -> Result<FlowReport, FlowError> {
        let spec = self
            .flows
            .get(name)
            .await?
            .ok_or_else(|| FlowError::NotFound(name.to_string()))?;
        let inputs = inputs
            .as_object()
            .ok_or_else(|| FlowError::Validation("inputs must be an object".into()))?;

        let mut missing: Vec<String> = spec
            .inputs
            .iter()
            .filter(|key| !inputs.contains_key(key.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(FlowError::MissingInput(missing));
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let stream = AuditLog::flow_stream(&spec.name);
        tracing::info!(flow = %spec.name, %run_id, steps = spec.steps.len(), "flow run started");

        let mut ctx = RunContext::new(inputs.clone());
        let mut steps = Vec::with_capacity(spec.steps.len());
        for step in &spec.steps {
            let params = ctx.resolve_params(&step.params)?;
            tracing::debug!(flow = %spec.name, step = %step.id, tool = %step.tool, "invoking step");

            let invocation = Invocation::step(
                &run_id,
                &spec.name,
                &step.id,
                &step.tool,
                &Value::Object(params.clone()),
            );
            match call(&self.registry, &step.tool, &params).await {
                Ok(result) => {
                    let entry = invocation.succeeded(&result);
                    record(&self.audit, &stream, &entry).await;
                    steps.push(entry);
                    ctx.store(step.alias(), result);
                }
                Err(err) => {
                    let entry = invocation.failed(ErrorRecord::from(&err));
                    record(&self.audit, &stream, &entry).await;
                    tracing::warn!(
                        flow = %spec.name,
                        %run_id,
                        step = %step.id,
                        error = %err,
                        "flow run failed"
                    );
                    return Err(err.into());
                }
            }
        }

        let output = match &spec.output {
            Some(expr) => ctx.resolve(expr)?,
            None => ctx.into_last().unwrap_or(Value::Null),
        };
        tracing::info!(flow = %spec.name, %run_id, "flow run finished");
        Ok(FlowReport {
            run_id,
            output,
            steps,
        })
    }
}

impl std::fmt::Debug for FlowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("registry", &self.registry)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}
