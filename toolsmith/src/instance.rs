//! The context object wiring registry, flow store, engine and audit log.

use crate::config::ToolsmithConfig;
use crate::error::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use toolsmith_audit::{AuditEntry, AuditLog, DEFAULT_LIMIT, coerce_limit_value};
use toolsmith_engine::{FlowEngine, FlowReport, ToolInvoker};
use toolsmith_flow::{FileFlowStore, FlowSpec, FlowStore};
use toolsmith_registry::{ToolDescription, ToolRegistry};
use toolsmith_types::{Args, ArtifactLoader, Synthesizer};

/// One independent toolsmith instance.
///
/// Everything a caller does goes through an instance built from a
/// [`ToolsmithConfig`]; two instances over different directories share
/// nothing.
///
/// # Example
///
/// ```ignore
/// let loader = Arc::new(NativeLoader::new().with("double", double));
/// let ts = Toolsmith::open(ToolsmithConfig::under("/srv/ts"), loader).await?;
/// ts.register_tool("double", "fn double(value: int) -> int").await?;
/// assert_eq!(ts.use_tool("double", &json!({"value": 2})).await?, json!(4));
/// ```
pub struct Toolsmith {
    config: ToolsmithConfig,
    registry: Arc<ToolRegistry>,
    flows: Arc<FileFlowStore>,
    audit: Arc<AuditLog>,
    engine: FlowEngine,
    invoker: ToolInvoker,
    synthesizer: Option<Arc<dyn Synthesizer>>,
}

impl Toolsmith {
    /// Open an instance over the configured directories, indexing the
    /// tools already registered there.
    pub async fn open(config: ToolsmithConfig, loader: Arc<dyn ArtifactLoader>) -> Result<Self> {
        let registry = Arc::new(ToolRegistry::open(&config.tools_dir, loader).await?);
        let flows = Arc::new(FileFlowStore::new(&config.flows_dir));
        let audit = Arc::new(AuditLog::new(&config.log_dir));
        let engine = FlowEngine::new(
            Arc::clone(&registry),
            Arc::clone(&flows) as Arc<dyn FlowStore>,
            Arc::clone(&audit),
        );
        let invoker = ToolInvoker::new(Arc::clone(&registry), Arc::clone(&audit));
        tracing::info!(
            tools_dir = %config.tools_dir.display(),
            flows_dir = %config.flows_dir.display(),
            log_dir = %config.log_dir.display(),
            "toolsmith opened"
        );
        Ok(Self {
            config,
            registry,
            flows,
            audit,
            engine,
            invoker,
            synthesizer: None,
        })
    }

    /// Attach the synthesizer used by [`create_tool`](Self::create_tool).
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// The configuration this instance was opened with.
    pub fn config(&self) -> &ToolsmithConfig {
        &self.config
    }

    /// The tool registry.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The flow engine.
    pub fn engine(&self) -> &FlowEngine {
        &self.engine
    }

    /// Generate a tool from a description and register it.
    pub async fn create_tool(&self, name: &str, description: &str) -> Result<ToolDescription> {
        let synthesizer = self
            .synthesizer
            .as_ref()
            .ok_or_else(|| Error::Validation("no synthesizer configured".into()))?;
        let source = synthesizer.synthesize(name, description).await?;
        tracing::info!(tool = name, "synthesized tool source");
        self.register_tool(name, &source).await
    }

    /// Register tool source under `name`, replacing any existing tool.
    pub async fn register_tool(&self, name: &str, source: &str) -> Result<ToolDescription> {
        Ok(self.registry.register(name, source).await?.describe())
    }

    /// Call a tool directly. `params` must be an object; `null` means no
    /// parameters.
    pub async fn use_tool(&self, name: &str, params: &Value) -> Result<Value> {
        let params = mapping(params, "params")?;
        Ok(self.invoker.invoke(name, &params).await?)
    }

    /// Describe a tool.
    pub async fn describe_tool(&self, name: &str) -> Result<ToolDescription> {
        Ok(self.registry.describe(name).await?)
    }

    /// The persisted source text of a tool.
    pub async fn tool_source(&self, name: &str) -> Result<String> {
        Ok(self.registry.source(name).await?)
    }

    /// Registered tool names, sorted.
    pub async fn list_tools(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Descriptions of every describable tool.
    pub async fn tool_catalog(&self) -> Vec<ToolDescription> {
        self.registry.catalog().await
    }

    /// Remove a tool. Returns whether it existed.
    pub async fn remove_tool(&self, name: &str) -> Result<bool> {
        Ok(self.registry.remove(name).await?)
    }

    /// Recent direct calls of a tool, most recent first.
    pub async fn tool_runs(&self, name: &str, limit: Option<i64>) -> Result<Vec<AuditEntry>> {
        Ok(self.audit.tool_runs(name, limit).await?)
    }

    /// Validate and save a flow spec. Returns its normalized form.
    pub async fn create_flow(&self, spec: &Value) -> Result<FlowSpec> {
        Ok(self.flows.save(spec).await?)
    }

    /// Stored flow names, sorted.
    pub async fn list_flows(&self) -> Result<Vec<String>> {
        Ok(self.flows.list().await?)
    }

    /// A stored flow spec.
    pub async fn describe_flow(&self, name: &str) -> Result<FlowSpec> {
        self.flows
            .get(name)
            .await?
            .ok_or_else(|| Error::FlowNotFound(name.to_string()))
    }

    /// Delete a flow. Returns whether it existed.
    pub async fn delete_flow(&self, name: &str) -> Result<bool> {
        Ok(self.flows.delete(name).await?)
    }

    /// Run a flow. `null` inputs mean no inputs.
    pub async fn run_flow(&self, name: &str, inputs: &Value) -> Result<Value> {
        Ok(self.run_flow_with_report(name, inputs).await?.output)
    }

    /// Run a flow and keep the step records.
    pub async fn run_flow_with_report(&self, name: &str, inputs: &Value) -> Result<FlowReport> {
        let inputs = match inputs {
            Value::Null => Value::Object(Args::new()),
            other => other.clone(),
        };
        Ok(self.engine.run_with_report(name, &inputs).await?)
    }

    /// Recent step records of a flow, most recent first.
    pub async fn flow_runs(&self, name: &str, limit: Option<i64>) -> Result<Vec<AuditEntry>> {
        Ok(self.audit.flow_runs(name, limit).await?)
    }

    /// Coerce an untyped record limit received at a request boundary.
    /// Anything but a positive integer becomes the default of 20.
    pub fn coerce_limit(limit: &Value) -> i64 {
        i64::try_from(coerce_limit_value(limit)).unwrap_or(DEFAULT_LIMIT as i64)
    }
}

impl std::fmt::Debug for Toolsmith {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolsmith")
            .field("config", &self.config)
            .field("synthesizer", &self.synthesizer.is_some())
            .finish_non_exhaustive()
    }
}

fn mapping(value: &Value, what: &str) -> Result<Args> {
    match value {
        Value::Null => Ok(Args::new()),
        Value::Object(map) => Ok(map.clone()),
        _ => Err(Error::Validation(format!("{what} must be an object"))),
    }
}
