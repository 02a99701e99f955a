//! Run-scoped context: inputs, saved results and the last result.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use toolsmith_flow::ParamExpr;
use toolsmith_types::{Args, FlowError, Namespace};

/// State owned by exactly one flow run. Created empty for every run and
/// dropped when the run ends.
#[derive(Debug)]
pub struct RunContext {
    inputs: Args,
    saved: HashMap<String, Value>,
    last: Option<Value>,
}

impl RunContext {
    /// A fresh context over the run's inputs.
    pub fn new(inputs: Args) -> Self {
        Self {
            inputs,
            saved: HashMap::new(),
            last: None,
        }
    }

    /// Resolve one expression. Literals pass through unchanged.
    pub fn resolve(&self, expr: &ParamExpr) -> Result<Value, FlowError> {
        let (namespace, key) = match expr {
            ParamExpr::Literal(value) => return Ok(value.clone()),
            ParamExpr::Input(key) => (Namespace::Inputs, key),
            ParamExpr::Context(key) => (Namespace::Ctx, key),
        };
        let found = match namespace {
            Namespace::Inputs => self.inputs.get(key),
            Namespace::Ctx => self.saved.get(key),
        };
        found.cloned().ok_or_else(|| FlowError::Reference {
            expr: format!("${namespace}.{key}"),
            namespace,
        })
    }

    /// Resolve a step's parameter mapping.
    pub fn resolve_params(&self, params: &BTreeMap<String, ParamExpr>) -> Result<Args, FlowError> {
        params
            .iter()
            .map(|(name, expr)| Ok((name.clone(), self.resolve(expr)?)))
            .collect()
    }

    /// Save a step result under its alias and make it the last result.
    pub fn store(&mut self, alias: &str, result: Value) {
        self.saved.insert(alias.to_string(), result.clone());
        self.last = Some(result);
    }

    /// Consume the context, keeping only the most recent step result.
    pub fn into_last(self) -> Option<Value> {
        self.last
    }
}
