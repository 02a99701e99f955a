//! Flow specifications and their validation.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use toolsmith_types::{Namespace, StoreError};

const SIGIL: char = '$';

/// A step parameter or flow output, parsed once at validation time.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamExpr {
    /// Passed through unchanged.
    Literal(Value),
    /// `$inputs.<key>`.
    Input(String),
    /// `$ctx.<key>`.
    Context(String),
}

impl ParamExpr {
    /// Parse a top-level parameter value.
    ///
    /// A string starting with `$` must be `$inputs.<key>` or `$ctx.<key>`;
    /// `$$...` is the literal string with one `$` removed. Every other
    /// value, including nested containers, is a literal.
    pub fn parse(value: &Value) -> Result<Self, String> {
        let Value::String(text) = value else {
            return Ok(Self::Literal(value.clone()));
        };
        let Some(rest) = text.strip_prefix(SIGIL) else {
            return Ok(Self::Literal(value.clone()));
        };
        if rest.starts_with(SIGIL) {
            return Ok(Self::Literal(Value::String(rest.to_string())));
        }
        let reference = |prefix: &str| {
            rest.strip_prefix(prefix)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
        };
        if let Some(key) = reference("inputs.") {
            Ok(Self::Input(key))
        } else if let Some(key) = reference("ctx.") {
            Ok(Self::Context(key))
        } else {
            Err(format!(
                "invalid reference {text:?}: expected $inputs.<key> or $ctx.<key> (use $$ for a literal $)"
            ))
        }
    }

    /// The namespace and key of a reference; `None` for literals.
    pub fn reference(&self) -> Option<(Namespace, &str)> {
        match self {
            Self::Literal(_) => None,
            Self::Input(key) => Some((Namespace::Inputs, key)),
            Self::Context(key) => Some((Namespace::Ctx, key)),
        }
    }

    /// The expression in its stored form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(Value::String(s)) if s.starts_with(SIGIL) => {
                Value::String(format!("{SIGIL}{s}"))
            }
            Self::Literal(value) => value.clone(),
            Self::Input(key) => Value::String(format!("$inputs.{key}")),
            Self::Context(key) => Value::String(format!("$ctx.{key}")),
        }
    }
}

impl Serialize for ParamExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// One step of a flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowStep {
    /// Unique within the flow. Defaults to `step_<n>` (1-based).
    pub id: String,
    /// Tool to invoke.
    pub tool: String,
    /// Parameters passed to the tool.
    pub params: BTreeMap<String, ParamExpr>,
    /// Context key for the result. Defaults to `id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_as: Option<String>,
}

impl FlowStep {
    /// Context key the step's result is stored under.
    pub fn alias(&self) -> &str {
        self.save_as.as_deref().unwrap_or(&self.id)
    }
}

/// A validated, normalized flow specification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSpec {
    /// Unique flow name.
    pub name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Inputs a run must supply.
    pub inputs: Vec<String>,
    /// Steps in execution order. Never empty.
    pub steps: Vec<FlowStep>,
    /// Output expression. `None` when the key is absent, which is not
    /// the same as an explicit `null` literal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ParamExpr>,
}

impl FlowSpec {
    /// Normalized JSON form.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Validate and normalize a raw flow specification.
///
/// Step ids default to `step_<n>`, `params` to an empty mapping, `inputs`
/// to an empty list. Parameter references are parsed here so a malformed
/// reference is rejected at save time.
pub fn validate(raw: &Value) -> Result<FlowSpec, StoreError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| invalid("flow spec must be an object"))?;

    let name = match obj.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        _ => return Err(invalid("'name' is required and must be a non-empty string")),
    };

    let description = match obj.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(d)) => Some(d.clone()),
        Some(_) => return Err(invalid("'description' must be a string")),
    };

    let inputs = match obj.get("inputs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| invalid("'inputs' must be a list of strings"))?,
        Some(_) => return Err(invalid("'inputs' must be a list of strings")),
    };

    let raw_steps = match obj.get("steps") {
        Some(Value::Array(steps)) if !steps.is_empty() => steps,
        _ => return Err(invalid("'steps' is required and must be a non-empty list")),
    };

    let mut seen = HashSet::new();
    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw_step) in raw_steps.iter().enumerate() {
        let step = validate_step(index + 1, raw_step)?;
        if !seen.insert(step.id.clone()) {
            return Err(invalid(format!("duplicate step id '{}'", step.id)));
        }
        steps.push(step);
    }

    let output = match obj.get("output") {
        None => None,
        Some(value) => Some(
            ParamExpr::parse(value).map_err(|e| invalid(format!("'output': {e}")))?,
        ),
    };

    Ok(FlowSpec {
        name,
        description,
        inputs,
        steps,
        output,
    })
}

fn validate_step(position: usize, raw: &Value) -> Result<FlowStep, StoreError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| invalid(format!("step {position} must be an object")))?;

    let id = match obj.get("id") {
        None | Some(Value::Null) => format!("step_{position}"),
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(_) => {
            return Err(invalid(format!(
                "step {position}: 'id' must be a non-empty string"
            )));
        }
    };

    let tool = match obj.get("tool") {
        Some(Value::String(tool)) if !tool.trim().is_empty() => tool.clone(),
        _ => {
            return Err(invalid(format!(
                "step '{id}': 'tool' is required and must be a non-empty string"
            )));
        }
    };

    let empty = Map::new();
    let raw_params = match obj.get("params") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(params)) => params,
        Some(_) => return Err(invalid(format!("step '{id}': 'params' must be an object"))),
    };
    let mut params = BTreeMap::new();
    for (key, value) in raw_params {
        let expr = ParamExpr::parse(value)
            .map_err(|e| invalid(format!("step '{id}': parameter '{key}': {e}")))?;
        params.insert(key.clone(), expr);
    }

    let save_as = match obj.get("save_as") {
        None | Some(Value::Null) => None,
        Some(Value::String(alias)) if !alias.is_empty() => Some(alias.clone()),
        Some(_) => {
            return Err(invalid(format!(
                "step '{id}': 'save_as' must be a non-empty string"
            )));
        }
    };

    Ok(FlowStep {
        id,
        tool,
        params,
        save_as,
    })
}

fn invalid(message: impl Into<String>) -> StoreError {
    StoreError::Validation(message.into())
}
