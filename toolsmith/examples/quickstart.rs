//! Register two tools, chain them into a flow, run it and print the audit
//! trail.
//!
//! ```sh
//! cargo run -p toolsmith --example quickstart
//! ```

use serde_json::{Value, json};
use std::sync::Arc;
use toolsmith::prelude::*;

fn int_arg(args: &Args, key: &str) -> Result<i64, ToolFailure> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolFailure::type_error(format!("{key} must be an integer")))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let loader = NativeLoader::new()
        .with("double", callable_fn(|a| Ok(json!(int_arg(a, "value")? * 2))))
        .with("add_one", callable_fn(|a| Ok(json!(int_arg(a, "value")? + 1))));

    let root = tempfile::tempdir()?;
    let ts = Toolsmith::open(ToolsmithConfig::under(root.path()), Arc::new(loader)).await?;

    ts.register_tool("double", "/// Doubles a value.\nfn double(value: int) -> int")
        .await?;
    ts.register_tool("add_one", "/// Adds one.\nfn add_one(value: int) -> int")
        .await?;

    ts.create_flow(&json!({
        "name": "math_chain",
        "inputs": ["value"],
        "steps": [
            {"id": "first", "tool": "double", "params": {"value": "$inputs.value"}, "save_as": "doubled"},
            {"id": "second", "tool": "add_one", "params": {"value": "$ctx.doubled"}, "save_as": "result"}
        ],
        "output": "$ctx.result"
    }))
    .await?;

    let output = ts.run_flow("math_chain", &json!({"value": 3})).await?;
    println!("math_chain(3) = {output}");

    for entry in ts.flow_runs("math_chain", None).await? {
        println!(
            "{} {:>7} {:?} -> {}",
            entry.step_id.unwrap_or_default(),
            entry.tool,
            entry.status,
            entry.result_summary.unwrap_or_default()
        );
    }

    for tool in ts.tool_catalog().await {
        println!("{}: {}", tool.name, serde_json::to_string(&tool.parameters)?);
    }
    Ok(())
}
