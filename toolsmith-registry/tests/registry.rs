//! Integration tests for the durable tool registry.

use serde_json::{Value, json};
use std::sync::Arc;
use toolsmith_registry::{NativeLoader, ToolRegistry};
use toolsmith_types::{Args, ParamKind, RegistryError, ToolFailure, TypeClass, callable_fn};

fn int_arg(args: &Args, key: &str) -> Result<i64, ToolFailure> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ToolFailure::type_error(format!("{key} must be an integer")))
}

fn loader() -> Arc<NativeLoader> {
    Arc::new(
        NativeLoader::new()
            .with("double", callable_fn(|a| Ok(json!(int_arg(a, "value")? * 2))))
            .with("triple", callable_fn(|a| Ok(json!(int_arg(a, "value")? * 3))))
            .with(
                "bar",
                callable_fn(|a| Ok(json!(int_arg(a, "x")? + int_arg(a, "y")?))),
            )
            .with("typed", callable_fn(|_| Ok(json!(null)))),
    )
}

const DOUBLE: &str = "/// Doubles a value.\nfn double(value: int) -> int\n";

fn args(value: Value) -> Args {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

#[tokio::test]
async fn register_resolve_invoke() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();

    registry.register("double", DOUBLE).await.unwrap();
    let record = registry.resolve("double").await.unwrap();
    assert_eq!(record.invoke(&args(json!({"value": 3}))).await.unwrap(), json!(6));
    assert!(dir.path().join("double.tool").exists());
    assert_eq!(registry.source("double").await.unwrap(), DOUBLE);
}

#[tokio::test]
async fn binding_failures_are_type_errors() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    let record = registry.register("double", DOUBLE).await.unwrap();

    let missing = record.invoke(&Args::new()).await.unwrap_err();
    assert_eq!(missing.kind, "TypeError");
    assert_eq!(missing.message, "missing 1 required argument: 'value'");

    let unknown = record
        .invoke(&args(json!({"value": 1, "z": 2})))
        .await
        .unwrap_err();
    assert_eq!(unknown.message, "got an unexpected keyword argument 'z'");
}

#[tokio::test]
async fn describe_reports_schema() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    registry
        .register("bar", "# Adds two numbers.\nfn bar(x: int, y: int = 0) -> int")
        .await
        .unwrap();

    let d = registry.describe("bar").await.unwrap();
    assert_eq!(d.name, "bar");
    assert_eq!(d.docstring.as_deref(), Some("Adds two numbers."));
    assert_eq!(d.returns.class, TypeClass::Int);
    assert_eq!(d.parameters.len(), 2);

    let x = &d.parameters[0];
    assert!(x.required && !x.has_default);
    assert_eq!(x.kind, ParamKind::Positional);
    assert_eq!(x.annotation.class, TypeClass::Int);

    let y = &d.parameters[1];
    assert!(!y.required && y.has_default);
    assert_eq!(y.default, Some(json!(0)));

    let record = registry.resolve("bar").await.unwrap();
    assert_eq!(record.invoke(&args(json!({"x": 2}))).await.unwrap(), json!(2));
}

#[tokio::test]
async fn describe_classifies_wrapped_annotations() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    registry
        .register(
            "typed",
            "fn typed(cfg: Optional[dict] = null, *, mode: Union[int, str] = 1, raw) -> list[str] | None",
        )
        .await
        .unwrap();

    let d = registry.describe("typed").await.unwrap();
    let wire = serde_json::to_value(&d).unwrap();
    assert_eq!(wire["parameters"][0]["annotation"]["type"], "json");
    assert_eq!(wire["parameters"][0]["annotation"]["raw"], "Optional[dict]");
    assert_eq!(wire["parameters"][0]["has_default"], true);
    assert_eq!(wire["parameters"][0]["default"], Value::Null);
    assert_eq!(wire["parameters"][1]["annotation"]["type"], "any");
    assert_eq!(wire["parameters"][1]["kind"], "keyword");
    assert_eq!(wire["parameters"][2]["annotation"]["raw"], Value::Null);
    assert_eq!(wire["parameters"][2]["required"], true);
    assert_eq!(wire["returns"]["type"], "json");
}

#[tokio::test]
async fn describe_is_idempotent_without_edits() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    registry.register("double", DOUBLE).await.unwrap();

    let first = registry.describe("double").await.unwrap();
    let second = registry.describe("double").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn load_error_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();

    let err = registry
        .register("broken", "print('no callable here')")
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Load { .. }));
    assert_eq!(err.kind_name(), "LoadError");

    let err = registry
        .register("unbound", "fn nothing_compiled_in()")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no implementation bound for nothing_compiled_in"));

    assert!(registry.list().await.is_empty());
    assert!(!dir.path().join("broken.tool").exists());
    assert!(matches!(
        registry.resolve("broken").await.unwrap_err(),
        RegistryError::NotFound(_)
    ));
}

#[tokio::test]
async fn overwrite_replaces_record() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();

    registry.register("scale", DOUBLE).await.unwrap();
    registry
        .register("scale", "fn triple(value: int) -> int")
        .await
        .unwrap();

    let record = registry.resolve("scale").await.unwrap();
    assert_eq!(record.entrypoint(), "triple");
    assert_eq!(record.invoke(&args(json!({"value": 2}))).await.unwrap(), json!(6));
    assert_eq!(registry.list().await, ["scale"]);
}

#[tokio::test]
async fn edits_on_disk_take_effect_without_reload() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    registry.register("scale", DOUBLE).await.unwrap();
    assert_eq!(
        registry.describe("scale").await.unwrap().docstring.as_deref(),
        Some("Doubles a value.")
    );

    tokio::fs::write(
        registry.artifact_path("scale"),
        "/// Triples a value, edited by hand.\nfn triple(value: int) -> int\n",
    )
    .await
    .unwrap();

    let d = registry.describe("scale").await.unwrap();
    assert_eq!(d.docstring.as_deref(), Some("Triples a value, edited by hand."));
    assert_eq!(d.entrypoint, "triple");
    let record = registry.resolve("scale").await.unwrap();
    assert_eq!(record.invoke(&args(json!({"value": 4}))).await.unwrap(), json!(12));
}

#[tokio::test]
async fn deleted_artifact_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    registry.register("double", DOUBLE).await.unwrap();
    registry.resolve("double").await.unwrap();

    tokio::fs::remove_file(registry.artifact_path("double"))
        .await
        .unwrap();

    let err = registry.resolve("double").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(ref n) if n == "double"));
    assert_eq!(err.kind_name(), "NotFoundError");
    assert!(registry.list().await.is_empty());
}

#[tokio::test]
async fn externally_written_artifacts_are_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();

    tokio::fs::write(dir.path().join("dropped.tool"), DOUBLE)
        .await
        .unwrap();

    let record = registry.resolve("dropped").await.unwrap();
    assert_eq!(record.invoke(&args(json!({"value": 5}))).await.unwrap(), json!(10));
    assert_eq!(registry.list().await, ["dropped"]);
}

#[tokio::test]
async fn remove_and_remove_missing() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    registry.register("double", DOUBLE).await.unwrap();

    assert!(registry.remove("double").await.unwrap());
    assert!(!dir.path().join("double.tool").exists());
    assert!(registry.list().await.is_empty());
    assert!(matches!(
        registry.describe("double").await.unwrap_err(),
        RegistryError::NotFound(_)
    ));

    assert!(!registry.remove("double").await.unwrap());
    assert!(!registry.remove("never-existed").await.unwrap());
}

#[tokio::test]
async fn list_is_sorted_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
        for name in ["zeta", "alpha", "mid/with slash"] {
            registry.register(name, DOUBLE).await.unwrap();
        }
        assert_eq!(registry.list().await, ["alpha", "mid/with slash", "zeta"]);
    }

    let reopened = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    assert_eq!(reopened.list().await, ["alpha", "mid/with slash", "zeta"]);
    let record = reopened.resolve("mid/with slash").await.unwrap();
    assert_eq!(record.invoke(&args(json!({"value": 1}))).await.unwrap(), json!(2));
}

#[tokio::test]
async fn open_on_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path().join("tools"), loader())
        .await
        .unwrap();
    assert!(registry.list().await.is_empty());
    registry.register("double", DOUBLE).await.unwrap();
    assert!(dir.path().join("tools").join("double.tool").exists());
}

#[tokio::test]
async fn catalog_skips_broken_tools() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    registry.register("double", DOUBLE).await.unwrap();
    registry.register("broken", DOUBLE).await.unwrap();

    tokio::fs::write(registry.artifact_path("broken"), "not a tool at all")
        .await
        .unwrap();

    let catalog = registry.catalog().await;
    let names: Vec<_> = catalog.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["double"]);
    assert!(matches!(
        registry.resolve("broken").await.unwrap_err(),
        RegistryError::Load { .. }
    ));
}

#[tokio::test]
async fn empty_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    let err = registry.register("  ", DOUBLE).await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidName(_)));
}

#[tokio::test]
async fn hand_placed_non_canonical_files_are_not_indexed() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("double.tool"), DOUBLE).await.unwrap();
    tokio::fs::write(dir.path().join("a%2bb.tool"), DOUBLE).await.unwrap();
    tokio::fs::write(dir.path().join("%2Edouble%2e.tool"), DOUBLE).await.unwrap();

    let registry = ToolRegistry::open(dir.path(), loader()).await.unwrap();
    assert_eq!(registry.list().await, ["double"]);
    for name in registry.list().await {
        registry.resolve(&name).await.unwrap();
    }
}

#[tokio::test]
async fn concurrent_registers_and_resolves_settle_on_the_disk_source() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(ToolRegistry::open(dir.path(), loader()).await.unwrap());
    registry.register("shared", DOUBLE).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let writer = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let entrypoint = if i % 2 == 0 { "double" } else { "triple" };
            let source = format!(
                "/// Version {i}{}\nfn {entrypoint}(value: int) -> int\n",
                ".".repeat(i)
            );
            writer.register("shared", &source).await.unwrap();
        }));
        let reader = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let record = reader.resolve("shared").await.unwrap();
            let out = record.invoke(&args(json!({"value": 1}))).await.unwrap();
            assert!(out == json!(2) || out == json!(3), "unexpected {out}");
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let on_disk = tokio::fs::read_to_string(registry.artifact_path("shared"))
        .await
        .unwrap();
    let live = registry.resolve("shared").await.unwrap();
    assert_eq!(live.source(), on_disk);
    let expected = if on_disk.contains("fn double") { json!(2) } else { json!(3) };
    assert_eq!(live.invoke(&args(json!({"value": 1}))).await.unwrap(), expected);
    assert_eq!(registry.list().await, ["shared"]);
}
