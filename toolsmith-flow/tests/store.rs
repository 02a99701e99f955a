//! Integration tests for the flow stores.

use serde_json::{Value, json};
use std::sync::Arc;
use toolsmith_flow::{FileFlowStore, FlowStore, InMemoryFlowStore, ParamExpr};
use toolsmith_types::StoreError;

fn math_chain() -> Value {
    json!({
        "name": "math_chain",
        "description": "double then add one",
        "inputs": ["value"],
        "steps": [
            {"id": "first", "tool": "double", "params": {"value": "$inputs.value"}, "save_as": "doubled"},
            {"tool": "add_one", "params": {"value": "$ctx.doubled"}}
        ],
        "output": "$ctx.step_2"
    })
}

async fn crud(store: &dyn FlowStore) {
    assert!(store.get("math_chain").await.unwrap().is_none());
    assert!(store.list().await.unwrap().is_empty());

    let saved = store.save(&math_chain()).await.unwrap();
    assert_eq!(saved.steps[1].id, "step_2");
    assert_eq!(store.get("math_chain").await.unwrap(), Some(saved.clone()));

    store
        .save(&json!({"name": "another", "steps": [{"tool": "t"}]}))
        .await
        .unwrap();
    assert_eq!(store.list().await.unwrap(), ["another", "math_chain"]);

    assert!(store.delete("another").await.unwrap());
    assert!(!store.delete("another").await.unwrap());
    assert_eq!(store.list().await.unwrap(), ["math_chain"]);
}

async fn overwrite(store: &dyn FlowStore) {
    store.save(&math_chain()).await.unwrap();
    store
        .save(&json!({"name": "math_chain", "steps": [{"tool": "only"}]}))
        .await
        .unwrap();
    let spec = store.get("math_chain").await.unwrap().unwrap();
    assert_eq!(spec.steps.len(), 1);
    assert_eq!(spec.steps[0].tool, "only");
    assert_eq!(spec.description, None);
}

async fn rejects_invalid(store: &dyn FlowStore) {
    let err = store
        .save(&json!({"name": "bad", "steps": [{"tool": "t", "params": {"v": "$oops"}}]}))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(store.get("bad").await.unwrap().is_none());
}

#[tokio::test]
async fn file_store_crud() {
    let dir = tempfile::tempdir().unwrap();
    crud(&FileFlowStore::new(dir.path().join("flows"))).await;
}

#[tokio::test]
async fn memory_store_crud() {
    crud(&InMemoryFlowStore::new()).await;
}

#[tokio::test]
async fn file_store_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    overwrite(&FileFlowStore::new(dir.path())).await;
}

#[tokio::test]
async fn memory_store_overwrite() {
    overwrite(&InMemoryFlowStore::new()).await;
}

#[tokio::test]
async fn file_store_rejects_invalid() {
    let dir = tempfile::tempdir().unwrap();
    rejects_invalid(&FileFlowStore::new(dir.path())).await;
}

#[tokio::test]
async fn memory_store_rejects_invalid() {
    rejects_invalid(&InMemoryFlowStore::new()).await;
}

#[tokio::test]
async fn file_store_writes_normalized_pretty_json() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileFlowStore::new(dir.path());
    store.save(&math_chain()).await.unwrap();

    let text = tokio::fs::read_to_string(dir.path().join("math_chain.json"))
        .await
        .unwrap();
    assert!(text.contains("\n  \"name\": \"math_chain\""));
    let stored: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(stored["steps"][1]["id"], "step_2");
    assert_eq!(stored["steps"][1]["params"]["value"], "$ctx.doubled");
    assert_eq!(stored["steps"][0]["save_as"], "doubled");
    assert!(stored["steps"][1].get("save_as").is_none());
}

#[tokio::test]
async fn output_null_and_absent_survive_storage() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileFlowStore::new(dir.path());
    store
        .save(&json!({"name": "nulled", "steps": [{"tool": "t"}], "output": null}))
        .await
        .unwrap();
    store
        .save(&json!({"name": "absent", "steps": [{"tool": "t"}]}))
        .await
        .unwrap();

    let nulled = store.get("nulled").await.unwrap().unwrap();
    assert_eq!(nulled.output, Some(ParamExpr::Literal(Value::Null)));
    let absent = store.get("absent").await.unwrap().unwrap();
    assert_eq!(absent.output, None);
}

#[tokio::test]
async fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    FileFlowStore::new(dir.path())
        .save(&math_chain())
        .await
        .unwrap();

    let reopened = FileFlowStore::new(dir.path());
    assert_eq!(reopened.list().await.unwrap(), ["math_chain"]);
    let spec = reopened.get("math_chain").await.unwrap().unwrap();
    assert_eq!(spec.description.as_deref(), Some("double then add one"));
    assert_eq!(spec.steps[0].params["value"], ParamExpr::Input("value".into()));
}

#[tokio::test]
async fn file_store_names_are_path_safe() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileFlowStore::new(dir.path().join("flows"));
    store
        .save(&json!({"name": "../escape", "steps": [{"tool": "t"}]}))
        .await
        .unwrap();
    assert!(!dir.path().join("escape.json").exists());
    assert_eq!(store.list().await.unwrap(), ["../escape"]);
    assert!(store.get("../escape").await.unwrap().is_some());
}

#[tokio::test]
async fn corrupt_file_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("broken.json"), "{ nope")
        .await
        .unwrap();
    let store = FileFlowStore::new(dir.path());
    assert!(matches!(
        store.get("broken").await.unwrap_err(),
        StoreError::Serialization(_)
    ));
}

#[tokio::test]
async fn concurrent_saves_of_one_name_leave_a_whole_spec() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileFlowStore::new(dir.path()));
    store
        .save(&json!({"name": "shared", "steps": [{"tool": "t0"}]}))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 1..=16usize {
        let writer = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let steps: Vec<Value> = (0..i).map(|_| json!({"tool": format!("t{i}")})).collect();
            writer
                .save(&json!({"name": "shared", "steps": steps}))
                .await
                .unwrap();
        }));
        let reader = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let spec = reader.get("shared").await.unwrap().unwrap();
            let tool = &spec.steps[0].tool;
            assert!(spec.steps.iter().all(|s| &s.tool == tool));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let spec = store.get("shared").await.unwrap().unwrap();
    let n: usize = spec.steps[0].tool[1..].parse().unwrap();
    assert_eq!(spec.steps.len(), n.max(1));
    assert_eq!(store.list().await.unwrap(), ["shared"]);
}
