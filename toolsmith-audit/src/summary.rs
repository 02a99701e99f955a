//! Bounding what goes into an audit record.

use serde_json::Value;

/// Maximum characters kept in a result summary.
pub const SUMMARY_LIMIT: usize = 500;

/// Container depth kept verbatim in a parameter snapshot.
pub const SNAPSHOT_DEPTH: usize = 8;

/// Summarize a result as bounded text: strings verbatim, everything else
/// as compact JSON, truncated to [`SUMMARY_LIMIT`] characters plus `...`.
pub fn summarize(result: &Value) -> String {
    let text = match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate(text, SUMMARY_LIMIT)
}

fn truncate(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}

/// Reduce parameters to a bounded JSON snapshot. Containers nested deeper
/// than [`SNAPSHOT_DEPTH`] are replaced by their compact JSON text.
pub fn snapshot(params: &Value) -> Value {
    snapshot_at(params, 0)
}

fn snapshot_at(value: &Value, depth: usize) -> Value {
    match value {
        Value::Array(items) if depth < SNAPSHOT_DEPTH => Value::Array(
            items
                .iter()
                .map(|item| snapshot_at(item, depth + 1))
                .collect(),
        ),
        Value::Object(map) if depth < SNAPSHOT_DEPTH => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), snapshot_at(v, depth + 1)))
                .collect(),
        ),
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        primitive => primitive.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_of_scalars() {
        assert_eq!(summarize(&json!(5)), "5");
        assert_eq!(summarize(&json!("ok")), "ok");
        assert_eq!(summarize(&json!(null)), "null");
        assert_eq!(summarize(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn summary_is_bounded() {
        let long = "x".repeat(SUMMARY_LIMIT * 3);
        let summary = summarize(&json!(long));
        assert_eq!(summary.chars().count(), SUMMARY_LIMIT + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn summary_truncates_on_char_boundaries() {
        let long = "é".repeat(SUMMARY_LIMIT + 1);
        let summary = summarize(&json!(long));
        assert!(summary.starts_with('é'));
        assert_eq!(summary.chars().count(), SUMMARY_LIMIT + 3);
    }

    #[test]
    fn snapshot_keeps_shallow_values() {
        let params = json!({"x": 1, "tags": ["a", "b"], "nested": {"k": true}});
        assert_eq!(snapshot(&params), params);
    }

    #[test]
    fn snapshot_flattens_deep_nesting() {
        let mut deep = json!("leaf");
        for _ in 0..(SNAPSHOT_DEPTH + 2) {
            deep = json!([deep]);
        }
        let snap = snapshot(&deep);
        let mut cursor = &snap;
        for _ in 0..SNAPSHOT_DEPTH {
            cursor = &cursor[0];
        }
        assert!(cursor.is_string(), "expected text at the depth limit, got {cursor}");
    }
}
