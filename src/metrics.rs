//! Result aggregation over terminal API payloads.
//!
//! The remote service returns a nested structure: an `extraction_result` list
//! whose entries may carry a `result` field that is itself a JSON-encoded
//! string containing a `metadata` object with `embedding` and `extraction_llm`
//! cost/token lists. Everything here is tolerant of malformed payloads:
//! aggregation degrades to `None`, it never aborts a file.

use serde_json::Value;

/// Cost and token totals derived from a terminal result payload.
///
/// Fields are `None` (not zero) when the corresponding phase did not occur,
/// which downstream reporting distinguishes from "cost was zero".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageMetrics {
    pub embedding_cost: Option<f64>,
    pub embedding_tokens: Option<i64>,
    pub llm_cost: Option<f64>,
    pub llm_tokens: Option<i64>,
}

impl UsageMetrics {
    /// Sum costs and token counts across every `extraction_result` entry.
    pub fn from_result(result: &Value) -> Self {
        let mut metrics = Self::default();

        let entries = result.get("extraction_result").and_then(Value::as_array);
        for entry in entries.into_iter().flatten() {
            let metadata = nested_metadata(entry);
            accumulate(
                metadata.get("embedding"),
                "embedding_tokens",
                &mut metrics.embedding_cost,
                &mut metrics.embedding_tokens,
            );
            accumulate(
                metadata.get("extraction_llm"),
                "llm_tokens",
                &mut metrics.llm_cost,
                &mut metrics.llm_tokens,
            );
        }

        metrics
    }
}

/// Parse an entry's nested `result` string. Unparseable or missing JSON is
/// treated as an empty object so aggregation proceeds with nulls.
fn nested_metadata(entry: &Value) -> Value {
    let nested = match entry.get("result") {
        Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or(Value::Null),
        // Some deployments inline the object instead of string-encoding it.
        Some(other) => other.clone(),
        None => Value::Null,
    };
    nested.get("metadata").cloned().unwrap_or(Value::Null)
}

fn accumulate(
    list: Option<&Value>,
    token_field: &str,
    cost: &mut Option<f64>,
    tokens: &mut Option<i64>,
) {
    for item in list.and_then(Value::as_array).into_iter().flatten() {
        if let Some(c) = item.get("cost_in_dollars").and_then(as_f64_lenient) {
            *cost = Some(cost.unwrap_or(0.0) + c);
        }
        if let Some(t) = item.get(token_field).and_then(Value::as_i64) {
            *tokens = Some(tokens.unwrap_or(0) + t);
        }
    }
}

/// Costs arrive either as JSON numbers or as decimal strings like `"0.01"`.
fn as_f64_lenient(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract a human-readable error message from a terminal payload.
///
/// Scans `extraction_result` entries for a non-empty `error`, falls back to a
/// top-level `error`, and finally to a fixed placeholder.
pub fn error_message(result: &Value) -> String {
    let entries = result.get("extraction_result").and_then(Value::as_array);
    for entry in entries.into_iter().flatten() {
        if let Some(message) = entry.get("error").and_then(Value::as_str) {
            if !message.is_empty() {
                return message.to_string();
            }
        }
    }

    if let Some(message) = result.get("error").and_then(Value::as_str) {
        if !message.is_empty() {
            return message.to_string();
        }
    }

    "Unknown error".to_string()
}
