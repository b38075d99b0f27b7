//! Response envelopes.
//!
//! Every invocation ends here: a [`ResultSet`] or a [`ToolError`] becomes a
//! `CallToolResult` whose text and structured content carry the same JSON.
//! Failures are results with `is_error` set, never protocol faults.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::error::ToolError;
use super::executor::ResultSet;

/// Failure payload returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolFailure {
    pub error_kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&ToolError> for ToolFailure {
    fn from(error: &ToolError) -> Self {
        Self {
            error_kind: error.kind().to_string(),
            message: error.to_string(),
            parameter: error.parameter().map(str::to_string),
            reason: error.reason().map(str::to_string),
        }
    }
}

/// Build the protocol result for an invocation outcome.
pub fn to_call_result(outcome: &Result<ResultSet, ToolError>) -> CallToolResult {
    match outcome {
        Ok(result) => structured(result, false),
        Err(error) => structured(&ToolFailure::from(error), true),
    }
}

fn structured<T: Serialize>(payload: &T, is_error: bool) -> CallToolResult {
    match serde_json::to_value(payload) {
        Ok(value) => CallToolResult {
            content: vec![Content::text(value.to_string())],
            structured_content: Some(value),
            is_error: Some(is_error),
            meta: None,
        },
        Err(e) => {
            warn!("Failed to serialize tool output: {}", e);
            CallToolResult::error(vec![Content::text(format!(
                "Failed to serialize tool output: {}",
                e
            ))])
        }
    }
}

/// The JSON-RPC shape of a result, as served over HTTP.
pub fn call_result_json(result: &CallToolResult) -> Value {
    let mut response = serde_json::json!({
        "content": result.content,
        "isError": result.is_error.unwrap_or(false),
    });
    if let (Some(structured), Some(map)) = (&result.structured_content, response.as_object_mut()) {
        map.insert("structuredContent".to_string(), structured.clone());
    }
    response
}
