//! Tool calls raised by a run and the results sent back for them.
//!
//! A run pauses in `requires_action` when the assistant wants local data.
//! Each pending [`ToolCall`] is handed to a [`ToolDispatcher`], which must
//! answer with exactly one [`ToolResult`] carrying the same call id.

use async_trait::async_trait;
use persona_gateway_core::ToolCallId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Definition of a tool the assistant may call during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON schema for input parameters.
    pub input_schema: JsonValue,
}

impl ToolDefinition {
    /// Creates a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: JsonValue) -> Self {
        self.input_schema = schema;
        self
    }

    /// Converts the definition to the function-tool format the run API expects.
    #[must_use]
    pub fn to_function_tool(&self) -> JsonValue {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

/// A pending tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: ToolCallId,
    pub name: String,
    /// Decoded arguments. Arguments that are not valid JSON are kept as the
    /// raw string so the dispatcher can report them.
    pub arguments: JsonValue,
}

impl ToolCall {
    /// Creates a tool call from already-decoded arguments.
    #[must_use]
    pub fn new(id: impl Into<ToolCallId>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Creates a tool call from the JSON-encoded argument string sent on the wire.
    #[must_use]
    pub fn from_encoded(
        id: impl Into<ToolCallId>,
        name: impl Into<String>,
        encoded_arguments: &str,
    ) -> Self {
        let arguments = serde_json::from_str(encoded_arguments)
            .unwrap_or_else(|_| JsonValue::String(encoded_arguments.to_string()));
        Self::new(id, name, arguments)
    }
}

/// Output for one tool call.
///
/// Successful outputs are the upstream body with `"success": "true"` merged
/// in; failures are `{ "success": "false", "error": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: ToolCallId,
    pub output: JsonValue,
}

impl ToolResult {
    /// Wraps a successful upstream body.
    ///
    /// Object bodies get the `success` marker merged in; anything else is
    /// nested under `data`.
    #[must_use]
    pub fn success(tool_call_id: ToolCallId, body: JsonValue) -> Self {
        let mut output = match body {
            JsonValue::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        output.insert("success".to_string(), JsonValue::from("true"));
        Self {
            tool_call_id,
            output: JsonValue::Object(output),
        }
    }

    /// Reports a failed call.
    #[must_use]
    pub fn failure(tool_call_id: ToolCallId, error: impl Into<String>) -> Self {
        Self {
            tool_call_id,
            output: serde_json::json!({
                "success": "false",
                "error": error.into(),
            }),
        }
    }

    /// Reports a call to a tool nobody handles.
    #[must_use]
    pub fn unsupported(call: &ToolCall) -> Self {
        Self::failure(call.id.clone(), format!("unsupported tool: {}", call.name))
    }

    /// Returns whether the output carries the success marker.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.output.get("success").and_then(JsonValue::as_str) == Some("true")
    }

    /// Returns the error message of a failed output.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.output.get("error").and_then(JsonValue::as_str)
    }

    /// The output as the string the run API accepts.
    #[must_use]
    pub fn encoded_output(&self) -> String {
        self.output.to_string()
    }
}

/// Executes tool calls on behalf of a run.
///
/// Dispatch never fails: every failure is folded into the returned result
/// so the assistant can read it.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Executes one call and returns its output.
    async fn dispatch(&self, call: &ToolCall) -> ToolResult;
}

/// Dispatcher for personas without tools. Answers every call as unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTools;

#[async_trait]
impl ToolDispatcher for NoTools {
    async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        ToolResult::unsupported(call)
    }
}
