//! Runs: one execution of an assistant against a thread.
//!
//! The remote service owns the run lifecycle. The gateway only observes the
//! status by polling and reacts to it; it never forces a transition.

use crate::tool::ToolCall;
use persona_gateway_core::{AssistantId, RunId, ThreadId, ToolCallId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// The status of a run as reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// A status this gateway does not know yet; treated as still running.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Returns the wire name of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run as returned by create, retrieve and submit-tool-outputs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub thread_id: ThreadId,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunLastError>,
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

impl Run {
    /// Returns the tool calls the run is waiting on, decoded.
    ///
    /// Empty unless the run is in `requires_action`.
    #[must_use]
    pub fn pending_tool_calls(&self) -> Vec<ToolCall> {
        if self.status != RunStatus::RequiresAction {
            return Vec::new();
        }
        self.required_action
            .as_ref()
            .map(|action| {
                action
                    .submit_tool_outputs
                    .tool_calls
                    .iter()
                    .map(|call| {
                        ToolCall::from_encoded(
                            call.id.clone(),
                            call.function.name.clone(),
                            &call.function.arguments,
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Explains why a run stopped short of completion, when the service said so.
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        if let Some(err) = &self.last_error {
            return Some(format!("{}: {}", err.code, err.message));
        }
        self.incomplete_details
            .as_ref()
            .and_then(|details| details.reason.clone())
    }
}

/// What the run needs from the gateway before it can continue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputsAction,
}

/// The tool calls of a `requires_action` pause.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitToolOutputsAction {
    pub tool_calls: Vec<RemoteToolCall>,
}

/// A tool call in wire format; arguments arrive JSON-encoded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteToolCall {
    pub id: ToolCallId,
    pub function: RemoteFunction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Error attached to a failed run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunLastError {
    pub code: String,
    pub message: String,
}

/// Why a run ended as `incomplete`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncompleteDetails {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body for starting a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRun {
    pub assistant_id: AssistantId,
    /// Replaces the assistant's stored instructions for this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Function tools made available for this run, in wire format.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<JsonValue>,
}

impl CreateRun {
    /// Starts a run of `assistant_id` with its stored configuration.
    #[must_use]
    pub fn new(assistant_id: AssistantId) -> Self {
        Self {
            assistant_id,
            instructions: None,
            tools: Vec::new(),
        }
    }

    /// Overrides the instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Overrides the tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<JsonValue>) -> Self {
        self.tools = tools;
        self
    }
}
