//! The remote conversation service as the chat loop sees it.

use crate::error::ConversationError;
use crate::run::{CreateRun, Run};
use crate::thread::{Thread, ThreadMessage};
use crate::tool::ToolResult;
use async_trait::async_trait;
use persona_gateway_core::{RunId, ThreadId};

/// Trait for the thread/message/run API.
///
/// The production implementation is [`OpenAiAssistants`](crate::OpenAiAssistants);
/// this abstraction lets the chat loop be tested without the network.
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Creates an empty thread.
    async fn create_thread(&self) -> Result<Thread, ConversationError>;

    /// Fetches an existing thread.
    async fn retrieve_thread(&self, thread_id: &ThreadId) -> Result<Thread, ConversationError>;

    /// Appends a user message to a thread.
    async fn create_message(
        &self,
        thread_id: &ThreadId,
        content: &str,
    ) -> Result<ThreadMessage, ConversationError>;

    /// Starts a run on a thread.
    async fn create_run(
        &self,
        thread_id: &ThreadId,
        request: &CreateRun,
    ) -> Result<Run, ConversationError>;

    /// Fetches the current state of a run.
    async fn retrieve_run(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<Run, ConversationError>;

    /// Lists the messages `run_id` left on a thread, newest first.
    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<Vec<ThreadMessage>, ConversationError>;

    /// Submits one batch of tool outputs to a run waiting in `requires_action`.
    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: &[ToolResult],
    ) -> Result<Run, ConversationError>;
}
