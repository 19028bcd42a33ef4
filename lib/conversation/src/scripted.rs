//! In-memory [`ConversationService`] that replays a scripted run (for testing).

use crate::error::ConversationError;
use crate::run::{
    CreateRun, RemoteFunction, RemoteToolCall, RequiredAction, Run, RunLastError, RunStatus,
    SubmitToolOutputsAction,
};
use crate::service::ConversationService;
use crate::thread::{MessageRole, Thread, ThreadMessage};
use crate::tool::ToolResult;
use async_trait::async_trait;
use persona_gateway_core::{RunId, ThreadId, ToolCallId};
use serde_json::Value as JsonValue;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread id handed out by [`ScriptedService::create_thread`].
pub const SCRIPTED_THREAD_ID: &str = "thread_scripted";
/// Run id used by every scripted run.
pub const SCRIPTED_RUN_ID: &str = "run_scripted";
/// Run id of assistant messages registered with [`ScriptedService::with_earlier_reply`].
pub const EARLIER_RUN_ID: &str = "run_earlier";

/// Builds a run in `status` with no pending action.
#[must_use]
pub fn scripted_run(status: RunStatus) -> Run {
    Run {
        id: RunId::new(SCRIPTED_RUN_ID),
        thread_id: ThreadId::new(SCRIPTED_THREAD_ID),
        status,
        required_action: None,
        last_error: None,
        incomplete_details: None,
    }
}

/// Builds a `failed` run carrying `code` and `message`.
#[must_use]
pub fn scripted_failed_run(code: &str, message: &str) -> Run {
    Run {
        last_error: Some(RunLastError {
            code: code.to_string(),
            message: message.to_string(),
        }),
        ..scripted_run(RunStatus::Failed)
    }
}

/// Builds a `requires_action` run waiting on `calls` of `(id, name, arguments)`.
#[must_use]
pub fn scripted_tool_run(calls: &[(&str, &str, JsonValue)]) -> Run {
    let tool_calls = calls
        .iter()
        .map(|(id, name, arguments)| RemoteToolCall {
            id: ToolCallId::new(*id),
            function: RemoteFunction {
                name: (*name).to_string(),
                arguments: arguments.to_string(),
            },
        })
        .collect();
    Run {
        required_action: Some(RequiredAction {
            submit_tool_outputs: SubmitToolOutputsAction { tool_calls },
        }),
        ..scripted_run(RunStatus::RequiresAction)
    }
}

#[derive(Default)]
struct ScriptState {
    threads: HashSet<ThreadId>,
    steps: VecDeque<Run>,
    last: Option<Run>,
    reply: Option<String>,
    history: Vec<ThreadMessage>,
    fail_with: Option<ConversationError>,
    threads_created: usize,
    posted: Vec<(ThreadId, String)>,
    runs_created: Vec<CreateRun>,
    submissions: Vec<Vec<ToolResult>>,
}

/// A conversation service whose runs walk through a fixed list of states.
///
/// `create_run`, `retrieve_run` and `submit_tool_outputs` each return the
/// next scripted state. Once the script runs out the last state repeats.
#[derive(Default)]
pub struct ScriptedService {
    state: Mutex<ScriptState>,
}

impl ScriptedService {
    /// Creates a service with no threads and an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an existing thread.
    #[must_use]
    pub fn with_thread(self, thread_id: &str) -> Self {
        self.lock().threads.insert(ThreadId::new(thread_id));
        self
    }

    /// Sets the run states to replay.
    #[must_use]
    pub fn with_steps(self, steps: impl IntoIterator<Item = Run>) -> Self {
        self.lock().steps = steps.into_iter().collect();
        self
    }

    /// Sets the assistant message a completed run leaves on the thread.
    #[must_use]
    pub fn with_reply(self, reply: &str) -> Self {
        self.lock().reply = Some(reply.to_string());
        self
    }

    /// Leaves an assistant message from an earlier run on every thread,
    /// older than anything posted through this service.
    #[must_use]
    pub fn with_earlier_reply(self, reply: &str) -> Self {
        {
            let mut state = self.lock();
            let id = format!("msg_earlier_{}", state.history.len() + 1);
            state.history.push(
                ThreadMessage::text(id, MessageRole::Assistant, reply)
                    .from_run(RunId::new(EARLIER_RUN_ID)),
            );
        }
        self
    }

    /// Makes every call fail with `error`.
    #[must_use]
    pub fn failing(self, error: ConversationError) -> Self {
        self.lock().fail_with = Some(error);
        self
    }

    /// Number of threads created.
    #[must_use]
    pub fn threads_created(&self) -> usize {
        self.lock().threads_created
    }

    /// User messages posted, in order.
    #[must_use]
    pub fn posted_messages(&self) -> Vec<(ThreadId, String)> {
        self.lock().posted.clone()
    }

    /// Run requests received, in order.
    #[must_use]
    pub fn runs_created(&self) -> Vec<CreateRun> {
        self.lock().runs_created.clone()
    }

    /// Tool output batches submitted, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<Vec<ToolResult>> {
        self.lock().submissions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<MutexGuard<'_, ScriptState>, ConversationError> {
        let state = self.lock();
        if let Some(err) = state.fail_with.clone() {
            return Err(err);
        }
        Ok(state)
    }
}

impl ScriptState {
    fn advance(&mut self) -> Result<Run, ConversationError> {
        if let Some(next) = self.steps.pop_front() {
            self.last = Some(next);
        }
        self.last.clone().ok_or_else(|| ConversationError::Status {
            operation: "retrieve_run",
            status: 404,
            message: "no run scripted".to_string(),
        })
    }

    fn require_thread(
        &self,
        operation: &'static str,
        thread_id: &ThreadId,
    ) -> Result<(), ConversationError> {
        if self.threads.contains(thread_id) {
            Ok(())
        } else {
            Err(ConversationError::Status {
                operation,
                status: 404,
                message: format!("No thread found with id '{thread_id}'."),
            })
        }
    }
}

#[async_trait]
impl ConversationService for ScriptedService {
    async fn create_thread(&self) -> Result<Thread, ConversationError> {
        let mut state = self.check()?;
        let id = ThreadId::new(SCRIPTED_THREAD_ID);
        state.threads.insert(id.clone());
        state.threads_created += 1;
        Ok(Thread {
            id,
            created_at: None,
        })
    }

    async fn retrieve_thread(&self, thread_id: &ThreadId) -> Result<Thread, ConversationError> {
        let state = self.check()?;
        state.require_thread("retrieve_thread", thread_id)?;
        Ok(Thread {
            id: thread_id.clone(),
            created_at: None,
        })
    }

    async fn create_message(
        &self,
        thread_id: &ThreadId,
        content: &str,
    ) -> Result<ThreadMessage, ConversationError> {
        let mut state = self.check()?;
        state.require_thread("create_message", thread_id)?;
        state.posted.push((thread_id.clone(), content.to_string()));
        Ok(ThreadMessage::text(
            format!("msg_{}", state.posted.len()),
            MessageRole::User,
            content,
        ))
    }

    async fn create_run(
        &self,
        thread_id: &ThreadId,
        request: &CreateRun,
    ) -> Result<Run, ConversationError> {
        let mut state = self.check()?;
        state.require_thread("create_run", thread_id)?;
        state.runs_created.push(request.clone());
        state.advance()
    }

    async fn retrieve_run(
        &self,
        _thread_id: &ThreadId,
        _run_id: &RunId,
    ) -> Result<Run, ConversationError> {
        self.check()?.advance()
    }

    /// Returns the whole thread regardless of `run_id`; callers must pick
    /// their own run's messages.
    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        _run_id: &RunId,
    ) -> Result<Vec<ThreadMessage>, ConversationError> {
        let state = self.check()?;
        state.require_thread("list_messages", thread_id)?;
        let mut messages = state.history.clone();
        messages.extend(
            state
                .posted
                .iter()
                .filter(|(thread, _)| thread == thread_id)
                .enumerate()
                .map(|(i, (_, content))| {
                    ThreadMessage::text(format!("msg_{}", i + 1), MessageRole::User, content.clone())
                }),
        );
        if let Some(reply) = &state.reply {
            messages.push(
                ThreadMessage::text("msg_reply", MessageRole::Assistant, reply.clone())
                    .from_run(RunId::new(SCRIPTED_RUN_ID)),
            );
        }
        messages.reverse();
        Ok(messages)
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &ThreadId,
        _run_id: &RunId,
        outputs: &[ToolResult],
    ) -> Result<Run, ConversationError> {
        let mut state = self.check()?;
        state.submissions.push(outputs.to_vec());
        state.advance()
    }
}
