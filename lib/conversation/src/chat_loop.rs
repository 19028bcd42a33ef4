//! One chat turn against the conversation service.
//!
//! A turn resolves the thread, posts the user message, starts a run and
//! polls it until it completes. Tool calls raised along the way are
//! dispatched in order and their outputs submitted as a single batch per
//! `requires_action` round.

use crate::error::ChatError;
use crate::poll::PollConfig;
use crate::run::{CreateRun, Run, RunStatus};
use crate::service::ConversationService;
use crate::thread::latest_assistant_text;
use crate::tool::{ToolCall, ToolDispatcher, ToolResult};
use persona_gateway_core::{RunId, ThreadId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The outcome of a completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Thread the turn ran on; new when the caller did not pass one.
    pub thread_id: ThreadId,
    /// Text of the newest assistant message.
    pub reply: String,
}

/// Drives chat turns for one assistant configuration.
#[derive(Clone)]
pub struct ConversationLoop {
    service: Arc<dyn ConversationService>,
    dispatcher: Arc<dyn ToolDispatcher>,
    poll: PollConfig,
}

impl ConversationLoop {
    /// Creates a loop over `service` that answers tool calls with `dispatcher`.
    #[must_use]
    pub fn new(
        service: Arc<dyn ConversationService>,
        dispatcher: Arc<dyn ToolDispatcher>,
        poll: PollConfig,
    ) -> Self {
        Self {
            service,
            dispatcher,
            poll,
        }
    }

    /// Runs one turn: `content` is posted to `thread_id` (or a new thread)
    /// and `run` is started and polled until it yields a reply.
    ///
    /// # Errors
    ///
    /// Fails if the thread is unknown, any remote call fails, the run ends in
    /// a state other than `completed`, the wait exceeds `max_wait`, the tool
    /// round bound is exceeded, or `cancel` fires.
    #[instrument(skip_all, fields(thread_id = ?thread_id, assistant_id = %run.assistant_id))]
    pub async fn run_turn(
        &self,
        thread_id: Option<&ThreadId>,
        content: &str,
        run: &CreateRun,
        cancel: &CancellationToken,
    ) -> Result<ChatTurn, ChatError> {
        if cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }
        let deadline = Instant::now() + self.poll.max_wait();

        let thread_id = self.resolve_thread(thread_id).await?;
        self.service.create_message(&thread_id, content).await?;

        let run = self.service.create_run(&thread_id, run).await?;
        debug!(run_id = %run.id, status = %run.status, "run started");

        let run_id = self.await_completion(&thread_id, run, deadline, cancel).await?;

        let messages = self.service.list_messages(&thread_id, &run_id).await?;
        let reply =
            latest_assistant_text(&messages, &run_id).ok_or_else(|| ChatError::NoAssistantReply {
                thread_id: thread_id.clone(),
            })?;
        info!(thread_id = %thread_id, run_id = %run_id, "chat turn completed");

        Ok(ChatTurn { thread_id, reply })
    }

    async fn resolve_thread(&self, thread_id: Option<&ThreadId>) -> Result<ThreadId, ChatError> {
        match thread_id {
            Some(id) => match self.service.retrieve_thread(id).await {
                Ok(thread) => Ok(thread.id),
                Err(err) if err.is_not_found() => Err(ChatError::ThreadNotFound {
                    thread_id: id.clone(),
                }),
                Err(err) => Err(err.into()),
            },
            None => {
                let thread = self.service.create_thread().await?;
                debug!(thread_id = %thread.id, "created thread");
                Ok(thread.id)
            }
        }
    }

    /// Polls `run` until it completes, answering tool calls on the way.
    async fn await_completion(
        &self,
        thread_id: &ThreadId,
        mut run: Run,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<RunId, ChatError> {
        let mut backoff = self.poll.backoff();
        let mut rounds = 0_u32;

        loop {
            match run.status {
                RunStatus::Completed => return Ok(run.id),
                RunStatus::RequiresAction => {
                    let calls = run.pending_tool_calls();
                    if calls.is_empty() {
                        warn!(run_id = %run.id, "run requires action but lists no tool calls");
                    } else {
                        rounds += 1;
                        if rounds > self.poll.max_tool_rounds {
                            return Err(ChatError::TooManyToolRounds {
                                run_id: run.id,
                                max: self.poll.max_tool_rounds,
                            });
                        }
                        let outputs = self.dispatch_all(&calls).await;
                        run = self
                            .service
                            .submit_tool_outputs(thread_id, &run.id, &outputs)
                            .await?;
                        backoff.reset();
                        continue;
                    }
                }
                status @ (RunStatus::Cancelled
                | RunStatus::Failed
                | RunStatus::Incomplete
                | RunStatus::Expired) => {
                    return Err(ChatError::RunEnded {
                        reason: run.failure_reason(),
                        run_id: run.id,
                        status,
                    });
                }
                // Still running; unknown statuses wait for the deadline.
                RunStatus::Queued
                | RunStatus::InProgress
                | RunStatus::Cancelling
                | RunStatus::Unknown => {}
            }

            wait(backoff.next_delay(), deadline, &run.id, &self.poll, cancel).await?;
            run = self.service.retrieve_run(thread_id, &run.id).await?;
            debug!(run_id = %run.id, status = %run.status, "polled run");
        }
    }

    /// Dispatches every call in order. Each output carries its call's id.
    async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            let mut result = self.dispatcher.dispatch(call).await;
            if result.tool_call_id != call.id {
                warn!(
                    expected = %call.id,
                    got = %result.tool_call_id,
                    "dispatcher answered with a different call id"
                );
                result.tool_call_id = call.id.clone();
            }
            outputs.push(result);
        }
        outputs
    }
}

/// Sleeps for `delay`, bounded by `deadline`, unless `cancel` fires first.
async fn wait(
    delay: Duration,
    deadline: Instant,
    run_id: &RunId,
    poll: &PollConfig,
    cancel: &CancellationToken,
) -> Result<(), ChatError> {
    let now = Instant::now();
    if now >= deadline {
        return Err(ChatError::Timeout {
            run_id: run_id.clone(),
            waited: poll.max_wait(),
        });
    }
    let delay = delay.min(deadline - now);

    tokio::select! {
        () = cancel.cancelled() => Err(ChatError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
