//! Error types for the conversation crate.
//!
//! - `ConversationError`: a single call to the remote conversation service failed
//! - `ChatError`: a whole chat turn failed; the persona maps it onto the envelope

use crate::run::RunStatus;
use persona_gateway_core::{ChatRequestError, Code, RunId, ThreadId};
use std::fmt;
use std::time::Duration;

/// Errors from one remote conversation service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// The request never produced a response (connect, TLS, timeout).
    Request {
        operation: &'static str,
        reason: String,
    },
    /// The service answered with a non-success status.
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },
    /// The response body did not match the expected shape.
    Decode {
        operation: &'static str,
        reason: String,
    },
    /// The client could not be constructed.
    InvalidConfig { reason: String },
}

impl ConversationError {
    /// Returns the HTTP status when the service answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true when the service reported that the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { operation, reason } => {
                write!(f, "{operation} request failed: {reason}")
            }
            Self::Status {
                operation,
                status,
                message,
            } => {
                write!(f, "{operation} returned {status}: {message}")
            }
            Self::Decode { operation, reason } => {
                write!(f, "failed to decode {operation} response: {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid conversation client configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for ConversationError {}

/// Errors that end a chat turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatError {
    /// The inbound request broke an invariant.
    InvalidRequest(ChatRequestError),
    /// The caller referenced a thread the service does not know.
    ThreadNotFound { thread_id: ThreadId },
    /// A remote call failed.
    Remote(ConversationError),
    /// The run stopped in a state other than `completed`.
    RunEnded {
        run_id: RunId,
        status: RunStatus,
        reason: Option<String>,
    },
    /// The run did not complete within the configured wait.
    Timeout { run_id: RunId, waited: Duration },
    /// The turn was cancelled, usually by server shutdown.
    Cancelled,
    /// The run kept asking for tool output past the configured bound.
    TooManyToolRounds { run_id: RunId, max: u32 },
    /// The run completed but the thread holds no assistant text.
    NoAssistantReply { thread_id: ThreadId },
}

impl ChatError {
    /// The envelope code this error is reported under.
    #[must_use]
    pub fn code(&self) -> Code {
        match self {
            Self::InvalidRequest(_) => Code::BadRequest,
            Self::ThreadNotFound { .. } => Code::NotFound,
            Self::Remote(err) if err.status() == Some(401) => Code::Unauthorized,
            _ => Code::InternalServerError,
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(err) => write!(f, "invalid request: {err}"),
            Self::ThreadNotFound { thread_id } => write!(f, "thread not found: {thread_id}"),
            Self::Remote(err) => write!(f, "{err}"),
            Self::RunEnded {
                run_id,
                status,
                reason,
            } => match reason {
                Some(reason) => write!(f, "run {run_id} ended with status {status}: {reason}"),
                None => write!(f, "run {run_id} ended with status {status}"),
            },
            Self::Timeout { run_id, waited } => {
                write!(f, "run {run_id} did not complete within {}s", waited.as_secs())
            }
            Self::Cancelled => write!(f, "chat was cancelled"),
            Self::TooManyToolRounds { run_id, max } => {
                write!(f, "run {run_id} exceeded {max} tool rounds")
            }
            Self::NoAssistantReply { thread_id } => {
                write!(f, "thread {thread_id} has no assistant reply")
            }
        }
    }
}

impl std::error::Error for ChatError {}

impl From<ConversationError> for ChatError {
    fn from(err: ConversationError) -> Self {
        Self::Remote(err)
    }
}

impl From<ChatRequestError> for ChatError {
    fn from(err: ChatRequestError) -> Self {
        Self::InvalidRequest(err)
    }
}
