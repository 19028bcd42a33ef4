//! Inbound chat request and outbound reply types.

use crate::id::ThreadId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Where the caller is, as reported by the client app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Body of `POST /{persona}/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Continue this remote thread; a new one is created when absent.
    #[serde(default)]
    pub thread_id: Option<ThreadId>,
    pub message: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub location: Location,
}

/// Reasons a chat request is rejected before reaching the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRequestError {
    /// The message is empty or whitespace.
    EmptyMessage,
    /// The supplied thread id is empty.
    EmptyThreadId,
    /// The supplied thread id holds characters remote ids never use.
    InvalidThreadId,
}

impl fmt::Display for ChatRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "message must not be empty"),
            Self::EmptyThreadId => write!(f, "thread_id must not be empty when present"),
            Self::InvalidThreadId => {
                write!(f, "thread_id may only contain letters, digits, '_' and '-'")
            }
        }
    }
}

impl std::error::Error for ChatRequestError {}

impl ChatRequest {
    /// Creates a request that starts a new thread.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            thread_id: None,
            message: message.into(),
            user_agent: String::new(),
            location: Location::default(),
        }
    }

    /// Continues an existing thread.
    #[must_use]
    pub fn with_thread(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Sets the caller's location.
    #[must_use]
    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Location {
            latitude,
            longitude,
        };
        self
    }

    /// Checks the invariants the remote service relies on.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is empty, or a supplied thread id is
    /// empty or not a well-formed remote id.
    pub fn validate(&self) -> Result<(), ChatRequestError> {
        if self.message.trim().is_empty() {
            return Err(ChatRequestError::EmptyMessage);
        }
        if let Some(id) = &self.thread_id {
            if id.as_str().trim().is_empty() {
                return Err(ChatRequestError::EmptyThreadId);
            }
            if !id.is_well_formed() {
                return Err(ChatRequestError::InvalidThreadId);
            }
        }
        Ok(())
    }
}

/// The outcome of one successful chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// The thread the turn ran on.
    pub thread_id: ThreadId,
    /// Latest assistant message, raw text or parsed JSON.
    pub message: JsonValue,
}

impl ChatReply {
    /// Renders the reply as envelope data.
    ///
    /// With `include_thread_id` the data is `{ thread_id, message }` so the
    /// client can continue the conversation; otherwise it is the message alone.
    #[must_use]
    pub fn into_data(self, include_thread_id: bool) -> JsonValue {
        if include_thread_id {
            serde_json::json!({
                "thread_id": self.thread_id,
                "message": self.message,
            })
        } else {
            self.message
        }
    }
}
