//! Core domain types and utilities for persona-gateway.
//!
//! This crate provides the types shared by every layer: the inbound chat
//! request, the uniform response envelope, identifiers, and the error
//! handling foundation.

pub mod chat;
pub mod envelope;
pub mod error;
pub mod id;

pub use chat::{ChatReply, ChatRequest, ChatRequestError, Location};
pub use envelope::{Code, Envelope, Status};
pub use error::Result;
pub use id::{AssistantId, ParseIdError, RequestId, RunId, ThreadId, ToolCallId};
