//! Assistant conversations for persona-gateway.
//!
//! This crate provides:
//!
//! - **Conversation Service**: the thread/message/run API ([`ConversationService`])
//!   and its HTTP implementation ([`OpenAiAssistants`])
//! - **Conversation Loop**: one chat turn, polled with backoff and cancellable
//! - **Tool dispatch**: the [`ToolDispatcher`] seam runs use to reach local tools
//! - **Personas**: named assistant configurations answering with [`Envelope`]s
//!
//! [`Envelope`]: persona_gateway_core::Envelope

pub mod chat_loop;
pub mod error;
pub mod openai;
pub mod persona;
pub mod poll;
pub mod run;
pub mod scripted;
pub mod service;
pub mod thread;
pub mod tool;

pub use chat_loop::{ChatTurn, ConversationLoop};
pub use error::{ChatError, ConversationError};
pub use openai::{OpenAiAssistants, OpenAiConfig};
pub use persona::{Persona, PersonaGateway, ReplyFormat};
pub use poll::{Backoff, PollConfig};
pub use run::{CreateRun, Run, RunStatus};
pub use service::ConversationService;
pub use thread::{MessageRole, Thread, ThreadMessage};
pub use tool::{NoTools, ToolCall, ToolDefinition, ToolDispatcher, ToolResult};
