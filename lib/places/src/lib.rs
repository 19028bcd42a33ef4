//! Places tools for persona-gateway assistants.
//!
//! This crate provides:
//!
//! - **Places Client**: nearby/text search, geocoding, autocomplete and routing
//! - **Tools**: typed [`PlacesTool`] calls and their schema definitions
//! - **Dispatcher**: a [`ToolDispatcher`](persona_gateway_conversation::ToolDispatcher)
//!   that folds every upstream failure into the tool output

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod schema;
pub mod tool;

pub use client::{PlacesClient, PlacesConfig};
pub use dispatcher::PlacesDispatcher;
pub use error::{PlacesError, ToolParseError};
pub use schema::tool_definitions;
pub use tool::PlacesTool;
