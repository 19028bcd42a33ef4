//! Server start-up errors.
//!
//! Request handling never fails: every outcome is an envelope. These errors
//! only stop the process before it starts serving, wrapped in a
//! `rootcause::Report` by `main`.

use std::fmt;

/// Errors raised while building and starting the server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration is missing or invalid.
    Config { details: String },
    /// The conversation service client could not be built.
    ConversationClient { details: String },
    /// The Places client could not be built.
    PlacesClient { details: String },
    /// A persona uses Places tools but no Places configuration was given.
    PlacesNotConfigured { persona: String },
    /// No persona is configured.
    NoPersonas,
    /// The listen address could not be bound.
    Bind { addr: String, details: String },
    /// The server stopped with an I/O error.
    Serve { details: String },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::ConversationClient { details } => {
                write!(f, "failed to build conversation client: {details}")
            }
            Self::PlacesClient { details } => {
                write!(f, "failed to build places client: {details}")
            }
            Self::PlacesNotConfigured { persona } => {
                write!(
                    f,
                    "persona '{persona}' uses places tools but PLACES__API_KEY is not set"
                )
            }
            Self::NoPersonas => write!(
                f,
                "no persona configured; set PERSONAS__<NAME>__ASSISTANT_ID"
            ),
            Self::Bind { addr, details } => write!(f, "failed to bind {addr}: {details}"),
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for ServerError {}
