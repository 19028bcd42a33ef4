//! Places error types.

use std::fmt;

/// Errors from a Places or Routes call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacesError {
    /// The request never produced a response.
    Request {
        /// Endpoint that was called.
        endpoint: &'static str,
        /// Error details.
        reason: String,
    },
    /// The endpoint answered with a non-success status.
    Status {
        /// Endpoint that was called.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },
    /// The response body was not JSON.
    Decode {
        /// Endpoint that was called.
        endpoint: &'static str,
        /// Error details.
        reason: String,
    },
    /// The client could not be constructed.
    InvalidConfig {
        /// Error details.
        reason: String,
    },
}

impl fmt::Display for PlacesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { endpoint, reason } => {
                write!(f, "{endpoint} request failed: {reason}")
            }
            Self::Status {
                endpoint,
                status,
                body,
            } => {
                if body.is_empty() {
                    write!(f, "{endpoint} returned {status}")
                } else {
                    write!(f, "{endpoint} returned {status}: {body}")
                }
            }
            Self::Decode { endpoint, reason } => {
                write!(f, "failed to decode {endpoint} response: {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid places client configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for PlacesError {}

/// Why a tool call could not be turned into a Places request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolParseError {
    /// No Places tool has this name.
    Unsupported {
        /// The name the assistant used.
        name: String,
    },
    /// The arguments do not fit the tool.
    InvalidArguments {
        /// The tool that was called.
        tool: &'static str,
        /// Error details.
        reason: String,
    },
}

impl fmt::Display for ToolParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { name } => write!(f, "unsupported tool: {name}"),
            Self::InvalidArguments { tool, reason } => {
                write!(f, "invalid arguments for {tool}: {reason}")
            }
        }
    }
}

impl std::error::Error for ToolParseError {}
