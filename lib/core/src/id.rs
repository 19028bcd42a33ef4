//! Strongly-typed identifiers.
//!
//! Two families live here:
//!
//! - Local identifiers minted by the gateway. These use ULID format, giving
//!   both uniqueness and temporal ordering in logs.
//! - Remote identifiers handed out by the conversation service. These are
//!   opaque strings; the gateway never inspects or generates them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around ULID.
macro_rules! define_local_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let prefix_with_underscore = concat!($prefix, "_");
                let ulid_str = s.strip_prefix(prefix_with_underscore).unwrap_or(s);

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }
    };
}

/// Macro to generate an opaque string ID issued by a remote service.
macro_rules! define_remote_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a remote identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as sent on the wire.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the id is a non-empty `[A-Za-z0-9_-]` token,
            /// the only shape the remote service hands out.
            #[must_use]
            pub fn is_well_formed(&self) -> bool {
                !self.0.is_empty()
                    && self
                        .0
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_local_id!(
    /// Correlates every log line emitted while serving one chat call.
    RequestId,
    "req"
);

define_remote_id!(
    /// A conversation thread held by the conversation service.
    ThreadId
);

define_remote_id!(
    /// One execution of an assistant against a thread.
    RunId
);

define_remote_id!(
    /// A tool call raised by a run that is waiting for local output.
    ToolCallId
);

define_remote_id!(
    /// The configured assistant backing a persona.
    AssistantId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_id_shape() {
        assert!(ThreadId::new("thread_abc-123").is_well_formed());
        assert!(!ThreadId::new("").is_well_formed());
        assert!(!ThreadId::new("../assistants").is_well_formed());
        assert!(!RunId::new("run_1?x=1").is_well_formed());
    }

    #[test]
    fn request_id_display_format() {
        let id = RequestId::new();
        assert!(id.to_string().starts_with("req_"));
    }

    #[test]
    fn request_id_parses_with_and_without_prefix() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);

        let raw: RequestId = id.as_ulid().to_string().parse().expect("should parse");
        assert_eq!(id, raw);
    }

    #[test]
    fn parse_invalid_ulid() {
        let err = "req_nope".parse::<RequestId>().unwrap_err();
        assert_eq!(err.id_type, "RequestId");
    }

    #[test]
    fn remote_ids_are_transparent_on_the_wire() {
        let id = ThreadId::new("thread_abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"thread_abc123\"");

        let parsed: ToolCallId = serde_json::from_str("\"call_1\"").unwrap();
        assert_eq!(parsed.as_str(), "call_1");
        assert_eq!(parsed.to_string(), "call_1");
    }
}
