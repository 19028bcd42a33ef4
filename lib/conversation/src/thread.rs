//! Threads and the messages they hold.

use chrono::{DateTime, Utc};
use persona_gateway_core::{RunId, ThreadId};
use serde::{Deserialize, Serialize};

/// A remote conversation thread.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message stored on a thread.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    /// The run that wrote the message; `None` for user messages.
    #[serde(default)]
    pub run_id: Option<RunId>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One content part of a message. Only text parts are read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextContent {
    pub value: String,
}

impl ThreadMessage {
    /// Creates a text message, as a fake service would store it.
    #[must_use]
    pub fn text(id: impl Into<String>, role: MessageRole, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: value.into(),
                },
            }],
            run_id: None,
            created_at: Some(Utc::now()),
        }
    }

    /// Marks the message as written by `run_id`.
    #[must_use]
    pub fn from_run(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Joins the text parts of the message.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                MessageContent::Text { text } => Some(text.value.as_str()),
                MessageContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Picks the text of the most recent assistant message written by `run_id`.
///
/// `messages` must be ordered newest first, as the service lists them.
/// Replies left by earlier runs on the same thread are never picked.
#[must_use]
pub fn latest_assistant_text(messages: &[ThreadMessage], run_id: &RunId) -> Option<String> {
    messages
        .iter()
        .find(|m| m.role == MessageRole::Assistant && m.run_id.as_ref() == Some(run_id))
        .map(ThreadMessage::text_content)
}

/// Page of messages returned by the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageList {
    pub data: Vec<ThreadMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_wire_message() {
        let message: ThreadMessage = serde_json::from_value(json!({
            "id": "msg_1",
            "object": "thread.message",
            "created_at": 1_704_067_200,
            "role": "assistant",
            "content": [
                {"type": "text", "text": {"value": "Sushi Tei is 200m away.", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "file_1"}}
            ]
        }))
        .expect("deserialize");

        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.content[1], MessageContent::Other);
        assert_eq!(message.text_content(), "Sushi Tei is 200m away.");
        assert!(message.created_at.is_some());
        assert!(message.run_id.is_none());
    }

    #[test]
    fn latest_assistant_skips_user_messages() {
        let run = RunId::new("run_1");
        let messages = vec![
            ThreadMessage::text("msg_3", MessageRole::User, "thanks"),
            ThreadMessage::text("msg_2", MessageRole::Assistant, "newest answer")
                .from_run(run.clone()),
            ThreadMessage::text("msg_1", MessageRole::Assistant, "older answer")
                .from_run(run.clone()),
        ];
        assert_eq!(
            latest_assistant_text(&messages, &run).as_deref(),
            Some("newest answer")
        );
    }

    #[test]
    fn replies_from_other_runs_are_ignored() {
        let messages = vec![
            ThreadMessage::text("msg_2", MessageRole::User, "second question"),
            ThreadMessage::text("msg_1", MessageRole::Assistant, "first answer")
                .from_run(RunId::new("run_1")),
        ];
        assert!(latest_assistant_text(&messages, &RunId::new("run_2")).is_none());
    }

    #[test]
    fn wire_run_id_is_decoded() {
        let message: ThreadMessage = serde_json::from_value(json!({
            "id": "msg_1",
            "role": "assistant",
            "run_id": "run_7",
            "content": []
        }))
        .expect("deserialize");
        assert_eq!(message.run_id, Some(RunId::new("run_7")));
    }

    #[test]
    fn no_assistant_message() {
        let messages = vec![ThreadMessage::text("msg_1", MessageRole::User, "hello?")];
        assert!(latest_assistant_text(&messages, &RunId::new("run_1")).is_none());
    }

    #[test]
    fn multi_part_text_is_joined() {
        let mut message = ThreadMessage::text("msg_1", MessageRole::Assistant, "first");
        message.content.push(MessageContent::Text {
            text: TextContent {
                value: "second".to_string(),
            },
        });
        assert_eq!(message.text_content(), "first\nsecond");
    }
}
