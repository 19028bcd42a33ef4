//! Personas: named assistant configurations exposed over HTTP.

use crate::chat_loop::{ChatTurn, ConversationLoop};
use crate::error::ChatError;
use crate::run::CreateRun;
use crate::tool::ToolDefinition;
use persona_gateway_core::{AssistantId, ChatReply, ChatRequest, Envelope};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

/// How the assistant's final text is returned to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyFormat {
    /// The text as-is.
    #[default]
    Text,
    /// The text parsed as JSON.
    Json,
}

/// A persona's assistant configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub name: String,
    pub assistant_id: AssistantId,
    /// Overrides the assistant's stored instructions on every run.
    pub instructions: Option<String>,
    /// Tools offered on every run. Non-empty means the persona also gets the
    /// caller's location with each message.
    pub tools: Vec<ToolDefinition>,
    pub reply_format: ReplyFormat,
    pub include_thread_id: bool,
}

impl Persona {
    /// Creates a text persona without tools.
    #[must_use]
    pub fn new(name: impl Into<String>, assistant_id: AssistantId) -> Self {
        Self {
            name: name.into(),
            assistant_id,
            instructions: None,
            tools: Vec::new(),
            reply_format: ReplyFormat::Text,
            include_thread_id: false,
        }
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn with_reply_format(mut self, reply_format: ReplyFormat) -> Self {
        self.reply_format = reply_format;
        self
    }

    #[must_use]
    pub fn with_thread_id(mut self, include_thread_id: bool) -> Self {
        self.include_thread_id = include_thread_id;
        self
    }

    fn run_request(&self) -> CreateRun {
        let mut run = CreateRun::new(self.assistant_id.clone())
            .with_tools(self.tools.iter().map(ToolDefinition::to_function_tool).collect());
        if let Some(instructions) = &self.instructions {
            run = run.with_instructions(instructions.clone());
        }
        run
    }

    /// The message content posted to the thread.
    fn message_content(&self, request: &ChatRequest) -> String {
        if self.tools.is_empty() {
            return request.message.clone();
        }
        serde_json::json!({
            "message": request.message,
            "latitude": request.location.latitude,
            "longitude": request.location.longitude,
        })
        .to_string()
    }

    fn format_reply(&self, turn: ChatTurn) -> JsonValue {
        let message = match self.reply_format {
            ReplyFormat::Text => JsonValue::String(turn.reply),
            ReplyFormat::Json => serde_json::from_str(&turn.reply).unwrap_or_else(|e| {
                warn!(persona = %self.name, error = %e, "assistant reply is not JSON, returning text");
                JsonValue::String(turn.reply)
            }),
        };
        ChatReply {
            thread_id: turn.thread_id,
            message,
        }
        .into_data(self.include_thread_id)
    }
}

/// Serves chat requests for one persona.
#[derive(Clone)]
pub struct PersonaGateway {
    persona: Persona,
    run: CreateRun,
    conversation: ConversationLoop,
}

impl PersonaGateway {
    #[must_use]
    pub fn new(persona: Persona, conversation: ConversationLoop) -> Self {
        let run = persona.run_request();
        Self {
            persona,
            run,
            conversation,
        }
    }

    #[must_use]
    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Answers one chat request. Every outcome, including failures, becomes an envelope.
    #[instrument(skip_all, fields(persona = %self.persona.name))]
    pub async fn chat(&self, request: &ChatRequest, cancel: &CancellationToken) -> Envelope {
        match self.try_chat(request, cancel).await {
            Ok(data) => Envelope::ok(data),
            Err(err) => {
                warn!(error = %err, "chat failed");
                Envelope::new(err.code(), err.to_string())
            }
        }
    }

    async fn try_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<JsonValue, ChatError> {
        request.validate()?;
        let content = self.persona.message_content(request);
        let turn = self
            .conversation
            .run_turn(request.thread_id.as_ref(), &content, &self.run, cancel)
            .await?;
        Ok(self.persona.format_reply(turn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::PollConfig;
    use crate::run::RunStatus;
    use crate::scripted::{
        SCRIPTED_THREAD_ID, ScriptedService, scripted_failed_run, scripted_run, scripted_tool_run,
    };
    use crate::tool::{NoTools, ToolCall, ToolDispatcher, ToolResult};
    use async_trait::async_trait;
    use persona_gateway_core::{Code, Status, ThreadId};
    use serde_json::json;
    use std::sync::Arc;

    struct FakePlaces;

    #[async_trait]
    impl ToolDispatcher for FakePlaces {
        async fn dispatch(&self, call: &ToolCall) -> ToolResult {
            match call.name.as_str() {
                "nearby_search" => ToolResult::success(
                    call.id.clone(),
                    json!({"places": [{"displayName": {"text": "Sushi Tei"}}]}),
                ),
                _ => ToolResult::unsupported(call),
            }
        }
    }

    fn gateway(persona: Persona, service: Arc<ScriptedService>) -> PersonaGateway {
        gateway_with(persona, service, Arc::new(NoTools))
    }

    fn gateway_with(
        persona: Persona,
        service: Arc<ScriptedService>,
        dispatcher: Arc<dyn ToolDispatcher>,
    ) -> PersonaGateway {
        PersonaGateway::new(
            persona,
            ConversationLoop::new(service, dispatcher, PollConfig::default()),
        )
    }

    fn happy() -> Persona {
        Persona::new("happy", AssistantId::new("asst_happy"))
    }

    fn sigma() -> Persona {
        Persona::new("jarvis_sigma", AssistantId::new("asst_sigma"))
            .with_tools(vec![ToolDefinition::new("nearby_search", "Find places")])
            .with_reply_format(ReplyFormat::Json)
            .with_thread_id(true)
    }

    #[tokio::test(start_paused = true)]
    async fn text_reply_is_ok_envelope() {
        let service = Arc::new(
            ScriptedService::new()
                .with_steps([scripted_run(RunStatus::Completed)])
                .with_reply("Have a great day!"),
        );
        let envelope = gateway(happy(), service.clone())
            .chat(&ChatRequest::new("hello"), &CancellationToken::new())
            .await;

        assert_eq!(envelope.code, Code::Ok);
        assert_eq!(envelope.status, Status::Ok);
        assert_eq!(envelope.data, json!("Have a great day!"));
        assert_eq!(service.posted_messages()[0].1, "hello");
        assert!(service.runs_created()[0].tools.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sushi_scenario() {
        let service = Arc::new(
            ScriptedService::new()
                .with_steps([
                    scripted_run(RunStatus::Queued),
                    scripted_tool_run(&[(
                        "call_1",
                        "nearby_search",
                        json!({"latitude": 1.35, "longitude": 103.8, "included_types": ["sushi_restaurant"]}),
                    )]),
                    scripted_run(RunStatus::InProgress),
                    scripted_run(RunStatus::Completed),
                ])
                .with_reply(r#"{"places": ["Sushi Tei"]}"#),
        );
        let request = ChatRequest::new("find sushi nearby").with_location(1.35, 103.8);

        let envelope = gateway_with(sigma(), service.clone(), Arc::new(FakePlaces))
            .chat(&request, &CancellationToken::new())
            .await;

        assert_eq!(envelope.code, Code::Ok);
        assert_eq!(
            envelope.data,
            json!({"thread_id": SCRIPTED_THREAD_ID, "message": {"places": ["Sushi Tei"]}})
        );
        assert_eq!(service.threads_created(), 1);

        let submissions = service.submissions();
        assert_eq!(submissions.len(), 1);
        assert!(submissions[0][0].is_success());
        assert!(submissions[0][0].encoded_output().contains("Sushi Tei"));

        let posted: JsonValue = serde_json::from_str(&service.posted_messages()[0].1).unwrap();
        assert_eq!(
            posted,
            json!({"message": "find sushi nearby", "latitude": 1.35, "longitude": 103.8})
        );
        assert_eq!(service.runs_created()[0].tools.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_tool_is_still_submitted() {
        let service = Arc::new(
            ScriptedService::new()
                .with_steps([
                    scripted_tool_run(&[("call_x", "book_table", json!({}))]),
                    scripted_run(RunStatus::Completed),
                ])
                .with_reply("I cannot book tables."),
        );

        let envelope = gateway_with(sigma(), service.clone(), Arc::new(FakePlaces))
            .chat(&ChatRequest::new("book sushi"), &CancellationToken::new())
            .await;

        assert_eq!(envelope.code, Code::Ok);
        assert_eq!(envelope.data["message"], "I cannot book tables.");
        let submissions = service.submissions();
        assert_eq!(
            submissions[0][0].error(),
            Some("unsupported tool: book_table")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_message_is_bad_request() {
        let service = Arc::new(ScriptedService::new());
        let envelope = gateway(happy(), service.clone())
            .chat(&ChatRequest::new("   "), &CancellationToken::new())
            .await;

        assert_eq!(envelope.code, Code::BadRequest);
        assert_eq!(service.threads_created(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_thread_id_never_reaches_the_service() {
        let service = Arc::new(ScriptedService::new().with_thread("thread_1"));
        let request =
            ChatRequest::new("hi").with_thread(ThreadId::new("../assistants/asst_secret"));

        let envelope = gateway(happy(), service.clone())
            .chat(&request, &CancellationToken::new())
            .await;

        assert_eq!(envelope.code, Code::BadRequest);
        assert!(service.posted_messages().is_empty());
        assert!(service.runs_created().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_thread_is_not_found() {
        let service = Arc::new(ScriptedService::new());
        let request = ChatRequest::new("hi").with_thread(ThreadId::new("thread_nope"));

        let envelope = gateway(happy(), service)
            .chat(&request, &CancellationToken::new())
            .await;

        assert_eq!(envelope.code, Code::NotFound);
        assert_eq!(envelope.status, Status::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_is_internal_error_with_reason() {
        let service = Arc::new(
            ScriptedService::new().with_steps([scripted_failed_run("server_error", "boom")]),
        );

        let envelope = gateway(happy(), service)
            .chat(&ChatRequest::new("hi"), &CancellationToken::new())
            .await;

        assert_eq!(envelope.code, Code::InternalServerError);
        let detail = envelope.data.as_str().unwrap_or_default();
        assert!(detail.contains("failed"));
        assert!(detail.contains("server_error: boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn unparseable_json_reply_falls_back_to_text() {
        let service = Arc::new(
            ScriptedService::new()
                .with_steps([scripted_run(RunStatus::Completed)])
                .with_reply("not json at all"),
        );

        let envelope = gateway(sigma(), service)
            .chat(&ChatRequest::new("hi"), &CancellationToken::new())
            .await;

        assert_eq!(envelope.code, Code::Ok);
        assert_eq!(envelope.data["message"], "not json at all");
    }

    #[test]
    fn run_request_carries_overrides() {
        let run = sigma().with_instructions("answer in JSON").run_request();
        assert_eq!(run.instructions.as_deref(), Some("answer in JSON"));
        assert_eq!(run.tools[0]["function"]["name"], "nearby_search");
    }
}
