//! HTTP client for the OpenAI Assistants v2 thread/run API.

use crate::error::ConversationError;
use crate::run::{CreateRun, Run};
use crate::service::ConversationService;
use crate::thread::{MessageList, Thread, ThreadMessage};
use crate::tool::ToolResult;
use async_trait::async_trait;
use persona_gateway_core::{RunId, ThreadId};
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// Header opting in to the v2 assistants API.
const ASSISTANTS_BETA: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// How many messages to fetch when looking for the reply.
const MESSAGE_PAGE_SIZE: u32 = 20;

/// Configuration for the assistants API client.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// Secret API key.
    pub api_key: String,
    /// API root, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl OpenAiConfig {
    /// Creates a configuration with default endpoint and timeout.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }

    /// Points the client at another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// [`ConversationService`] backed by the assistants HTTP API.
///
/// Built once at start-up and shared read-only by every persona.
#[derive(Debug, Clone)]
pub struct OpenAiAssistants {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl OpenAiAssistants {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL
    /// is invalid.
    pub fn new(config: OpenAiConfig) -> Result<Self, ConversationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ConversationError::InvalidConfig {
                reason: e.to_string(),
            })?;
        Self::with_http_client(config, client)
    }

    /// Creates a client over an existing HTTP client; `timeout_seconds` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry path segments.
    pub fn with_http_client(
        config: OpenAiConfig,
        client: reqwest::Client,
    ) -> Result<Self, ConversationError> {
        let invalid = |reason: String| ConversationError::InvalidConfig { reason };
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| invalid(format!("base_url {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid(format!("base_url {} cannot be a base", config.base_url)));
        }
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one whole.
    ///
    /// Remote ids come from callers, so a `/`, `?` or `..` inside one must
    /// never reach another resource.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ConversationError> {
        let response = request
            .bearer_auth(&self.api_key)
            .header(ASSISTANTS_BETA.0, ASSISTANTS_BETA.1)
            .send()
            .await
            .map_err(|e| ConversationError::Request {
                operation,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConversationError::Status {
                operation,
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ConversationError::Decode {
                operation,
                reason: e.to_string(),
            })
    }
}

/// Error body returned by the API.
#[derive(Deserialize)]
struct ErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Pulls the human-readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl ConversationService for OpenAiAssistants {
    #[instrument(skip(self))]
    async fn create_thread(&self) -> Result<Thread, ConversationError> {
        let request = self
            .client
            .post(self.url(&["threads"]))
            .json(&serde_json::json!({}));
        let thread: Thread = self.send("create_thread", request).await?;
        debug!(thread_id = %thread.id, "thread created");
        Ok(thread)
    }

    #[instrument(skip(self), fields(thread_id = %thread_id))]
    async fn retrieve_thread(&self, thread_id: &ThreadId) -> Result<Thread, ConversationError> {
        let request = self.client.get(self.url(&["threads", thread_id.as_str()]));
        self.send("retrieve_thread", request).await
    }

    #[instrument(skip(self, content), fields(thread_id = %thread_id))]
    async fn create_message(
        &self,
        thread_id: &ThreadId,
        content: &str,
    ) -> Result<ThreadMessage, ConversationError> {
        let request = self
            .client
            .post(self.url(&["threads", thread_id.as_str(), "messages"]))
            .json(&serde_json::json!({
                "role": "user",
                "content": content,
            }));
        self.send("create_message", request).await
    }

    #[instrument(skip(self, run), fields(thread_id = %thread_id, assistant_id = %run.assistant_id))]
    async fn create_run(
        &self,
        thread_id: &ThreadId,
        run: &CreateRun,
    ) -> Result<Run, ConversationError> {
        let request = self
            .client
            .post(self.url(&["threads", thread_id.as_str(), "runs"]))
            .json(run);
        let run: Run = self.send("create_run", request).await?;
        debug!(run_id = %run.id, status = %run.status, "run created");
        Ok(run)
    }

    #[instrument(skip(self), fields(thread_id = %thread_id, run_id = %run_id))]
    async fn retrieve_run(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<Run, ConversationError> {
        let request = self.client.get(self.url(&[
            "threads",
            thread_id.as_str(),
            "runs",
            run_id.as_str(),
        ]));
        self.send("retrieve_run", request).await
    }

    #[instrument(skip(self), fields(thread_id = %thread_id, run_id = %run_id))]
    async fn list_messages(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
    ) -> Result<Vec<ThreadMessage>, ConversationError> {
        let mut url = self.url(&["threads", thread_id.as_str(), "messages"]);
        url.query_pairs_mut()
            .append_pair("order", "desc")
            .append_pair("limit", &MESSAGE_PAGE_SIZE.to_string())
            .append_pair("run_id", run_id.as_str());
        let request = self.client.get(url);
        let page: MessageList = self.send("list_messages", request).await?;
        Ok(page.data)
    }

    #[instrument(skip(self, outputs), fields(thread_id = %thread_id, run_id = %run_id, outputs = outputs.len()))]
    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: &[ToolResult],
    ) -> Result<Run, ConversationError> {
        let tool_outputs: Vec<_> = outputs
            .iter()
            .map(|result| {
                serde_json::json!({
                    "tool_call_id": result.tool_call_id,
                    "output": result.encoded_output(),
                })
            })
            .collect();

        let request = self
            .client
            .post(self.url(&[
                "threads",
                thread_id.as_str(),
                "runs",
                run_id.as_str(),
                "submit_tool_outputs",
            ]))
            .json(&serde_json::json!({ "tool_outputs": tool_outputs }));
        self.send("submit_tool_outputs", request).await
    }
}
