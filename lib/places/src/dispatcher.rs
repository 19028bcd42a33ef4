//! Routes assistant tool calls to the Places client.

use crate::client::PlacesClient;
use crate::error::{PlacesError, ToolParseError};
use crate::tool::PlacesTool;
use async_trait::async_trait;
use persona_gateway_conversation::{ToolCall, ToolDispatcher, ToolResult};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

/// [`ToolDispatcher`] answering the six Places tools.
///
/// Upstream failures never escape: they become `success: "false"` outputs
/// the assistant can read.
#[derive(Debug, Clone)]
pub struct PlacesDispatcher {
    client: PlacesClient,
}

impl PlacesDispatcher {
    #[must_use]
    pub fn new(client: PlacesClient) -> Self {
        Self { client }
    }

    async fn call(&self, tool: &PlacesTool) -> Result<JsonValue, PlacesError> {
        match tool {
            PlacesTool::NearbySearch(args) => self.client.nearby_search(args).await,
            PlacesTool::TextSearch(args) => self.client.text_search(args).await,
            PlacesTool::Geocode(args) => self.client.geocode(args).await,
            PlacesTool::ReverseGeocode(args) => self.client.reverse_geocode(args).await,
            PlacesTool::Autocomplete(args) => self.client.autocomplete(args).await,
            PlacesTool::ComputeRoute(args) => self.client.compute_route(args).await,
        }
    }
}

#[async_trait]
impl ToolDispatcher for PlacesDispatcher {
    async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let tool = match PlacesTool::from_call(call) {
            Ok(tool) => tool,
            Err(err @ ToolParseError::Unsupported { .. }) => {
                warn!(tool = %call.name, call_id = %call.id, "unsupported tool call");
                return ToolResult::failure(call.id.clone(), err.to_string());
            }
            Err(err) => {
                warn!(tool = %call.name, call_id = %call.id, error = %err, "invalid tool arguments");
                return ToolResult::failure(call.id.clone(), err.to_string());
            }
        };

        match self.call(&tool).await {
            Ok(body) => {
                info!(tool = tool.name(), call_id = %call.id, success = true, "tool call dispatched");
                ToolResult::success(call.id.clone(), body)
            }
            Err(err) => {
                warn!(tool = tool.name(), call_id = %call.id, success = false, error = %err, "tool call failed");
                ToolResult::failure(call.id.clone(), err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_client;
    use crate::tool::{COMPUTE_ROUTE, GEOCODE, NEARBY_SEARCH};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher_for(base_url: &str) -> PlacesDispatcher {
        PlacesDispatcher::new(test_client(base_url))
    }

    fn sushi_body() -> JsonValue {
        json!({
            "places": [{
                "id": "ChIJ123",
                "displayName": {"text": "Sushi Tei", "languageCode": "en"},
                "formattedAddress": "2 Orchard Turn, Singapore",
                "rating": 4.3
            }]
        })
    }

    #[tokio::test]
    async fn every_tool_answers_with_its_call_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
            .mount(&server)
            .await;
        let dispatcher = dispatcher_for(&server.uri());

        for (i, name) in PlacesTool::NAMES.into_iter().enumerate() {
            let id = format!("call_{i}");
            let call = ToolCall::new(id.as_str(), name, json!({}));
            let result = dispatcher.dispatch(&call).await;
            assert_eq!(result.tool_call_id.as_str(), id);
            assert!(result.is_success(), "{name}: {:?}", result.output);
        }
        assert_eq!(server.received_requests().await.map(|r| r.len()), Some(6));
    }

    #[tokio::test]
    async fn success_merges_marker_into_upstream_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/places:searchNearby"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sushi_body()))
            .mount(&server)
            .await;

        let call = ToolCall::new(
            "call_sushi",
            NEARBY_SEARCH,
            json!({"latitude": 1.35, "longitude": 103.8, "included_types": ["sushi_restaurant"]}),
        );
        let result = dispatcher_for(&server.uri()).dispatch(&call).await;

        let mut expected = sushi_body();
        expected["success"] = json!("true");
        assert_eq!(result.output, expected);
    }

    #[tokio::test]
    async fn upstream_error_status_becomes_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/directions/v2:computeRoutes"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend unavailable"))
            .mount(&server)
            .await;

        let call = ToolCall::new("call_route", COMPUTE_ROUTE, json!({"origin": "a", "destination": "b"}));
        let result = dispatcher_for(&server.uri()).dispatch(&call).await;

        assert_eq!(result.tool_call_id.as_str(), "call_route");
        assert!(!result.is_success());
        assert!(result.error().is_some_and(|e| e.contains("500")));
    }

    #[tokio::test]
    async fn connection_error_becomes_failure() {
        // Nothing listens on port 1.
        let dispatcher = dispatcher_for("http://127.0.0.1:1");
        for name in PlacesTool::NAMES {
            let call = ToolCall::new("call_down", name, json!({}));
            let result = dispatcher.dispatch(&call).await;
            assert_eq!(result.output["success"], "false");
            assert!(result.error().is_some_and(|e| !e.is_empty()), "{name}");
        }
    }

    #[tokio::test]
    async fn malformed_upstream_json_becomes_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let call = ToolCall::new("call_1", GEOCODE, json!({"address": "x"}));
        let result = dispatcher_for(&server.uri()).dispatch(&call).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn unknown_tool_is_explicitly_unsupported() {
        let server = MockServer::start().await;
        let call = ToolCall::new("call_9", "book_table", json!({}));
        let result = dispatcher_for(&server.uri()).dispatch(&call).await;

        assert_eq!(result.tool_call_id.as_str(), "call_9");
        assert_eq!(result.error(), Some("unsupported tool: book_table"));
        assert_eq!(server.received_requests().await.map(|r| r.len()), Some(0));
    }

    #[tokio::test]
    async fn bad_arguments_skip_the_upstream_call() {
        let server = MockServer::start().await;
        let call = ToolCall::from_encoded("call_bad", GEOCODE, "not json");
        let result = dispatcher_for(&server.uri()).dispatch(&call).await;

        assert!(!result.is_success());
        assert!(result.error().is_some_and(|e| e.contains("geocode")));
        assert_eq!(server.received_requests().await.map(|r| r.len()), Some(0));
    }
}
