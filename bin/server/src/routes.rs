//! HTTP routes.
//!
//! Every response, including errors, is an [`Envelope`] whose `code` is
//! also the HTTP status.

use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use persona_gateway_core::{ChatRequest, Envelope, RequestId};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info_span};

/// An envelope sent with the HTTP status matching its code.
#[derive(Debug)]
pub struct ApiResponse(pub Envelope);

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.code.as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

/// Builds the router serving every persona.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/{persona}/chat", post(chat))
        .route("/{persona}/_chat", post(chat))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> ApiResponse {
    ApiResponse(Envelope::ok(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "personas": state.persona_names().collect::<Vec<_>>(),
    })))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Path(persona): Path<String>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResponse {
    let Some(gateway) = state.persona(&persona) else {
        return ApiResponse(Envelope::not_found(format!("unknown persona: {persona}")));
    };
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return ApiResponse(Envelope::bad_request(rejection.body_text())),
    };

    let request_id = RequestId::new();
    let span = info_span!(
        "chat",
        %request_id,
        persona = %persona,
        thread_id = request.thread_id.as_ref().map(|id| id.as_str()),
        user_agent = %request.user_agent,
    );

    // Child token: shutdown cancels this chat, but this chat never cancels shutdown.
    let cancel = state.shutdown().child_token();
    let envelope = gateway.chat(&request, &cancel).instrument(span).await;
    ApiResponse(envelope)
}

async fn not_found() -> ApiResponse {
    ApiResponse(Envelope::not_found("no such route"))
}

async fn method_not_allowed(method: Method) -> ApiResponse {
    ApiResponse(Envelope::method_not_allowed(format!(
        "method {method} not allowed on this route"
    )))
}
