//! HTTP API v1 — the chat pipeline and its surrounding surface.
//!
//! Endpoints:
//!
//! - `POST /v1/chat/stream`       — Send a message, get an SSE stream
//! - `GET  /v1/conversations`     — List a user's conversations
//! - `GET  /v1/conversations/{id}`— Get one conversation with messages
//! - `GET  /v1/examples`          — List active golden examples
//! - `POST /v1/examples`          — Curate a new golden example
//! - `DELETE /v1/examples/{id}`   — Deactivate a golden example
//! - `GET  /v1/audit`             — Recent guard blocks
//!
//! A guard-blocked message is answered with HTTP 200 and a complete JSON
//! body carrying the fixed blocked reply — moderation outcomes are
//! presented as normal conversational turns, not protocol errors.

use crate::SharedState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use mindhaven_core::error::Error;
use mindhaven_core::message::{Message, Role};
use mindhaven_pipeline::{ChatStreamEvent, TurnRequest, TurnResponse};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::info;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat/stream", post(chat_stream_handler))
        .route("/conversations", get(list_conversations_handler))
        .route("/conversations/{id}", get(get_conversation_handler))
        .route("/examples", get(list_examples_handler))
        .route("/examples", post(create_example_handler))
        .route(
            "/examples/{id}",
            axum::routing::delete(delete_example_handler),
        )
        .route("/audit", get(audit_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatStreamRequest {
    /// The user's message.
    message: String,
    /// Existing conversation ID (omit to create new).
    #[serde(default)]
    conversation_id: Option<String>,
    /// Persona id; falls back to the default persona.
    #[serde(default)]
    persona_id: Option<String>,
    /// Caller identity until an auth layer fills this in.
    #[serde(default = "default_user_id")]
    user_id: String,
    /// Prior turns, oldest first.
    #[serde(default)]
    history: Vec<HistoryTurnDto>,
}

fn default_user_id() -> String {
    "anonymous".into()
}

#[derive(Deserialize)]
struct HistoryTurnDto {
    role: String,
    content: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
struct BlockedResponse {
    blocked: bool,
    reason: String,
    content: String,
}

#[derive(Serialize)]
struct ConversationSummaryDto {
    id: String,
    title: Option<String>,
    message_count: usize,
    created_at: String,
    updated_at: String,
}

#[derive(Serialize)]
struct ConversationDetailDto {
    id: String,
    title: Option<String>,
    messages: Vec<MessageDto>,
}

#[derive(Serialize)]
struct MessageDto {
    id: String,
    role: String,
    content: String,
    metadata: serde_json::Map<String, serde_json::Value>,
    created_at: String,
}

#[derive(Deserialize)]
struct ListConversationsQuery {
    #[serde(default = "default_user_id")]
    user_id: String,
}

#[derive(Deserialize)]
struct CreateExampleRequest {
    user_message: String,
    assistant_message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn map_error(err: Error) -> Response {
    match err {
        Error::Validation { message } => error_response(StatusCode::BAD_REQUEST, message),
        Error::Unauthorized(message) => error_response(StatusCode::UNAUTHORIZED, message),
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatStreamRequest>,
) -> Response {
    if payload.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }

    let persona = match &payload.persona_id {
        Some(id) => match state.personas.get(id) {
            Some(persona) => persona.clone(),
            None => {
                return error_response(StatusCode::BAD_REQUEST, format!("unknown persona: {id}"));
            }
        },
        None => mindhaven_core::persona::Persona::default_counselor(),
    };

    let history: Vec<Message> = payload
        .history
        .iter()
        .filter_map(|turn| match turn.role.as_str() {
            "user" => Some(Message::user(&turn.content)),
            "assistant" => Some(Message::assistant(&turn.content)),
            _ => None,
        })
        .collect();

    info!(user_id = %payload.user_id, "chat/stream request");

    let request = TurnRequest {
        conversation_id: payload.conversation_id,
        user_id: payload.user_id,
        persona,
        message: payload.message,
        history,
    };

    match state.orchestrator.handle_turn(request).await {
        // Guard block: complete non-streamed body with HTTP success status.
        Ok(TurnResponse::Blocked { content, reason }) => Json(BlockedResponse {
            blocked: true,
            reason: reason.as_str().into(),
            content,
        })
        .into_response(),

        Ok(TurnResponse::Stream { rx, .. }) => {
            let stream = ReceiverStream::new(rx).map(|event: ChatStreamEvent| {
                let event_type = event.event_type().to_string();
                let data = serde_json::to_string(&event).unwrap_or_default();
                Ok::<_, Infallible>(SseEvent::default().event(event_type).data(data))
            });
            Sse::new(stream).into_response()
        }

        Err(err) => map_error(err),
    }
}

async fn list_conversations_handler(
    State(state): State<SharedState>,
    Query(query): Query<ListConversationsQuery>,
) -> Response {
    match state.store.list_conversations(&query.user_id).await {
        Ok(conversations) => {
            let summaries: Vec<ConversationSummaryDto> = conversations
                .iter()
                .map(|c| ConversationSummaryDto {
                    id: c.id.to_string(),
                    title: c.title.clone(),
                    message_count: c.messages.len(),
                    created_at: c.created_at.to_rfc3339(),
                    updated_at: c.updated_at.to_rfc3339(),
                })
                .collect();
            Json(summaries).into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn get_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_conversation(&id).await {
        Ok(Some(conversation)) => {
            let detail = ConversationDetailDto {
                id: conversation.id.to_string(),
                title: conversation.title.clone(),
                messages: conversation
                    .messages
                    .iter()
                    .map(|m| MessageDto {
                        id: m.id.clone(),
                        role: match m.role {
                            Role::User => "user".into(),
                            Role::Assistant => "assistant".into(),
                            Role::System => "system".into(),
                        },
                        content: m.content.clone(),
                        metadata: m.metadata.clone(),
                        created_at: m.created_at.to_rfc3339(),
                    })
                    .collect(),
            };
            Json(detail).into_response()
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("unknown conversation: {id}")),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn list_examples_handler(State(state): State<SharedState>) -> Response {
    match state.examples.list_active().await {
        Ok(examples) => Json(examples).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn create_example_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CreateExampleRequest>,
) -> Response {
    if payload.user_message.trim().is_empty() || payload.assistant_message.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "user_message and assistant_message must not be empty",
        );
    }
    match state
        .curator
        .insert(&payload.user_message, &payload.assistant_message)
        .await
    {
        Ok(example) => (StatusCode::CREATED, Json(example)).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn delete_example_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    match state.curator.deactivate(&id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, format!("unknown example: {id}")),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn audit_handler(State(state): State<SharedState>) -> Response {
    Json(state.audit.recent(100)).into_response()
}

// ── Test support ──────────────────────────────────────────────────────────
