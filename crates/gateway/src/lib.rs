//! HTTP API gateway for Mindhaven.
//!
//! Exposes the chat pipeline over SSE plus read endpoints for
//! conversations and curation endpoints for golden examples.
//!
//! Security layers applied:
//! - Bearer token authentication on all /v1 routes (disabled when no
//!   tokens are configured — local development)
//! - CORS with restrictive origin policy
//! - Request body size limit (1 MB)
//! - HTTP trace logging

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use mindhaven_core::persona::Persona;
use mindhaven_core::store::{GoldenExampleCurator, GoldenExampleStore, MessageStore};
use mindhaven_guard::GuardAudit;
use mindhaven_pipeline::TurnOrchestrator;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub store: Arc<dyn MessageStore>,
    pub examples: Arc<dyn GoldenExampleStore>,
    pub curator: Arc<dyn GoldenExampleCurator>,
    pub audit: Arc<GuardAudit>,
    /// Personas by id; must contain at least the default persona.
    pub personas: HashMap<String, Persona>,
    /// Accepted bearer tokens. Empty disables authentication.
    pub bearer_tokens: Vec<String>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router: /health plus the authenticated /v1 API.
pub fn build_router(state: SharedState) -> Router {
    let v1 = api::v1_router(state.clone())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::exact(
            "http://localhost:3000".parse().unwrap(),
        ))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn serve(
    state: SharedState,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{host}:{port}");
    let router = build_router(state);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Bearer-token check for /v1 routes. No tokens configured → open.
async fn auth_middleware(
    axum::extract::State(state): axum::extract::State<SharedState>,
    request: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, (StatusCode, Json<api::ErrorResponse>)> {
    if state.bearer_tokens.is_empty() {
        return Ok(next.run(request).await);
    }

    let authorized = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| state.bearer_tokens.iter().any(|t| t == token));

    if authorized {
        Ok(next.run(request).await)
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(api::ErrorResponse {
                error: "Missing or invalid bearer token".into(),
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint_is_open() {
        let app = build_router(test_state(vec![]));
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn v1_requires_token_when_configured() {
        let app = build_router(test_state(vec!["secret-token".into()]));
        let req = Request::builder()
            .uri("/v1/examples")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn v1_accepts_valid_token() {
        let app = build_router(test_state(vec!["secret-token".into()]));
        let req = Request::builder()
            .uri("/v1/examples")
            .header("Authorization", "Bearer secret-token")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn v1_open_without_tokens() {
        let app = build_router(test_state(vec![]));
        let req = Request::builder()
            .uri("/v1/examples")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
