//! Inbound HTTP surface for the session bridge
//!
//! Exposes the chat endpoint the backend proxies user messages to, plus
//! a liveness probe. Error mapping follows the two-tier failure policy:
//! a failed history fetch surfaces as 502, model and tool failures as
//! 500; soft failures never reach this layer.

use crate::backend::BackendClient;
use crate::bridge::{Bridge, TurnInput};
use crate::config::Config;
use crate::error::{Result, SportmateError};
use crate::providers;
use crate::tools::search::{SearchTool, SEARCH_TOOL_NAME};
use crate::tools::ToolRegistry;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    bridge: Arc<Bridge>,
}

/// Inbound chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Non-empty free-text user message
    pub message: String,
    /// Session the message belongs to
    pub session_id: Uuid,
    /// Owning user id
    pub user_id: i64,
    /// Bearer token forwarded to the backend stores
    pub access_token: String,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// The assistant's reply
    pub response: String,
}

/// Liveness probe response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    name: &'static str,
    version: &'static str,
    model: String,
}

/// Error envelope returned to callers
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    /// Maps the error taxonomy onto HTTP statuses
    fn from(error: anyhow::Error) -> Self {
        let status = match error.downcast_ref::<SportmateError>() {
            Some(SportmateError::UpstreamUnavailable(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.message }));
        (self.status, body).into_response()
    }
}

/// Build the router for the bridge service
pub fn router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { bridge })
}

/// Build a bridge from configuration
///
/// Wires the provider, the search tool, and the backend client together.
///
/// # Errors
///
/// Returns error if credentials are missing or any client fails to build
pub fn build_bridge(config: &Config) -> Result<Bridge> {
    let provider = providers::create_provider(&config.provider)?;

    let mut tools = ToolRegistry::new();
    let search = SearchTool::new(config.search.clone())?;
    tools.register(SEARCH_TOOL_NAME, Arc::new(search));

    let backend = BackendClient::new(&config.backend)?;

    Bridge::new(provider, tools, backend, config.bridge.clone())
}

/// Run the bridge HTTP service until shutdown
///
/// # Errors
///
/// Returns error if startup wiring fails or the listener cannot bind
pub async fn serve(config: Config) -> Result<()> {
    let bridge = Arc::new(build_bridge(&config)?);

    crate::bridge::metrics::init_metrics_exporter();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        "Bridge listening on {} (model: {}, tools: {})",
        addr,
        bridge.model_name(),
        bridge.num_tools()
    );

    axum::serve(listener, router(bridge)).await?;
    Ok(())
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let input = TurnInput {
        message: request.message,
        session_id: request.session_id,
        user_id: request.user_id,
        access_token: request.access_token,
    };

    let reply = state.bridge.handle_turn(&input).await.map_err(ApiError::from)?;

    Ok(Json(ChatResponse { response: reply }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        model: state.bridge.model_name(),
    })
}
