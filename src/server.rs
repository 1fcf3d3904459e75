//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a question given prior turns (rate limited) |
//! | `GET`  | `/` | Health check |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! `/chat` answers `200 {"reply": "..."}` for every well-formed request,
//! including ones where retrieval or generation failed (the reply carries an
//! apology). Other failures use a JSON body:
//!
//! ```json
//! { "error": "Too Many Requests" }
//! ```
//!
//! `400` for malformed bodies, `429` when the client exceeds its window.
//!
//! # CORS
//!
//! Origins come from `[server].allowed_origins`; an empty list permits any
//! origin. All methods and headers are allowed.

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::{Config, ServerConfig};
use crate::models::ConversationTurn;
use crate::rate_limit::FixedWindowLimiter;
use crate::service::ChatService;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    service: ChatService,
}

/// Loads the corpus and providers, then serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = ChatService::load(config)?;
    let app = router(service, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("listening on http://{}", config.server.bind);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Build the router. The rate limiter is created here and owned by the router.
pub fn router(service: ChatService, server: &ServerConfig) -> Router {
    let limiter = Arc::new(FixedWindowLimiter::new(
        server.rate_limit_requests,
        server.rate_limit_window_secs,
    ));

    Router::new()
        .route(
            "/chat",
            post(handle_chat).route_layer(middleware::from_fn_with_state(limiter, enforce_rate_limit)),
        )
        .route("/", get(handle_health))
        .route("/health", get(handle_health))
        .layer(cors_layer(&server.allowed_origins))
        .layer(middleware::from_fn(log_requests))
        .with_state(AppState { service })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

fn client_ip(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// ============ Middleware ============

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let ip = client_ip(&req);
    let start = Instant::now();
    tracing::info!(%method, %path, client = %ip, "incoming request");

    let response = next.run(req).await;

    tracing::info!(
        %method,
        %path,
        client = %ip,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "completed request"
    );
    response
}

async fn enforce_rate_limit(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&req);
    let path = req.uri().path().to_string();

    if !limiter.check(&format!("{}:{}", ip, path)) {
        tracing::warn!(
            client = %ip,
            %path,
            tracked_clients = limiter.tracked(),
            "rate limit exceeded"
        );
        return AppError::new(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
    }
    next.run(req).await
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error = %rejection.body_text(), "rejected chat request body");
        AppError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    tracing::debug!("health check");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /chat ============

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Handler for `POST /chat`.
///
/// The pipeline never fails outward; every accepted request gets a reply.
async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = body?;

    let reply = state.service.chat(&request.message, &request.history).await;
    Ok(Json(ChatResponse { reply }))
}
