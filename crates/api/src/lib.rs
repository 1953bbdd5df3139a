mod rate_limit;
pub mod telegram;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use serde::{Deserialize, Serialize};
use skyprice_agents::{build_agent, ServiceConfig, SkyPriceAgent};
use skyprice_core::{InboundMessage, Locale};
use skyprice_observability::{AppMetrics, MetricsSnapshot};
use skyprice_storage::MemoryStore;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::ClientRateLimiter;
use crate::telegram::TelegramConfig;

const MAX_USER_ID_LEN: usize = 128;
const MAX_MESSAGE_TEXT_LEN: usize = 4_096;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub bind: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub telegram: Option<TelegramConfig>,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let telegram = read("SKYPRICE_TELEGRAM_TOKEN")
            .or_else(|| read("TELEGRAM_TOKEN"))
            .map(|token| {
                let config = TelegramConfig::new(token);
                match read("SKYPRICE_TELEGRAM_BASE_URL") {
                    Some(base_url) => config.with_base_url(base_url),
                    None => config,
                }
            });

        Self {
            api_key: read("SKYPRICE_API_KEY").unwrap_or_else(|| "dev-skyprice-key".to_string()),
            bind: read("SKYPRICE_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            rate_limit_window: Duration::from_secs(
                read("SKYPRICE_RATE_LIMIT_WINDOW_SECONDS")
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60),
            ),
            rate_limit_max: read("SKYPRICE_RATE_LIMIT_MAX")
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(30),
            telegram,
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<SkyPriceAgent>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    limiter: ClientRateLimiter,
}

impl ApiState {
    pub fn new(agent: Arc<SkyPriceAgent>, config: &ApiConfig) -> Self {
        Self {
            metrics: Arc::clone(agent.metrics()),
            agent,
            api_key: config.api_key.clone(),
            limiter: ClientRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct MessageRequest {
    user_id: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct LanguageResponse {
    user_id: String,
    locale: Locale,
    updated_at_utc: Option<String>,
}

pub fn build_state(service: &ServiceConfig, api: &ApiConfig) -> Result<ApiState> {
    let metrics = AppMetrics::shared();
    let store = Arc::new(MemoryStore::new());
    let agent = build_agent(service, store, metrics).context("failed to build valuation agent")?;
    Ok(ApiState::new(Arc::new(agent), api))
}

pub fn build_app(service: &ServiceConfig, api: &ApiConfig) -> Result<Router> {
    Ok(build_router(build_state(service, api)?))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/messages", post(message))
        .route("/v1/users/:user_id/language", get(user_language))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn message(
    State(state): State<ApiState>,
    Json(request): Json<MessageRequest>,
) -> Response {
    let user_id = request.user_id.trim();
    if user_id.is_empty() || user_id.len() > MAX_USER_ID_LEN {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid_user_id",
                "message": "user_id must be between 1 and 128 characters"
            })),
        )
            .into_response();
    }
    if request.text.len() > MAX_MESSAGE_TEXT_LEN {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(serde_json::json!({
                "error": "text_too_long",
                "message": "text must be at most 4096 bytes"
            })),
        )
            .into_response();
    }

    let reply = state
        .agent
        .handle_inbound(InboundMessage {
            user_id: user_id.to_string(),
            text: request.text,
        })
        .await;
    (StatusCode::OK, Json(reply)).into_response()
}

async fn user_language(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let entry = state.agent.stored_language(&user_id);
    let payload = LanguageResponse {
        locale: entry.map(|entry| entry.locale).unwrap_or_default(),
        updated_at_utc: entry.map(|entry| entry.updated_at.to_rfc3339()),
        user_id,
    };
    (StatusCode::OK, Json(payload))
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "message": "missing or invalid x-api-key"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health")
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        tracing::warn!(client = %ip, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this client"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "local".to_string())
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    response
}
