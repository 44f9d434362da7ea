use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use humanizer_core::{
    ErrorBody, HumanizeRequest, HumanizeRequestBody, HumanizeResponseBody,
    build_system_instruction,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

/// The one message clients ever see on failure. The real cause (network,
/// auth, quota, malformed upstream body) is logged but never surfaced, so
/// callers cannot distinguish failure classes from the response alone.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while humanizing the text. Please try again.";

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("http client init failed: {0}")]
    HttpClientInit(reqwest::Error),
    #[error("upstream request failed: {0}")]
    Upstream(reqwest::Error),
    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("upstream response contained no completion choices")]
    EmptyCompletion,
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] humanizer_core::CoreError),
}

/// Upstream provider settings, read once at process start. An absent API key
/// is deliberately not validated here; it surfaces as an upstream auth
/// failure on the first call.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("HUMANIZER_UPSTREAM_URL")
            .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_owned());
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: std::env::var("HUMANIZER_API_KEY").unwrap_or_default(),
            model: std::env::var("HUMANIZER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_owned()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    http: reqwest::Client,
    config: Arc<UpstreamConfig>,
}

impl AppState {
    pub fn new(config: UpstreamConfig) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .map_err(RelayError::HttpClientInit)?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/humanize", post(humanize_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), String> {
    info!(
        "relay listening on {}",
        listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_owned())
    );
    axum::serve(listener, build_router(state))
        .await
        .map_err(|err| err.to_string())
}

async fn healthz_handler() -> impl IntoResponse {
    Json(serde_json::json!({"ok": true}))
}

async fn humanize_handler(
    State(state): State<AppState>,
    Json(body): Json<HumanizeRequestBody>,
) -> impl IntoResponse {
    match humanize(&state, body).await {
        Ok(result) => (StatusCode::OK, Json(HumanizeResponseBody { result })).into_response(),
        Err(err) => {
            error!("humanize request failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: GENERIC_FAILURE_MESSAGE.to_owned(),
                }),
            )
                .into_response()
        }
    }
}

/// One upstream call per incoming request; no retries, no admission control.
async fn humanize(state: &AppState, body: HumanizeRequestBody) -> Result<String, RelayError> {
    let request = body.into_request()?;
    call_upstream(state, &request).await
}

async fn call_upstream(state: &AppState, request: &HumanizeRequest) -> Result<String, RelayError> {
    let url = format!("{}/chat/completions", state.config.base_url);
    let chat_request = ChatCompletionRequest {
        model: &state.config.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: build_system_instruction(request.tone),
            },
            ChatMessage {
                role: "user",
                content: request.text.clone(),
            },
        ],
        temperature: request.params.temperature,
        top_p: request.params.top_p,
        max_tokens: request.params.max_tokens,
    };

    let response = state
        .http
        .post(&url)
        .bearer_auth(&state.config.api_key)
        .json(&chat_request)
        .send()
        .await
        .map_err(RelayError::Upstream)?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RelayError::UpstreamStatus {
            status: status.as_u16(),
            body,
        });
    }

    let completion: ChatCompletionResponse =
        response.json().await.map_err(RelayError::Upstream)?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or(RelayError::EmptyCompletion)?;

    Ok(content.trim().to_owned())
}
