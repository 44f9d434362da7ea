use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use humanizer_core::{ErrorBody, HumanizeResponseBody};
use humanizer_relay::{AppState, GENERIC_FAILURE_MESSAGE, UpstreamConfig, build_router};
use tokio::{net::TcpListener, sync::oneshot};

#[derive(Debug, Clone)]
enum MockReply {
    Completion(&'static str),
    Status(u16, &'static str),
}

#[derive(Clone)]
struct MockUpstream {
    reply: MockReply,
    captured: Arc<Mutex<Option<serde_json::Value>>>,
}

async fn chat_completions_handler(
    State(mock): State<MockUpstream>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    *mock.captured.lock().expect("capture lock") = Some(body);
    match mock.reply {
        MockReply::Completion(content) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })),
        )
            .into_response(),
        MockReply::Status(status, text) => (
            StatusCode::from_u16(status).expect("valid mock status"),
            text.to_owned(),
        )
            .into_response(),
    }
}

async fn start_mock_upstream(
    reply: MockReply,
) -> (
    String,
    Arc<Mutex<Option<serde_json::Value>>>,
    oneshot::Sender<()>,
) {
    let captured = Arc::new(Mutex::new(None));
    let mock = MockUpstream {
        reply,
        captured: Arc::clone(&captured),
    };
    let router = Router::new()
        .route("/chat/completions", post(chat_completions_handler))
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream socket");
    let address = listener.local_addr().expect("mock upstream local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = axum::serve(listener, router).with_graceful_shutdown(async {
        let _ = shutdown_rx.await;
    });
    tokio::spawn(async move {
        let _ = server.await;
    });

    (format!("http://{}", address), captured, shutdown_tx)
}

async fn start_relay(upstream_base_url: String) -> (String, oneshot::Sender<()>) {
    let state = AppState::new(UpstreamConfig {
        base_url: upstream_base_url,
        api_key: "test-key".to_owned(),
        model: "test-model".to_owned(),
    })
    .expect("build relay state");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral relay socket");
    let address = listener.local_addr().expect("relay local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = axum::serve(listener, build_router(state)).with_graceful_shutdown(async {
        let _ = shutdown_rx.await;
    });
    tokio::spawn(async move {
        let _ = server.await;
    });

    (format!("http://{}", address), shutdown_tx)
}

#[tokio::test]
async fn humanize_returns_trimmed_upstream_result() {
    let (upstream_url, _captured, upstream_shutdown) =
        start_mock_upstream(MockReply::Completion("  Here you go, much friendlier!  \n")).await;
    let (relay_url, relay_shutdown) = start_relay(upstream_url).await;

    let response = reqwest::Client::new()
        .post(format!("{relay_url}/api/humanize"))
        .json(&serde_json::json!({"text": "The system has processed your request."}))
        .send()
        .await
        .expect("post humanize");

    assert_eq!(response.status(), 200);
    let body: HumanizeResponseBody = response.json().await.expect("parse success body");
    assert_eq!(body.result, "Here you go, much friendlier!");

    let _ = upstream_shutdown.send(());
    let _ = relay_shutdown.send(());
}

#[tokio::test]
async fn legacy_prompt_field_is_accepted() {
    let (upstream_url, _captured, upstream_shutdown) =
        start_mock_upstream(MockReply::Completion("rewritten")).await;
    let (relay_url, relay_shutdown) = start_relay(upstream_url).await;

    let response = reqwest::Client::new()
        .post(format!("{relay_url}/api/humanize"))
        .json(&serde_json::json!({"prompt": "old client payload"}))
        .send()
        .await
        .expect("post humanize with prompt field");

    assert_eq!(response.status(), 200);
    let body: HumanizeResponseBody = response.json().await.expect("parse success body");
    assert_eq!(body.result, "rewritten");

    let _ = upstream_shutdown.send(());
    let _ = relay_shutdown.send(());
}

#[tokio::test]
async fn upstream_failure_maps_to_generic_error() {
    let (upstream_url, _captured, upstream_shutdown) =
        start_mock_upstream(MockReply::Status(429, "quota exceeded for key sk-secret")).await;
    let (relay_url, relay_shutdown) = start_relay(upstream_url).await;

    let response = reqwest::Client::new()
        .post(format!("{relay_url}/api/humanize"))
        .json(&serde_json::json!({"text": "anything"}))
        .send()
        .await
        .expect("post humanize");

    assert_eq!(response.status(), 500);
    let body: ErrorBody = response.json().await.expect("parse error body");
    assert_eq!(body.error, GENERIC_FAILURE_MESSAGE);
    assert!(
        !body.error.contains("sk-secret"),
        "upstream details must not leak to the client"
    );

    let _ = upstream_shutdown.send(());
    let _ = relay_shutdown.send(());
}

#[tokio::test]
async fn unreachable_upstream_maps_to_generic_error() {
    // Port 9 on localhost has nothing listening.
    let (relay_url, relay_shutdown) = start_relay("http://127.0.0.1:9".to_owned()).await;

    let response = reqwest::Client::new()
        .post(format!("{relay_url}/api/humanize"))
        .json(&serde_json::json!({"text": "anything"}))
        .send()
        .await
        .expect("post humanize");

    assert_eq!(response.status(), 500);
    let body: ErrorBody = response.json().await.expect("parse error body");
    assert_eq!(body.error, GENERIC_FAILURE_MESSAGE);

    let _ = relay_shutdown.send(());
}

#[tokio::test]
async fn blank_text_is_rejected_without_upstream_call() {
    let (upstream_url, captured, upstream_shutdown) =
        start_mock_upstream(MockReply::Completion("unreachable")).await;
    let (relay_url, relay_shutdown) = start_relay(upstream_url).await;

    let response = reqwest::Client::new()
        .post(format!("{relay_url}/api/humanize"))
        .json(&serde_json::json!({"text": "   \n  "}))
        .send()
        .await
        .expect("post humanize");

    assert_eq!(response.status(), 500);
    assert!(
        captured.lock().expect("capture lock").is_none(),
        "blank text must not reach the upstream provider"
    );

    let _ = upstream_shutdown.send(());
    let _ = relay_shutdown.send(());
}

#[tokio::test]
async fn tone_and_sampling_params_reach_upstream() {
    let (upstream_url, captured, upstream_shutdown) =
        start_mock_upstream(MockReply::Completion("ok")).await;
    let (relay_url, relay_shutdown) = start_relay(upstream_url).await;

    let response = reqwest::Client::new()
        .post(format!("{relay_url}/api/humanize"))
        .json(&serde_json::json!({
            "text": "please rephrase",
            "tone": "poetic",
            "settings": {"temperature": 1.5, "top_p": 0.5, "max_tokens": 9999}
        }))
        .send()
        .await
        .expect("post humanize");
    assert_eq!(response.status(), 200);

    let body = captured
        .lock()
        .expect("capture lock")
        .clone()
        .expect("upstream saw a request");
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["temperature"], 1.5);
    assert_eq!(body["top_p"], 0.5);
    // Out-of-range max_tokens is clamped before forwarding.
    assert_eq!(body["max_tokens"], 2000);

    let messages = body["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "please rephrase");
    let system = messages[0]["content"].as_str().expect("system content");
    assert!(system.contains("poetic"), "system message: {system}");

    let _ = upstream_shutdown.send(());
    let _ = relay_shutdown.send(());
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (relay_url, relay_shutdown) = start_relay("http://127.0.0.1:9".to_owned()).await;

    let response = reqwest::Client::new()
        .get(format!("{relay_url}/healthz"))
        .send()
        .await
        .expect("get healthz");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("parse healthz body");
    assert_eq!(body["ok"], true);

    let _ = relay_shutdown.send(());
}
