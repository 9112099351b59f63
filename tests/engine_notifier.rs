use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use vr_training_admin::config::EngineConfig;
use vr_training_admin::engine::{create_notifier, EngineNotifier, HttpEngineNotifier};

#[derive(Clone, Default)]
struct FakeEngine {
    received: Arc<Mutex<Vec<(Option<String>, Bytes)>>>,
}

async fn accept(State(engine): State<FakeEngine>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    engine.received.lock().push((content_type, body));
    StatusCode::OK
}

async fn reject() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "engine warming up")
}

async fn slow() -> StatusCode {
    tokio::time::sleep(Duration::from_secs(5)).await;
    StatusCode::OK
}

async fn start_fake_engine() -> (String, FakeEngine) {
    let engine = FakeEngine::default();
    let app = Router::new()
        .route("/api/vr-session", post(accept))
        .route("/api/unavailable", post(reject))
        .route("/api/slow", post(slow))
        .with_state(engine.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://127.0.0.1:{port}"), engine)
}

#[tokio::test]
async fn http_notifier_posts_json_payload() {
    let (base, engine) = start_fake_engine().await;
    let config = EngineConfig {
        mode: "http".into(),
        endpoint: format!("{base}/api/vr-session"),
        timeout_secs: 5,
    };
    let notifier = create_notifier(&config).unwrap();

    notifier
        .deliver(br#"{"sessionId":"session_1","status":"running"}"#)
        .await
        .unwrap();

    let received = engine.received.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0.as_deref(), Some("application/json"));
    let json: serde_json::Value = serde_json::from_slice(&received[0].1).unwrap();
    assert_eq!(json["sessionId"], "session_1");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let (base, _) = start_fake_engine().await;
    let notifier =
        HttpEngineNotifier::new(&format!("{base}/api/unavailable"), Duration::from_secs(5)).unwrap();

    let err = notifier.deliver(b"{}").await.unwrap_err().to_string();

    assert!(err.contains("503"));
    assert!(err.contains("engine warming up"));
}

#[tokio::test]
async fn slow_engine_times_out() {
    let (base, _) = start_fake_engine().await;
    let notifier =
        HttpEngineNotifier::new(&format!("{base}/api/slow"), Duration::from_millis(200)).unwrap();

    let started = std::time::Instant::now();
    assert!(notifier.deliver(b"{}").await.is_err());
    assert!(started.elapsed() < Duration::from_secs(4));
}
