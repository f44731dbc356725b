// tests/status_api.rs
// Status router exercised in-process via tower::ServiceExt::oneshot.
mod common;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use chrono::{Duration as ChronoDuration, Utc};
use tower::ServiceExt;

use common::{harness, rss, source, Stub, StubFetcher};
use news_worker::api::{router, AppState};
use news_worker::ingest::clock::manual_ticker;
use news_worker::ingest::scheduler::{shutdown_channel, Scheduler, StatusHandle};
use news_worker::SourceRegistry;

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}

#[tokio::test]
async fn health_is_ok() {
    let app = router(AppState::new(StatusHandle::new(Utc::now()), "http://localhost:8080"));
    let (code, v) = get_json(app, "/health").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(v, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn status_before_first_cycle() {
    let started = Utc::now() - ChronoDuration::seconds(30);
    let app = router(AppState::new(StatusHandle::new(started), "http://api.test"));
    let (code, v) = get_json(app, "/status").await;

    assert_eq!(code, StatusCode::OK);
    assert_eq!(v["status"], "running");
    assert_eq!(v["state"], "idle");
    assert_eq!(v["cycles_completed"], 0);
    assert!(v["last_collected_at"].is_null());
    assert!(v["last_cycle"].is_null());
    assert_eq!(v["api_base_url"], "http://api.test");
    assert!(v["uptime_secs"].as_i64().unwrap() >= 30);
}

#[tokio::test]
async fn status_reflects_completed_cycles() {
    let h = harness(StubFetcher::new().with("A", Stub::Body(rss(&[("a1", ""), ("a2", "")]))), &[]);
    let (_trigger, ticker) = manual_ticker();
    let (stop, stop_rx) = shutdown_channel();
    let status = StatusHandle::new(Utc::now());

    let run = tokio::spawn(
        Scheduler::new(
            h.collector.clone(),
            SourceRegistry::new(vec![source("A")]),
            ticker,
            stop_rx,
        )
        .with_status(status.clone())
        .run(),
    );
    stop.send(true).unwrap();
    run.await.unwrap();

    let app = router(AppState::new(status, "http://api.test"));
    let (_, v) = get_json(app, "/status").await;
    assert_eq!(v["state"], "stopped");
    assert_eq!(v["cycles_completed"], 1);
    assert_eq!(v["last_cycle"]["articles"], 2);
    assert_eq!(v["last_cycle"]["errors"], 0);
    assert!(v["last_collected_at"].is_string());
}

#[tokio::test]
async fn metrics_without_recorder_is_unavailable() {
    let app = router(AppState::new(StatusHandle::new(Utc::now()), "http://api.test"));
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
