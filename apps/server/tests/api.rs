use std::sync::Arc;
use std::time::Duration;

use advisory_core::analytics::AnalyticsQueryTrait;
use advisory_core::events::{DomainEvent, RecordingEventSink};
use advisory_server::{api::app_router, build_state, config::Config, scheduler, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn test_config(dir: &TempDir) -> Config {
    Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        db_path: dir.path().join("test.db").to_string_lossy().into_owned(),
        cors_allow: vec!["*".to_string()],
        request_timeout: Duration::from_secs(10),
        cache_ttl: Duration::from_secs(600),
        refresh_interval: Duration::from_secs(60),
        health_window: 20,
    }
}

async fn build_test_app() -> (Router, Arc<AppState>, TempDir) {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    let state = build_state(&config).await.unwrap();
    (app_router(state.clone(), &config), state, dir)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

const SUMMARY: &str = "/api/v1/analytics/company_summary/all?asOf=2025-03-31";

#[tokio::test]
async fn healthz_is_ok() {
    let (app, _state, _dir) = build_test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/api/v1/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn analytics_miss_is_computed_then_cached() {
    let (app, _state, _dir) = build_test_app().await;

    let (status, first) = send(&app, Method::GET, SUMMARY, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["isStale"], Value::Bool(false));
    assert_eq!(first["rateOrTotals"]["kind"], "company_summary");
    assert_eq!(first["rateOrTotals"]["totalFum"], "0");

    let (_, second) = send(&app, Method::GET, SUMMARY, None).await;
    assert_eq!(second["computedAt"], first["computedAt"]);
}

#[tokio::test]
async fn bad_requests_are_rejected() {
    let (app, _state, _dir) = build_test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/v1/analytics/portfolio_value/all", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, _) = send(&app, Method::GET, "/api/v1/analytics/company_revenue/2025-Q9", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/api/v1/analytics/client_irr/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn unknown_entities_do_not_count_against_health() {
    let (app, _state, _dir) = build_test_app().await;
    send(&app, Method::GET, SUMMARY, None).await;

    for i in 0..5 {
        let uri = format!("/api/v1/analytics/portfolio_irr/typo{}", i);
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (_, health) = send(&app, Method::GET, "/api/v1/analytics/health", None).await;
    assert_eq!(health["healthy"], Value::Bool(true));
    assert_eq!(health["recentFailures"], 0);
}

#[tokio::test]
async fn notify_forwards_every_event_to_the_sink() {
    let dir = tempdir().unwrap();
    let config = test_config(&dir);
    let built = build_state(&config).await.unwrap();
    let sink = RecordingEventSink::new();
    let state = Arc::new(AppState {
        analytics: built.analytics.clone(),
        change_poller: built.change_poller.clone(),
        domain_event_sink: Arc::new(sink.clone()),
        db_path: built.db_path.clone(),
    });
    let app = app_router(state, &config);

    let batch = serde_json::json!([
        { "type": "activities_recorded", "holding_ids": ["h1", "h2"] },
        { "type": "entity_status_changed", "client_ids": ["c1"] }
    ]);
    let (status, body) = send(&app, Method::POST, "/api/v1/analytics/notify", Some(batch)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], 2);
    assert_eq!(
        sink.take(),
        vec![
            DomainEvent::activities_recorded(vec!["h1".to_string(), "h2".to_string()]),
            DomainEvent::entity_status_changed(vec!["c1".to_string()], vec![], vec![]),
        ]
    );
}

#[tokio::test]
async fn notification_marks_reports_stale_and_refresh_recomputes() {
    let (app, state, _dir) = build_test_app().await;
    send(&app, Method::GET, SUMMARY, None).await;

    let event = serde_json::json!({ "type": "fee_configuration_changed", "product_ids": ["p1"] });
    let (status, body) = send(&app, Method::POST, "/api/v1/analytics/notify", Some(event)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], 1);

    let mut stale = false;
    for _ in 0..40 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if state.analytics.get_health_check().stale_entries == 1 {
            stale = true;
            break;
        }
    }
    assert!(stale, "notification was not applied");

    let summary = scheduler::run_scheduled_refresh(&state).await;
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.succeeded, 1);

    let (_, refreshed) = send(&app, Method::GET, SUMMARY, None).await;
    assert_eq!(refreshed["isStale"], Value::Bool(false));
}

#[tokio::test]
async fn health_reports_refresh_outcomes() {
    let (app, _state, _dir) = build_test_app().await;

    let (status, before) = send(&app, Method::GET, "/api/v1/analytics/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["healthy"], Value::Bool(true));
    assert_eq!(before["recentRefreshes"], 0);

    send(&app, Method::GET, SUMMARY, None).await;
    let (_, after) = send(&app, Method::GET, "/api/v1/analytics/health", None).await;
    assert_eq!(after["recentRefreshes"], 1);
    assert_eq!(after["freshEntries"], 1);

    let (status, refresh) = send(&app, Method::POST, "/api/v1/analytics/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refresh["attempted"], 0);
}
