//! E2E tests: engine plus HTTP backend against a mocked availability API.
//!
//! Timings are shortened through `EngineConfig` so the real clock can be
//! used.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use mockito::{Matcher, Server, ServerGuard};
use pawsit_core::availability::{
    AvailabilityId, AvailabilityRecord, AvailabilitySyncEngine, StaticCredentials, StatusMessage,
    StatusView, SyncStatus, UserId,
};
use pawsit_core::{BackendConfig, EngineConfig};
use serde_json::json;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

const COLLECTION: &str = "/users/42/availability/";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn fast_config(server: &ServerGuard) -> EngineConfig {
    EngineConfig {
        debounce_ms: 50,
        saved_display_ms: 150,
        error_display_ms: 150,
        backend: BackendConfig {
            base_url: server.url(),
            request_timeout_secs: 5,
        },
    }
}

fn engine_for(server: &ServerGuard) -> AvailabilitySyncEngine {
    let creds = Arc::new(StaticCredentials::new(UserId::new("42"), "secret-token"));
    AvailabilitySyncEngine::with_http(fast_config(server), creds).unwrap()
}

async fn wait_for_status(rx: &mut watch::Receiver<StatusView>, status: SyncStatus) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|view| view.status == status))
        .await
        .expect("status never reached")
        .expect("engine dropped");
}

/// Test: empty calendar, select two dates, save, then deselect one.
#[tokio::test]
async fn test_select_save_and_deselect() {
    init_tracing();
    let mut server = Server::new_async().await;

    let initial = server
        .mock("GET", COLLECTION)
        .match_header("authorization", "Bearer secret-token")
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let engine = engine_for(&server);
    engine.load().await.unwrap();
    assert!(engine.is_loaded());
    initial.assert_async().await;
    initial.remove_async().await;

    // Phase 1: bulk-create both dates.
    let create = server
        .mock("POST", COLLECTION)
        .match_body(Matcher::Json(json!([
            {"available_date": "2024-03-10"},
            {"available_date": "2024-03-11"},
        ])))
        .with_status(201)
        .with_body(r#"[{"id": 101, "available_date": "2024-03-10"}, {"id": 102, "available_date": "2024-03-11"}]"#)
        .expect(1)
        .create_async()
        .await;
    let after_create = server
        .mock("GET", COLLECTION)
        .with_status(200)
        .with_body(r#"[{"id": 101, "available_date": "2024-03-10"}, {"id": 102, "available_date": "2024-03-11"}]"#)
        .create_async()
        .await;

    let mut rx = engine.subscribe();
    engine.apply_selection([day("2024-03-11"), day("2024-03-10")]);
    assert_eq!(engine.status().status, SyncStatus::Pending);

    wait_for_status(&mut rx, SyncStatus::Saved).await;
    create.assert_async().await;
    assert_eq!(
        engine.snapshot(),
        vec![
            AvailabilityRecord::persisted(AvailabilityId(101), day("2024-03-10")),
            AvailabilityRecord::persisted(AvailabilityId(102), day("2024-03-11")),
        ]
    );
    wait_for_status(&mut rx, SyncStatus::Idle).await;
    after_create.remove_async().await;

    // Phase 2: one delete for the deselected date.
    let delete = server
        .mock("DELETE", "/users/42/availability/101/")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", COLLECTION)
        .with_status(200)
        .with_body(r#"[{"id": 102, "available_date": "2024-03-11"}]"#)
        .create_async()
        .await;

    engine.apply_selection([day("2024-03-11")]);
    wait_for_status(&mut rx, SyncStatus::Saved).await;

    delete.assert_async().await;
    assert_eq!(
        engine.snapshot(),
        vec![AvailabilityRecord::persisted(AvailabilityId(102), day("2024-03-11"))]
    );
    assert!(!engine.has_unsaved_changes());
}

/// Test: the re-fetch decides the outcome, not the create response body.
#[tokio::test]
async fn test_save_with_summary_create_body() {
    init_tracing();
    let mut server = Server::new_async().await;
    let initial = server
        .mock("GET", COLLECTION)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let engine = engine_for(&server);
    engine.load().await.unwrap();
    initial.remove_async().await;

    server
        .mock("POST", COLLECTION)
        .with_status(201)
        .with_body(r#"{"created": 1}"#)
        .create_async()
        .await;
    server
        .mock("GET", COLLECTION)
        .with_status(200)
        .with_body(r#"[{"id": 5, "available_date": "2024-06-01"}]"#)
        .create_async()
        .await;

    let mut rx = engine.subscribe();
    engine.apply_selection([day("2024-06-01")]);
    wait_for_status(&mut rx, SyncStatus::Saved).await;

    assert_eq!(
        engine.snapshot(),
        vec![AvailabilityRecord::persisted(AvailabilityId(5), day("2024-06-01"))]
    );
    assert!(!engine.has_unsaved_changes());
}

/// Test: a user without the sitter role sees the dedicated message.
#[tokio::test]
async fn test_forbidden_save_reports_not_eligible() {
    init_tracing();
    let mut server = Server::new_async().await;
    server
        .mock("GET", COLLECTION)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    server
        .mock("POST", COLLECTION)
        .with_status(403)
        .with_body(r#"{"detail": "Only sitters can set availability."}"#)
        .create_async()
        .await;

    let engine = engine_for(&server);
    engine.load().await.unwrap();
    let mut rx = engine.subscribe();

    engine.apply_selection([day("2024-05-01")]);
    wait_for_status(&mut rx, SyncStatus::Error).await;

    assert_eq!(
        engine.status(),
        StatusView::with_message(SyncStatus::Error, StatusMessage::NotEligible)
    );
    assert_eq!(
        engine.selection(),
        vec![AvailabilityRecord::local(day("2024-05-01"))]
    );

    wait_for_status(&mut rx, SyncStatus::Idle).await;
    assert!(engine.has_unsaved_changes());
}

/// Test: a failing initial load shows the load error.
#[tokio::test]
async fn test_load_failure() {
    init_tracing();
    let mut server = Server::new_async().await;
    server
        .mock("GET", COLLECTION)
        .with_status(503)
        .create_async()
        .await;

    let engine = engine_for(&server);
    assert!(engine.load().await.is_err());
    assert!(!engine.is_loaded());
    assert_eq!(
        engine.status(),
        StatusView::with_message(SyncStatus::Error, StatusMessage::LoadFailed)
    );
}
