//! End-to-end tests of the engine: import, validate, persist, query and export.
//!
//! UDP trackers are fake servers on 127.0.0.1 and HTTP trackers are mock
//! servers from `httptest`, so no test leaves the machine.

use std::sync::Arc;
use std::time::Duration;

use httptest::{matchers::*, responders::*, Expectation, Server};
use tempfile::TempDir;
use tracker_status::config::DEFAULT_USER_AGENT;
use tracker_status::export::{export_history, ExportFormat, ExportOptions};
use tracker_status::interface::DeviceBinder;
use tracker_status::parse::ImportFormat;
use tracker_status::probe::ProbeRouter;
use tracker_status::storage::ReliabilityStore;
use tracker_status::{
    BatchState, Config, ProbeErrorKind, TrackerEngine, UsageError, ValidationSettings,
};

#[path = "helpers.rs"]
mod helpers;

use helpers::{create_test_pool, FakeUdpTracker, TrackerBehavior};

async fn test_engine() -> TrackerEngine {
    let config = Config {
        validation: ValidationSettings {
            max_workers: 4,
            timeout_budget: Duration::from_millis(800),
            socket_timeout: Duration::from_millis(200),
        },
        ..Default::default()
    };
    let router = ProbeRouter::new(DEFAULT_USER_AGENT, 6969, Arc::new(DeviceBinder))
        .expect("probe router");
    let store = ReliabilityStore::new(create_test_pool().await);
    TrackerEngine::with_parts(config, Arc::new(router), Arc::new(store), None)
}

/// Imports `list`, validates it and waits for the outcome.
async fn validate(engine: &TrackerEngine, list: &str) -> tracker_status::BatchOutcome {
    let deduplicated = engine
        .import(list, ImportFormat::Text)
        .expect("import");
    let handle = engine
        .start_validation(engine.batch_request(deduplicated.endpoints))
        .expect("start validation");
    handle.wait().await
}

#[tokio::test]
async fn test_url_variants_are_probed_and_stored_once() {
    let tracker = FakeUdpTracker::start(TrackerBehavior::Answer).await;
    let engine = test_engine().await;

    let variant = format!("UDP://{}/Announce?tr=x", tracker.addr);
    let list = format!("{}\n{}\n", tracker.url(), variant);

    let outcome = validate(&engine, &list).await;
    assert_eq!(outcome.state, BatchState::Completed);
    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.working, 1);
    assert_eq!(tracker.requests(), 1);

    let history = engine.get_history(50).await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].check_count, 1);
    assert_eq!(history[0].success_count, 1);
    assert!(history[0].last_alive);

    // Lookups accept any spelling of the tracker
    let record = engine
        .reliability_of(&variant)
        .await
        .expect("lookup")
        .expect("record exists");
    assert_eq!(record.normalized_key, history[0].normalized_key);
}

#[tokio::test]
async fn test_mixed_batch_outcome() {
    let alive = FakeUdpTracker::start(TrackerBehavior::Answer).await;
    let silent = FakeUdpTracker::start(TrackerBehavior::Silent).await;
    let http = Server::run();
    http.expect(
        Expectation::matching(request::method_path("GET", "/announce"))
            .respond_with(status_code(200)),
    );
    let engine = test_engine().await;

    let list = format!(
        "{}\n{}\nhttp://{}/announce\nmagnet:?xt=urn:btih:abcdef0123456789abcdef0123456789abcdef01\n",
        alive.url(),
        silent.url(),
        http.addr()
    );
    let outcome = validate(&engine, &list).await;

    assert_eq!(outcome.state, BatchState::Completed);
    assert_eq!(outcome.total, 4);
    assert_eq!(outcome.working, 2);
    assert_eq!(outcome.skipped(), 0);
    assert!(outcome
        .error_counts
        .contains(&(ProbeErrorKind::Timeout, 1)));
    assert!(outcome
        .error_counts
        .contains(&(ProbeErrorKind::UnsupportedScheme, 1)));

    let report = engine.reliability_report().await.expect("report");
    assert_eq!(report.classified() + report.insufficient_data, 4);
}

#[tokio::test]
async fn test_reliability_accumulates_across_batches() {
    let tracker = FakeUdpTracker::start(TrackerBehavior::Answer).await;
    let engine = test_engine().await;

    for _ in 0..3 {
        let outcome = validate(&engine, &tracker.url()).await;
        assert_eq!(outcome.working, 1);
    }

    let reliable = engine
        .get_reliable_trackers(0.7, 2)
        .await
        .expect("reliable trackers");
    assert_eq!(reliable.len(), 1);
    assert_eq!(reliable[0].check_count, 3);
    assert_eq!(reliable[0].success_rate(), 1.0);

    let report = engine.reliability_report().await.expect("report");
    assert_eq!(report.high, 1);
}

#[tokio::test]
async fn test_one_batch_at_a_time() {
    let tracker = FakeUdpTracker::start(TrackerBehavior::Silent).await;
    let engine = test_engine().await;

    let deduplicated = engine.import(&tracker.url(), ImportFormat::Text).expect("import");
    let handle = engine
        .start_validation(engine.batch_request(deduplicated.endpoints.clone()))
        .expect("start validation");

    let second = engine.start_validation(engine.batch_request(deduplicated.endpoints.clone()));
    assert!(matches!(second, Err(UsageError::BatchAlreadyRunning)));

    engine.stop_validation(&handle);
    let outcome = handle.wait().await;
    assert_ne!(outcome.state, BatchState::Running);

    // The validator is free again once the batch has finished
    let next = engine
        .start_validation(engine.batch_request(deduplicated.endpoints))
        .expect("second batch starts");
    next.wait().await;
}

#[tokio::test]
async fn test_empty_import_is_rejected() {
    let engine = test_engine().await;
    let deduplicated = engine
        .import("nothing to see here", ImportFormat::Auto)
        .expect("import");
    assert!(deduplicated.endpoints.is_empty());

    let result = engine.start_validation(engine.batch_request(deduplicated.endpoints));
    assert!(matches!(result, Err(UsageError::NoEndpoints)));
}

#[tokio::test]
async fn test_find_duplicates() {
    let engine = test_engine().await;
    let stats = engine.find_duplicates(
        "udp://a.example:1337/announce\n\
         UDP://A.example:1337/announce?tr=1\n\
         http://b.example/announce\n",
    );
    assert_eq!(stats.total, 3);
    assert_eq!(stats.unique, 2);
    assert_eq!(stats.duplicates, 1);
}

#[tokio::test]
async fn test_favorites_show_reliability() {
    let tracker = FakeUdpTracker::start(TrackerBehavior::Answer).await;
    let engine = test_engine().await;

    engine
        .add_favorite(&tracker.url(), Some("local"))
        .await
        .expect("add favorite");
    let favorites = engine.list_favorites().await.expect("list");
    assert_eq!(favorites.len(), 1);
    assert!(favorites[0].reliability.is_none());

    validate(&engine, &tracker.url()).await;
    let favorites = engine.list_favorites().await.expect("list");
    assert_eq!(favorites[0].note.as_deref(), Some("local"));
    let reliability = favorites[0].reliability.as_ref().expect("checked once");
    assert_eq!(reliability.check_count, 1);

    // Removal accepts another spelling of the same tracker
    let upper = tracker.url().to_uppercase();
    assert!(engine.remove_favorite(&upper).await.expect("remove"));
    assert!(!engine.remove_favorite(&upper).await.expect("remove again"));
}

#[tokio::test]
async fn test_export_history_files() {
    let tracker = FakeUdpTracker::start(TrackerBehavior::Answer).await;
    let silent = FakeUdpTracker::start(TrackerBehavior::Silent).await;
    let engine = test_engine().await;
    validate(&engine, &format!("{}\n{}", tracker.url(), silent.url())).await;
    let records = engine.get_history(50).await.expect("history");

    let dir = TempDir::new().expect("temp dir");

    let text_path = dir.path().join("alive.txt");
    let written = export_history(
        &ExportOptions {
            output: Some(text_path.clone()),
            format: ExportFormat::Text,
        },
        &records,
    )
    .await
    .expect("text export");
    assert_eq!(written, 1);
    let text = std::fs::read_to_string(&text_path).expect("read text");
    assert_eq!(text.trim(), tracker.url());

    let json_path = dir.path().join("history.json");
    export_history(
        &ExportOptions {
            output: Some(json_path.clone()),
            format: ExportFormat::Json,
        },
        &records,
    )
    .await
    .expect("json export");
    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).expect("read json"))
            .expect("valid json");
    assert_eq!(document["trackers"].as_array().map(Vec::len), Some(2));

    let csv_path = dir.path().join("history.csv");
    let rows = export_history(
        &ExportOptions {
            output: Some(csv_path.clone()),
            format: ExportFormat::Csv,
        },
        &records,
    )
    .await
    .expect("csv export");
    assert_eq!(rows, 2);
    let csv = std::fs::read_to_string(&csv_path).expect("read csv");
    assert!(csv.starts_with("url,check_count,success_count"));
    assert_eq!(csv.lines().count(), 3);
}

#[tokio::test]
async fn test_open_creates_database_file() {
    let dir = TempDir::new().expect("temp dir");
    let config = Config {
        db_path: dir.path().join("nested").join("trackers.db"),
        ..Default::default()
    };
    let engine = TrackerEngine::open(config.clone(), None)
        .await
        .expect("engine opens");
    assert!(config.db_path.exists());
    assert!(engine.get_history(10).await.expect("history").is_empty());
    engine.shutdown().await;
}
