mod common;

use chrono::Utc;
use common::TestSink;
use harvester_core::{ApiRoot, HarvestTarget, RunWindow, TableName};
use harvester_engine::{
    Dispatcher, EngineEvent, FailureKind, FetchSettings, FileSinkConfig, Harvester,
    ReqwestFetcher, SinkConfig, Stage, StaticToken,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn harvester(server: &MockServer, directory: &std::path::Path) -> Harvester {
    harvester_with(server, directory, FetchSettings::default())
}

fn harvester_with(
    server: &MockServer,
    directory: &std::path::Path,
    settings: FetchSettings,
) -> Harvester {
    let sinks = SinkConfig {
        file: Some(FileSinkConfig {
            directory: directory.to_path_buf(),
        }),
        ..SinkConfig::default()
    };
    Harvester::new(
        Box::new(ReqwestFetcher::new(settings.clone()).unwrap()),
        Dispatcher::from_config(&sinks, &settings).unwrap(),
        "wdatpprd-weu",
        &settings,
    )
    .with_api_root(ApiRoot::Fixed(server.uri()))
}

fn target(table: TableName) -> HarvestTarget {
    let window = RunWindow::lookback(Utc::now(), 1);
    HarvestTarget::for_table(table, &window, Some("m1")).unwrap()
}

#[tokio::test]
async fn run_continues_past_a_failed_target() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rbac/machine_groups"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 1}, {"id": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cloud/portal/apps/all"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/settings/GetAdvancedFeaturesSetting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"AutoResolve": true})))
        .expect(1)
        .mount(&server)
        .await;

    let temp = tempfile::TempDir::new().unwrap();
    let harvester = harvester(&server, temp.path());
    let targets = vec![
        target(TableName::AdvancedFeatureSettings),
        target(TableName::MachineGroups),
        target(TableName::ConnectedAppStats),
    ];
    let progress = TestSink::new();

    let summary = harvester
        .run(&targets, &StaticToken::new("tok"), &progress)
        .await
        .expect("token accepted");

    assert!(!summary.is_success());
    let succeeded: Vec<(TableName, usize)> = summary
        .succeeded
        .iter()
        .map(|outcome| (outcome.table, outcome.records))
        .collect();
    assert_eq!(
        succeeded,
        vec![
            (TableName::AdvancedFeatureSettings, 1),
            (TableName::MachineGroups, 2)
        ]
    );
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, TableName::ConnectedAppStats);
    assert_eq!(summary.failed[0].1.kind, FailureKind::HttpStatus(500));

    let completed = progress
        .take()
        .into_iter()
        .filter(|event| matches!(event, EngineEvent::TargetCompleted { .. }))
        .count();
    assert_eq!(completed, 3);
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn paginated_target_is_written_as_one_array() {
    let server = MockServer::start().await;
    let events_path = "/api/detection/experience/timeline/machines/m1/events/";
    Mock::given(method("GET"))
        .and(path(events_path))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [{"e": 3}],
            "Prev": ""
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(events_path))
        .and(query_param("machineId", "m1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [{"e": 1}, {"e": 2}],
            "Prev": "/machines/m1/events/?page=2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = tempfile::TempDir::new().unwrap();
    let harvester = harvester(&server, temp.path());
    let outcome = harvester
        .run_target(&target(TableName::Timeline), "tok", &TestSink::new())
        .await
        .expect("timeline harvested");

    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.records, 3);
    let path = outcome.receipts[0].path.clone().unwrap();
    let written: Vec<Value> = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(written, vec![json!({"e": 1}), json!({"e": 2}), json!({"e": 3})]);
}

#[tokio::test]
async fn undecodable_response_fails_before_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dataexportsettings"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"just a string\""))
        .mount(&server)
        .await;

    let temp = tempfile::TempDir::new().unwrap();
    let harvester = harvester(&server, temp.path());
    let progress = TestSink::new();
    let err = harvester
        .run_target(&target(TableName::DataExportSettings), "tok", &progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Normalizing);
    assert_eq!(err.kind, FailureKind::Decode);
    assert!(!progress.stages().contains(&Stage::Delivering));
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn empty_token_aborts_the_run() {
    let server = MockServer::start().await;
    let temp = tempfile::TempDir::new().unwrap();
    let harvester = harvester(&server, temp.path());

    let err = harvester
        .run(
            &[target(TableName::MachineGroups)],
            &StaticToken::new("  "),
            &TestSink::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Authentication);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn page_cap_comes_from_the_fetch_settings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [{"e": 1}],
            "Prev": "/machines/m1/events/?page=next"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let temp = tempfile::TempDir::new().unwrap();
    let settings = FetchSettings {
        max_pages: 2,
        ..FetchSettings::default()
    };
    let harvester = harvester_with(&server, temp.path(), settings);
    let err = harvester
        .run_target(&target(TableName::Timeline), "tok", &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::PageLimitExceeded { max_pages: 2 });
}
