//! Integration tests for the analysis and export endpoints

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Duration;
use initiative::domain::SprintState;
use initiative::jira::Failure;
use initiative::{DiskCacheStore, InMemoryCacheStore, InMemoryIssueSource, Issue, IssueType, ResultCache, ViewerConfig};
use initiative_server::form::AnalyzeForm;
use initiative_server::{create_routes, AppContext};
use std::sync::Arc;
use tempfile::TempDir;

const JQL: &str = "issuetype = \"Business Initiative\" AND project = PORT";

fn jira() -> InMemoryIssueSource {
    InMemoryIssueSource::new()
        .with_issue(Issue::new("PORT-1", "Payments", IssueType::Initiative))
        .with_issue(
            Issue::new("FEAT-1", "Checkout", IssueType::Feature)
                .with_parent("PORT-1")
                .with_fix_version("PI-5"),
        )
        .with_issue(
            Issue::new("SF-1", "Card vault", IssueType::SubFeature)
                .with_parent("FEAT-1")
                .with_fix_version("PI-5"),
        )
        .with_issue(
            Issue::new("EP-1", "Tokenise", IssueType::Epic)
                .with_parent("SF-1")
                .with_area("PAY")
                .with_risk(4),
        )
        .with_issue(
            Issue::new("ST-1", "Build vault", IssueType::Story)
                .with_parent("EP-1")
                .with_sprint("Sprint 3", SprintState::Active),
        )
        .with_search(JQL, &["PORT-1"])
}

/// Helper to create a test server over an in-memory Jira and cache
fn create_test_server(source: InMemoryIssueSource, always_cached: bool) -> TestServer {
    let cache = ResultCache::new(InMemoryCacheStore::new(), Duration::hours(1));
    let context = AppContext::new(ViewerConfig::default(), Arc::new(source), cache)
        .expect("Failed to create context")
        .with_always_cached(always_cached);
    TestServer::new(create_routes(Arc::new(context))).expect("Failed to create test server")
}

fn form(mode: &str) -> AnalyzeForm {
    AnalyzeForm {
        url: "https://jira.example.com".to_string(),
        token: "secret-token".to_string(),
        jql: JQL.to_string(),
        release: "PI-5".to_string(),
        mode: mode.to_string(),
        use_cache: None,
        limit: String::new(),
    }
}

#[tokio::test]
async fn test_analyze_renders_hierarchy() {
    let server = create_test_server(jira(), false);

    let response = server.post("/analyze").form(&form("normal")).await;
    response.assert_status_ok();

    let html = response.text();
    assert!(html.contains("PORT-1: Payments"));
    assert!(html.contains("FEATURE: FEAT-1"));
    assert!(html.contains("EP-1"));
    assert!(html.contains("/export/pdf?id="));
    assert!(!html.contains("/export/text-keys"));
    assert!(!html.contains("secret-token"));
}

#[tokio::test]
async fn test_invalid_form_shows_error_without_token() {
    let server = create_test_server(jira(), false);
    let mut bad = form("normal");
    bad.jql = "project = PORT AND ORDER BY Rank".to_string();

    let response = server.post("/analyze").form(&bad).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let html = response.text();
    assert!(html.contains("Invalid JQL query"));
    assert!(!html.contains("secret-token"));
}

#[tokio::test]
async fn test_remote_auth_failure_is_actionable() {
    let server = create_test_server(jira().with_failure(JQL, Failure::Auth), false);

    let response = server.post("/analyze").form(&form("normal")).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("Check your access token"));
}

#[tokio::test]
async fn test_exports_after_analysis() {
    let server = create_test_server(jira(), false);
    server.post("/analyze").form(&form("normal")).await.assert_status_ok();

    let pdf = server.get("/export/pdf").await;
    pdf.assert_status_ok();
    assert!(pdf.as_bytes().starts_with(b"%PDF"));
    let disposition = pdf.header("content-disposition");
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"Initiative_Report_PI-5_"));
    assert!(disposition.ends_with(".pdf\""));

    let wide = server.get("/export/pdf-wide").await;
    wide.assert_status_ok();
    assert!(wide
        .header("content-disposition")
        .to_str()
        .unwrap()
        .contains("_A3_"));

    let html = server.get("/export/html").await;
    html.assert_status_ok();
    assert!(html.text().contains("FEATURE: FEAT-1"));

    let keys = server.get("/export/text-keys").await;
    keys.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backward_check_offers_key_export() {
    let server = create_test_server(jira(), false);

    // FEAT-1 and SF-1 only carry PI-5
    let mut backward = form("backward_check");
    backward.release = "PI-6".to_string();
    let response = server.post("/analyze").form(&backward).await;
    response.assert_status_ok();
    assert!(response.text().contains("/export/text-keys?id="));

    let keys = server.get("/export/text-keys").await;
    keys.assert_status_ok();
    let text = keys.text();
    assert!(text.contains("Combined: issuekey in (FEAT-1, SF-1)"));
    assert!(keys
        .header("content-disposition")
        .to_str()
        .unwrap()
        .contains("Backward_Check_Keys_PI-6_"));
}

#[tokio::test]
async fn test_cached_result_served_for_same_query_and_mode() {
    let source = jira();
    let jira_log = source.clone();
    let server = create_test_server(source, false);

    server.post("/analyze").form(&form("normal")).await.assert_status_ok();
    let requests_after_first = jira_log.requests().len();

    let mut cached = form("normal");
    cached.use_cache = Some("on".to_string());
    let response = server.post("/analyze").form(&cached).await;
    response.assert_status_ok();
    assert!(response.text().contains("Loaded from cache"));
    assert_eq!(jira_log.requests().len(), requests_after_first, "no Jira traffic");

    // Same query in the other mode must not reuse the entry
    let mut other_mode = form("backward_check");
    other_mode.use_cache = Some("on".to_string());
    let response = server.post("/analyze").form(&other_mode).await;
    response.assert_status_ok();
    assert!(!response.text().contains("Loaded from cache"));
    assert!(jira_log.requests().len() > requests_after_first);
}

#[tokio::test]
async fn test_always_cached_flag_uses_cache_without_checkbox() {
    let source = jira();
    let jira_log = source.clone();
    let server = create_test_server(source, true);

    server.post("/analyze").form(&form("normal")).await.assert_status_ok();
    let before = jira_log.requests().len();
    let response = server.post("/analyze").form(&form("normal")).await;
    assert!(response.text().contains("Loaded from cache"));
    assert_eq!(jira_log.requests().len(), before);
}

#[tokio::test]
async fn test_export_by_unknown_id_is_not_found() {
    let server = create_test_server(jira(), false);
    server.post("/analyze").form(&form("normal")).await.assert_status_ok();

    let response = server
        .get("/export/pdf")
        .add_query_param("id", "00000000-0000-4000-8000-000000000000")
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_disk_cache_backend() {
    let temp = TempDir::new().unwrap();
    let store = DiskCacheStore::open(temp.path()).unwrap();
    let context = AppContext::new(
        ViewerConfig::default(),
        Arc::new(jira()),
        ResultCache::new(store, Duration::hours(1)),
    )
    .unwrap();
    let server = TestServer::new(create_routes(Arc::new(context))).unwrap();

    server.post("/analyze").form(&form("normal")).await.assert_status_ok();
    let response = server.get("/api/analysis").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["query"], JQL);
    assert_eq!(json["statistics"]["epics"], 1);
}
