// Tests for the investigation pipeline against a mocked API

use aegis_client::ApiClient;
use aegis_core::investigate::{InvestigationEvent, InvestigationOptions, InvestigationSession};
use aegis_core::model::{NodeStatus, NodeType};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn analysis_body(kind: &str, extra: Value) -> Value {
    let mut body = json!({
        "success": true,
        "symbol": "AAPL",
        "analysis_type": kind,
        "raw_analysis": format!("AAPL {} findings", kind),
        "confidence_score": 8.1,
    });
    if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        obj.extend(extra.clone());
    }
    body
}

async fn mount(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_happy_path(server: &MockServer, skip: &[&str]) {
    let routes: Vec<(&str, Value)> = vec![
        (
            "/api/validate-stock",
            json!({ "symbol": "AAPL", "valid": true, "current_price": 123.456, "change_percent": 1.5 }),
        ),
        (
            "/api/investigate",
            json!({
                "investigation_id": "8f2c8e0e-4f7b-4c36-9d8e-3a3f0b4c1e11",
                "symbol": "AAPL",
                "status": "started",
                "message": "Investigation started for AAPL",
                "timestamp": "2024-05-01T12:00:00Z"
            }),
        ),
        (
            "/api/claude-news-analysis",
            analysis_body("news_sentiment", json!({ "sentiment": "positive" })),
        ),
        (
            "/api/claude-earnings-analysis",
            analysis_body("earnings_impact", json!({ "scenario_type": "beat" })),
        ),
        (
            "/api/claude-market-analysis",
            analysis_body("market_context", json!({ "market_scenario": "bullish" })),
        ),
        (
            "/api/claude-master-inference",
            json!({
                "success": true,
                "recommendation": "Strong buy signal - momentum likely to continue",
                "confidence_score": 10.0
            }),
        ),
    ];

    for (route, body) in routes {
        if skip.contains(&route) {
            continue;
        }
        mount(server, route, ResponseTemplate::new(200).set_body_json(body)).await;
    }
}

fn session_for(server: &MockServer) -> InvestigationSession {
    InvestigationSession::new(ApiClient::new(&server.uri()).unwrap())
}

fn ids(outcome: &aegis_core::InvestigationOutcome) -> Vec<String> {
    outcome.nodes.iter().map(|n| n.id.clone()).collect()
}

// ============================================================================
// Happy Path Tests
// ============================================================================

#[tokio::test]
async fn test_full_run_produces_nine_nodes_in_order() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &[]).await;

    let mut session = session_for(&server);
    let outcome = session.run(InvestigationOptions::new("aapl").fast()).await;

    assert_eq!(
        ids(&outcome),
        vec![
            "validation",
            "investigation-start",
            "spawn-news_sentiment",
            "analysis-news_sentiment",
            "spawn-earnings_impact",
            "analysis-earnings_impact",
            "spawn-market_context",
            "analysis-market_context",
            "master-inference",
        ]
    );
    assert_eq!(outcome.nodes.completed_count(), 9);
    assert!(!outcome.timed_out);
    assert!(!session.is_loading());

    let validation = outcome.nodes.get("validation").unwrap();
    assert_eq!(validation.node_type, NodeType::Validation);
    assert!(validation.description.contains("$123.46"));

    let investigation = outcome.investigation.as_ref().unwrap();
    assert_eq!(investigation.symbol, "AAPL");

    let verdict = outcome.inference().unwrap();
    assert_eq!(verdict["confidence_score"], 10.0);
    let inference = outcome.nodes.get("master-inference").unwrap();
    assert_eq!(inference.node_type, NodeType::Inference);
    assert!(inference.description.contains("Strong buy"));
}

#[tokio::test]
async fn test_master_inference_receives_findings_and_context() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &[]).await;

    let mut session = session_for(&server);
    session.run(InvestigationOptions::new("AAPL").fast()).await;

    let requests = server.received_requests().await.unwrap();
    let inference = requests
        .iter()
        .find(|r| r.url.path() == "/api/claude-master-inference")
        .unwrap();
    let body: Value = serde_json::from_slice(&inference.body).unwrap();

    assert_eq!(body["symbol"], "AAPL");
    assert_eq!(body["allFindings"].as_array().unwrap().len(), 3);
    assert_eq!(body["priceData"]["price_change_percent"], 1.5);
    assert_eq!(body["investigationData"]["news_sentiment"]["sentiment"], "positive");
    assert_eq!(body["investigationData"]["earnings_impact"]["scenario_type"], "beat");
}

#[tokio::test]
async fn test_date_range_forwarded() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &[]).await;

    let range = aegis_core::model::DateRange {
        start_date: "2024-02-01".to_string(),
        end_date: "2024-02-29".to_string(),
    };
    let mut session = session_for(&server);
    session
        .run(InvestigationOptions::new("AAPL").fast().with_date_range(range))
        .await;

    let requests = server.received_requests().await.unwrap();
    let investigate = requests
        .iter()
        .find(|r| r.url.path() == "/api/investigate")
        .unwrap();
    let body: Value = serde_json::from_slice(&investigate.body).unwrap();
    assert_eq!(body["date_range"]["start_date"], "2024-02-01");
}

// ============================================================================
// Failure Policy Tests
// ============================================================================

#[tokio::test]
async fn test_validation_failure_stops_run() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/api/validate-stock",
        ResponseTemplate::new(400).set_body_json(json!({ "error": "Symbol is required" })),
    )
    .await;

    let mut session = session_for(&server);
    let outcome = session.run(InvestigationOptions::new("AAPL").fast()).await;

    assert_eq!(ids(&outcome), vec!["error"]);
    let node = outcome.nodes.get("error").unwrap();
    assert_eq!(node.status, NodeStatus::Error);
    assert!(node.description.contains("Symbol is required"));
    assert!(!session.is_loading());
    assert!(outcome.investigation.is_none());
}

#[tokio::test]
async fn test_investigate_failure_keeps_validation_node() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &["/api/investigate"]).await;
    mount(&server, "/api/investigate", ResponseTemplate::new(500)).await;

    let mut session = session_for(&server);
    let outcome = session.run(InvestigationOptions::new("AAPL").fast()).await;

    assert_eq!(ids(&outcome), vec!["validation", "error"]);
}

#[tokio::test]
async fn test_analysis_failure_continues_with_next_type() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &["/api/claude-earnings-analysis"]).await;
    mount(
        &server,
        "/api/claude-earnings-analysis",
        ResponseTemplate::new(500)
            .set_body_json(json!({ "success": false, "error": "Earnings analysis failed" })),
    )
    .await;

    let mut session = session_for(&server);
    let outcome = session.run(InvestigationOptions::new("AAPL").fast()).await;

    assert_eq!(
        ids(&outcome),
        vec![
            "validation",
            "investigation-start",
            "spawn-news_sentiment",
            "analysis-news_sentiment",
            "spawn-earnings_impact",
            "error-earnings_impact",
            "spawn-market_context",
            "analysis-market_context",
            "master-inference",
        ]
    );
    assert_eq!(
        outcome.nodes.get("spawn-earnings_impact").unwrap().status,
        NodeStatus::Error
    );
    assert_eq!(outcome.nodes.error_count(), 2);
}

#[tokio::test]
async fn test_master_inference_failure() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &["/api/claude-master-inference"]).await;
    mount(
        &server,
        "/api/claude-master-inference",
        ResponseTemplate::new(400)
            .set_body_json(json!({ "error": "Symbol and findings are required" })),
    )
    .await;

    let mut session = session_for(&server);
    let outcome = session.run(InvestigationOptions::new("AAPL").fast()).await;

    assert_eq!(outcome.nodes.len(), 9);
    let last = outcome.nodes.iter().last().unwrap();
    assert_eq!(last.id, "error-master-inference");
    assert!(outcome.inference().is_none());
}

#[tokio::test]
async fn test_deadline_appends_timeout_node() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &["/api/claude-news-analysis"]).await;
    mount(
        &server,
        "/api/claude-news-analysis",
        ResponseTemplate::new(200)
            .set_body_json(analysis_body("news_sentiment", json!({})))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let mut session = session_for(&server);
    let outcome = session
        .run(
            InvestigationOptions::new("AAPL")
                .fast()
                .with_deadline(Duration::from_millis(500)),
        )
        .await;

    assert!(outcome.timed_out);
    assert!(!session.is_loading());
    assert_eq!(
        ids(&outcome),
        vec![
            "validation",
            "investigation-start",
            "spawn-news_sentiment",
            "timeout"
        ]
    );
    // The step cancelled in flight is closed out as an error
    let cancelled = outcome.nodes.get("spawn-news_sentiment").unwrap();
    assert_eq!(cancelled.status, NodeStatus::Error);
    assert!(cancelled.completed_at.is_some());
    assert!(
        outcome
            .nodes
            .iter()
            .all(|n| n.status != NodeStatus::InProgress)
    );
}

// ============================================================================
// Observation and Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_events_mirror_nodes() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &[]).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session = session_for(&server).with_event_sender(tx);
    session.run(InvestigationOptions::new("AAPL").fast()).await;

    let mut added = 0;
    let mut updated = 0;
    let mut complete = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            InvestigationEvent::NodeAdded(_) => added += 1,
            InvestigationEvent::NodeUpdated { status, .. } => {
                assert_eq!(status, NodeStatus::Completed);
                updated += 1;
            }
            InvestigationEvent::Complete {
                completed,
                errors,
                timed_out,
            } => complete = Some((completed, errors, timed_out)),
            InvestigationEvent::Log(_) => {}
        }
    }

    assert_eq!(added, 9);
    assert_eq!(updated, 3);
    assert_eq!(complete, Some((9, 0, false)));
}

#[tokio::test]
async fn test_progress_callback_receives_lines() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &[]).await;

    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let mut session = session_for(&server).with_progress_callback(Arc::new(move |line: String| {
        sink.lock().unwrap().push(line);
    }));
    session.run(InvestigationOptions::new("AAPL").fast()).await;

    let lines = lines.lock().unwrap();
    assert!(lines.iter().any(|l| l.contains("Validating AAPL")));
    assert!(lines.last().unwrap().starts_with("Investigation finished"));
}

#[tokio::test]
async fn test_background_start_and_wait() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &[]).await;

    let mut session = session_for(&server);
    session.start(InvestigationOptions::new("AAPL").fast());
    assert!(session.is_loading());

    let outcome = session.wait().await;
    assert_eq!(outcome.nodes.len(), 9);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_reset_aborts_running_pipeline() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &[]).await;

    let mut session = session_for(&server);
    // Default delays keep the run busy long enough to abort it
    session.start(InvestigationOptions::new("AAPL"));
    tokio::time::sleep(Duration::from_millis(300)).await;

    session.reset().await;
    assert!(!session.is_loading());
    assert!(session.nodes().await.is_empty());
    assert!(session.investigation().await.is_none());

    // Nothing keeps appending after the reset
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(session.nodes().await.is_empty());
}

#[tokio::test]
async fn test_rerun_starts_from_empty_list() {
    let server = MockServer::start().await;
    mount_happy_path(&server, &[]).await;

    let mut session = session_for(&server);
    session.run(InvestigationOptions::new("AAPL").fast()).await;
    let outcome = session.run(InvestigationOptions::new("AAPL").fast()).await;
    assert_eq!(outcome.nodes.len(), 9);
}
