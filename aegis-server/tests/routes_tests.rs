// Route tests for the mock analysis server

use aegis_client::ApiClient;
use aegis_core::investigate::{InvestigationOptions, InvestigationSession};
use aegis_core::model::NodeStatus;
use aegis_server::{AppState, ServerConfig, build_router, start};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app() -> Router {
    build_router(AppState::new(ServerConfig::ephemeral()).unwrap())
}

fn app_with_backend(url: &str) -> Router {
    let config = ServerConfig {
        backend_url: Some(url.to_string()),
        ..ServerConfig::ephemeral()
    };
    build_router(AppState::new(config).unwrap())
}

async fn send(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
    send(app(), "POST", uri, &body.to_string()).await
}

// ============================================================================
// Root and health
// ============================================================================

#[tokio::test]
async fn test_root_info() {
    let (status, body) = send(app(), "GET", "/api", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["langchain_enabled"], true);
}

#[tokio::test]
async fn test_root_post_lists_endpoints() {
    let (status, body) = send(app(), "POST", "/api", "").await;
    assert_eq!(status, StatusCode::OK);
    let endpoints = body["endpoints"].as_array().unwrap();
    assert!(endpoints.contains(&json!("/api/claude-master-inference")));
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app(), "GET", "/api/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ============================================================================
// Validation and investigation
// ============================================================================

#[tokio::test]
async fn test_validate_stock_uppercases() {
    let (status, body) = post("/api/validate-stock", json!({ "symbol": "aapl" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "AAPL");
    assert_eq!(body["valid"], true);
    assert_eq!(body["company_name"], "AAPL Corporation");

    let price = body["current_price"].as_f64().unwrap();
    assert!((50.0..250.0).contains(&price));
    assert_eq!(body["change"], body["change_percent"]);
    let volume = body["volume"].as_u64().unwrap();
    assert!((1_000_000..11_000_000).contains(&volume));
}

#[tokio::test]
async fn test_missing_symbol_is_400() {
    for route in [
        "/api/validate-stock",
        "/api/investigate",
        "/api/claude-news-analysis",
        "/api/claude-earnings-analysis",
        "/api/claude-market-analysis",
    ] {
        let (status, body) = post(route, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", route);
        assert_eq!(body["error"], "Symbol is required", "{}", route);
    }
}

#[tokio::test]
async fn test_empty_symbol_is_400() {
    let (status, _) = post("/api/validate-stock", json!({ "symbol": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post("/api/validate-stock", json!({ "symbol": 7 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (status, body) = send(app(), "POST", "/api/investigate", "{\"symbol\":").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON body");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_analysis_errors_carry_success_flag() {
    let (status, body) = post("/api/claude-news-analysis", json!({ "symbol": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_investigate_defaults_date_range() {
    let (status, body) = post("/api/investigate", json!({ "symbol": "tsla" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "TSLA");
    assert_eq!(body["status"], "started");
    assert_eq!(body["investigation_id"].as_str().unwrap().len(), 36);
    assert_eq!(body["date_range"]["start_date"], "2024-01-01");
    assert_eq!(body["date_range"]["end_date"], "2024-12-31");
}

#[tokio::test]
async fn test_investigate_echoes_date_range() {
    let (_, body) = post(
        "/api/investigate",
        json!({
            "symbol": "MSFT",
            "date_range": { "start_date": "2024-03-01", "end_date": "2024-06-30" }
        }),
    )
    .await;
    assert_eq!(body["date_range"]["start_date"], "2024-03-01");
    assert_eq!(body["date_range"]["end_date"], "2024-06-30");
}

#[tokio::test]
async fn test_investigation_ids_are_unique() {
    let (_, a) = post("/api/investigate", json!({ "symbol": "AAPL" })).await;
    let (_, b) = post("/api/investigate", json!({ "symbol": "AAPL" })).await;
    assert_ne!(a["investigation_id"], b["investigation_id"]);
}

// ============================================================================
// Analysts
// ============================================================================

#[tokio::test]
async fn test_news_analysis_shape() {
    let (status, body) = post("/api/claude-news-analysis", json!({ "symbol": "AAPL" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["analysis_type"], "news_sentiment");
    assert_eq!(body["headlines"].as_array().unwrap().len(), 5);

    let sentiment = body["sentiment"].as_str().unwrap();
    assert!(["positive", "negative", "mixed"].contains(&sentiment));
    let confidence = body["confidence_score"].as_f64().unwrap();
    assert!((6.0..=9.5).contains(&confidence));
}

#[tokio::test]
async fn test_earnings_uses_supplied_data() {
    let (status, body) = post(
        "/api/claude-earnings-analysis",
        json!({
            "symbol": "NVDA",
            "earningsData": {
                "last_quarter_eps": 1.80,
                "expected_eps": 2.00,
                "revenue_growth": -2.0,
                "beat_estimate": false,
                "guidance_updated": false
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scenario_type"], "miss");
    assert_eq!(body["eps_actual"], 1.80);
    assert_eq!(body["beat_estimate"], false);
}

#[tokio::test]
async fn test_earnings_partial_data_without_beat_flag() {
    let (status, body) = post(
        "/api/claude-earnings-analysis",
        json!({
            "symbol": "AAPL",
            "earningsData": { "last_quarter_eps": 1.0, "expected_eps": 2.0 }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scenario_type"], "miss");
    assert_eq!(body["beat_estimate"], false);
    assert!(!body["raw_analysis"].as_str().unwrap().contains("exceeded"));
}

#[tokio::test]
async fn test_earnings_ignores_malformed_data() {
    let (status, body) = post(
        "/api/claude-earnings-analysis",
        json!({ "symbol": "NVDA", "earningsData": "oops" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let scenario = body["scenario_type"].as_str().unwrap();
    assert!(["beat", "miss", "meet"].contains(&scenario));
}

#[tokio::test]
async fn test_market_analysis_shape() {
    let (status, body) = post("/api/claude-market-analysis", json!({ "symbol": "AMD" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis_type"], "market_context");
    assert_eq!(body["data_sources"], 15);
    let scenario = body["market_scenario"].as_str().unwrap();
    assert!(["bullish", "bearish", "neutral"].contains(&scenario));
}

#[tokio::test]
async fn test_sub_investigation_dispatch() {
    let (status, body) = post(
        "/api/claude-sub-investigation",
        json!({ "symbol": "AAPL", "triggerFinding": "New partnership announced" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["investigation_type"], "Strategic Corporate Actions Analysis");
    assert_eq!(body["trigger_reason"], "New partnership announced");
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_sub_investigation_requires_trigger() {
    let (status, body) = post("/api/claude-sub-investigation", json!({ "symbol": "AAPL" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Symbol and trigger finding are required");
}

#[tokio::test]
async fn test_master_inference_uses_context() {
    let (status, body) = post(
        "/api/claude-master-inference",
        json!({
            "symbol": "AAPL",
            "allFindings": ["news", "earnings", "market"],
            "priceData": { "price_change_percent": 2.5 },
            "investigationData": {
                "earnings_impact": { "scenario_type": "beat" }
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confidence_score"], 10.0);
    assert_eq!(body["price_movement"]["direction"], "UP");
    assert_eq!(body["price_movement"]["percentage"], "2.50");
    assert_eq!(body["investigation_summary"]["findings_analyzed"], 3);
    assert_eq!(body["investigation_summary"]["dominant_factor"], "earnings");
}

#[tokio::test]
async fn test_master_inference_requires_findings() {
    let (status, body) = post("/api/claude-master-inference", json!({ "symbol": "AAPL" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Symbol and findings are required");
    assert_eq!(body["success"], false);
}

// ============================================================================
// Backend proxy
// ============================================================================

#[tokio::test]
async fn test_news_uses_backend_narrative() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/claude/analyze-news"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "news_analysis": "From the backend" })),
        )
        .expect(1)
        .mount(&backend)
        .await;

    let (status, body) = send(
        app_with_backend(&backend.uri()),
        "POST",
        "/api/claude-news-analysis",
        r#"{"symbol":"AAPL"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["raw_analysis"], "From the backend");
}

#[tokio::test]
async fn test_backend_failure_falls_back_to_template() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/claude/analyze-market"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "down" })))
        .mount(&backend)
        .await;

    let (status, body) = send(
        app_with_backend(&backend.uri()),
        "POST",
        "/api/claude-market-analysis",
        r#"{"symbol":"AAPL"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let text = body["raw_analysis"].as_str().unwrap();
    assert!(!text.is_empty());
    assert_ne!(text, "down");
}

#[tokio::test]
async fn test_backend_response_missing_field_falls_back() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/claude/analyze-earnings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "summary": "wrong field" })),
        )
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/claude/analyze-market"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "market_analysis": 42 })))
        .expect(1)
        .mount(&backend)
        .await;

    let app = app_with_backend(&backend.uri());
    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/claude-earnings-analysis",
        r#"{"symbol":"AAPL"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let text = body["raw_analysis"].as_str().unwrap();
    assert_ne!(text, "wrong field");
    assert!(text.contains("AAPL"));

    let (status, body) = send(
        app,
        "POST",
        "/api/claude-market-analysis",
        r#"{"symbol":"AAPL"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["raw_analysis"].as_str().unwrap().contains("AAPL"));
}

#[tokio::test]
async fn test_unreachable_backend_falls_back() {
    // Nothing listens on port 1
    let app = app_with_backend("http://127.0.0.1:1");

    for (uri, kind) in [
        ("/api/claude-news-analysis", "news_sentiment"),
        ("/api/claude-earnings-analysis", "earnings_impact"),
        ("/api/claude-market-analysis", "market_context"),
    ] {
        let (status, body) = send(app.clone(), "POST", uri, r#"{"symbol":"AAPL"}"#).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["success"], true);
        assert_eq!(body["analysis_type"], kind);
        assert!(body["raw_analysis"].as_str().unwrap().contains("AAPL"));
    }
}

// ============================================================================
// Descriptors and search-pipeline demos
// ============================================================================

#[tokio::test]
async fn test_get_descriptors() {
    for route in [
        "/api/claude-news-analysis",
        "/api/claude-earnings-analysis",
        "/api/claude-market-analysis",
        "/api/claude-master-inference",
        "/api/claude-sub-investigation",
        "/api/langchain-test",
    ] {
        let (status, body) = send(app(), "GET", route, "").await;
        assert_eq!(status, StatusCode::OK, "{}", route);
        assert_eq!(body["method"], "POST", "{}", route);
        assert!(body["expected_body"]["symbol"].is_string(), "{}", route);
    }
}

#[tokio::test]
async fn test_langchain_test_defaults_symbol() {
    let (status, body) = send(app(), "POST", "/api/langchain-test", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "TEST");
    assert_eq!(body["langchain_analysis"]["earnings_impact"]["data_sources"], 8);
}

#[tokio::test]
async fn test_langchain_demo_path_symbol() {
    let (status, body) = send(app(), "POST", "/api/langchain-demo/msft", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "MSFT");
    assert_eq!(body["langchain_analysis"]["news_sentiment"]["confidence_score"], 7.5);
}

// ============================================================================
// Orchestrator against a live server
// ============================================================================

#[tokio::test]
async fn test_full_investigation_against_server() {
    let handle = start(ServerConfig::ephemeral()).await.unwrap();
    let client = ApiClient::new(&handle.url()).unwrap();

    let mut session = InvestigationSession::new(client);
    let outcome = session.run(InvestigationOptions::new("aapl").fast()).await;

    assert!(!outcome.timed_out);
    assert_eq!(outcome.nodes.len(), 9);
    assert_eq!(outcome.nodes.error_count(), 0);
    assert!(
        outcome
            .nodes
            .iter()
            .all(|n| n.status == NodeStatus::Completed)
    );

    let inference = outcome.inference().unwrap();
    assert_eq!(inference["symbol"], "AAPL");
    assert_eq!(inference["investigation_summary"]["findings_analyzed"], 3);
    assert_eq!(outcome.investigation.unwrap().symbol, "AAPL");

    handle.shutdown();
}
