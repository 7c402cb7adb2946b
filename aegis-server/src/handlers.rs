//! Route handlers.
//!
//! Bodies are taken as raw bytes and parsed here so malformed JSON gets the
//! same `{ "error": ... }` envelope as every other failure.

use crate::config::LatencyRange;
use crate::error::{AnalysisError, ApiError};
use crate::server::AppState;
use aegis_core::analysis::{
    self, EarningsAnalysis, EarningsData, MarketAnalysis, NewsAnalysis, StockValidation,
    SubInvestigation,
};
use aegis_core::inference::{self, InvestigationContext, MasterInference, PriceData};
use aegis_core::langchain;
use aegis_core::model::{DateRange, InvestigationData};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use chrono::Utc;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

type Body = Map<String, Value>;

/// Parse a request body into a JSON object. An empty body counts as `{}`.
pub fn parse_body(bytes: &[u8]) -> Result<Body, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::InvalidJson("expected a JSON object".to_string())),
        Err(e) => Err(ApiError::InvalidJson(e.to_string())),
    }
}

fn non_empty_str<'a>(body: &'a Body, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The trimmed `symbol` field; missing, empty or non-string is a 400
pub fn require_symbol(body: &Body) -> Result<String, ApiError> {
    non_empty_str(body, "symbol")
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Symbol is required"))
}

/// Decode an optional context field, ignoring values of the wrong shape
fn optional_field<T: DeserializeOwned>(body: &Body, key: &str) -> Option<T> {
    let value = body.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!("Ignoring malformed {}: {}", key, e);
            None
        }
    }
}

async fn simulate_work(range: LatencyRange) {
    let delay = range.sample(&mut rand::rng());
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Ask the configured backend for a narrative. Any failure yields `None`.
async fn proxy_narrative(state: &AppState, kind: &str, field: &str, body: &Value) -> Option<String> {
    let backend = state.backend.as_ref()?;
    let route = format!("/api/claude/analyze-{}", kind);

    match backend.post_json(&route, body).await {
        Ok(resp) => match resp.str_field(field) {
            Some(text) => {
                debug!("Using backend {} narrative", kind);
                Some(text.to_string())
            }
            None => {
                warn!("Backend {} response missing '{}', using local template", kind, field);
                None
            }
        },
        Err(e) => {
            warn!("Backend {} analysis unavailable, using local template: {}", kind, e);
            None
        }
    }
}

fn random_price_change() -> f64 {
    rand::rng().random_range(-3.0..3.0)
}

// ============================================================================
// Root
// ============================================================================

pub async fn root_info() -> Json<Value> {
    Json(json!({
        "message": "AEGIS Stock Investigation API",
        "status": "healthy",
        "timestamp": Utc::now(),
        "langchain_enabled": true
    }))
}

pub async fn root_methods() -> Json<Value> {
    Json(json!({
        "message": "AEGIS API is running",
        "methods": ["GET", "POST"],
        "endpoints": [
            "/api/health",
            "/api/validate-stock",
            "/api/investigate",
            "/api/claude-news-analysis",
            "/api/claude-earnings-analysis",
            "/api/claude-market-analysis",
            "/api/claude-master-inference",
            "/api/claude-sub-investigation",
            "/api/langchain-test",
            "/api/langchain-demo/{symbol}"
        ]
    }))
}

fn descriptor(message: &str, expected_body: Value) -> Json<Value> {
    Json(json!({
        "message": message,
        "method": "POST",
        "expected_body": expected_body
    }))
}

// ============================================================================
// Validation and investigation
// ============================================================================

/// POST /api/validate-stock
pub async fn validate_stock(body: Bytes) -> Result<Json<StockValidation>, ApiError> {
    let body = parse_body(&body)?;
    let symbol = require_symbol(&body)?;
    info!(symbol = %symbol, "Validating stock");

    Ok(Json(analysis::validate_stock(&mut rand::rng(), &symbol)))
}

/// POST /api/investigate
pub async fn investigate(body: Bytes) -> Result<Json<InvestigationData>, ApiError> {
    let body = parse_body(&body)?;
    let symbol = require_symbol(&body)?;
    let date_range: Option<DateRange> = optional_field(&body, "date_range");

    let data = analysis::start_investigation(&symbol, date_range);
    info!(
        symbol = %data.symbol,
        investigation_id = %data.investigation_id,
        "Investigation started"
    );
    Ok(Json(data))
}

// ============================================================================
// Analysts
// ============================================================================

/// POST /api/claude-news-analysis
pub async fn news_analysis(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<NewsAnalysis>, AnalysisError> {
    let body = parse_body(&body)?;
    let symbol = require_symbol(&body)?;
    info!(symbol = %symbol, "News analysis requested");

    let backend_body = json!({
        "symbol": symbol,
        "news_articles": body.get("newsData").cloned().unwrap_or_else(|| json!([])),
    });
    let proxied = proxy_narrative(&state, "news", "news_analysis", &backend_body).await;
    if proxied.is_none() {
        simulate_work(state.config.latency.analysis).await;
    }

    let mut result = analysis::news_analysis(&mut rand::rng(), &symbol);
    if let Some(text) = proxied {
        result.raw_analysis = text;
    }
    Ok(Json(result))
}

/// POST /api/claude-earnings-analysis
pub async fn earnings_analysis(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EarningsAnalysis>, AnalysisError> {
    let body = parse_body(&body)?;
    let symbol = require_symbol(&body)?;
    let supplied: Option<EarningsData> = optional_field(&body, "earningsData");
    info!(symbol = %symbol, supplied = supplied.is_some(), "Earnings analysis requested");

    let backend_body = json!({
        "symbol": symbol,
        "earnings_data": supplied.clone().unwrap_or_default(),
        "price_change": random_price_change(),
    });
    let proxied = proxy_narrative(&state, "earnings", "earnings_analysis", &backend_body).await;
    if proxied.is_none() {
        simulate_work(state.config.latency.analysis).await;
    }

    let mut result = analysis::earnings_analysis(&mut rand::rng(), &symbol, supplied);
    if let Some(text) = proxied {
        result.raw_analysis = text;
    }
    Ok(Json(result))
}

/// POST /api/claude-market-analysis
pub async fn market_analysis(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MarketAnalysis>, AnalysisError> {
    let body = parse_body(&body)?;
    let symbol = require_symbol(&body)?;
    info!(symbol = %symbol, "Market analysis requested");

    let backend_body = json!({
        "symbol": symbol,
        "market_data": body.get("marketData").cloned().unwrap_or_else(|| json!({})),
        "price_change": random_price_change(),
    });
    let proxied = proxy_narrative(&state, "market", "market_analysis", &backend_body).await;
    if proxied.is_none() {
        simulate_work(state.config.latency.analysis).await;
    }

    let mut result = analysis::market_analysis(&mut rand::rng(), &symbol);
    if let Some(text) = proxied {
        result.raw_analysis = text;
    }
    Ok(Json(result))
}

/// POST /api/claude-sub-investigation
pub async fn sub_investigation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SubInvestigation>, AnalysisError> {
    let body = parse_body(&body)?;
    let (Some(symbol), Some(trigger)) = (
        non_empty_str(&body, "symbol"),
        non_empty_str(&body, "triggerFinding"),
    ) else {
        return Err(ApiError::bad_request("Symbol and trigger finding are required").into());
    };
    info!(symbol = %symbol, "Sub-investigation requested");

    simulate_work(state.config.latency.sub_investigation).await;
    Ok(Json(analysis::sub_investigation(
        &mut rand::rng(),
        symbol,
        trigger,
    )))
}

/// Accepts an array of findings or a single string
fn findings_of(body: &Body) -> Option<Vec<String>> {
    match body.get("allFindings")? {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Value::String(s) if !s.trim().is_empty() => Some(vec![s.clone()]),
        _ => None,
    }
}

/// POST /api/claude-master-inference
pub async fn master_inference(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MasterInference>, AnalysisError> {
    let body = parse_body(&body)?;
    let (Some(symbol), Some(findings)) = (non_empty_str(&body, "symbol"), findings_of(&body))
    else {
        return Err(ApiError::bad_request("Symbol and findings are required").into());
    };
    let price: PriceData = optional_field(&body, "priceData").unwrap_or_default();
    let context: InvestigationContext =
        optional_field(&body, "investigationData").unwrap_or_default();
    info!(symbol = %symbol, findings = findings.len(), "Master inference requested");

    simulate_work(state.config.latency.inference).await;
    Ok(Json(inference::master_inference(
        &mut rand::rng(),
        symbol,
        &findings,
        &price,
        &context,
    )))
}

// ============================================================================
// Search pipeline demos
// ============================================================================

/// POST /api/langchain-test
pub async fn langchain_test(body: Bytes) -> Result<Json<Value>, AnalysisError> {
    let body = parse_body(&body)?;
    let symbol = non_empty_str(&body, "symbol").unwrap_or("TEST");
    Ok(Json(langchain::langchain_test(&mut rand::rng(), symbol)))
}

/// POST /api/langchain-demo/{symbol}
pub async fn langchain_demo(Path(symbol): Path<String>) -> Json<Value> {
    Json(langchain::langchain_demo(&symbol))
}

// ============================================================================
// GET descriptors
// ============================================================================

pub async fn news_analysis_info() -> Json<Value> {
    descriptor(
        "Claude news analysis endpoint",
        json!({ "symbol": "string", "newsData": "array" }),
    )
}

pub async fn earnings_analysis_info() -> Json<Value> {
    descriptor(
        "Claude earnings analysis endpoint",
        json!({ "symbol": "string", "earningsData": "object" }),
    )
}

pub async fn market_analysis_info() -> Json<Value> {
    descriptor(
        "Claude market analysis endpoint",
        json!({ "symbol": "string", "marketData": "object" }),
    )
}

pub async fn master_inference_info() -> Json<Value> {
    descriptor(
        "Claude master inference endpoint",
        json!({
            "symbol": "string",
            "allFindings": "array",
            "priceData": "object",
            "investigationData": "object"
        }),
    )
}

pub async fn sub_investigation_info() -> Json<Value> {
    descriptor(
        "Claude sub-investigation endpoint",
        json!({
            "symbol": "string",
            "triggerFinding": "string",
            "investigationType": "string",
            "parentAnalysis": "string"
        }),
    )
}

pub async fn langchain_test_info() -> Json<Value> {
    descriptor("LangChain test endpoint ready", json!({ "symbol": "string" }))
}
