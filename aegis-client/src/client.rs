use crate::error::{ClientError, Result};
use crate::result::ApiResponse;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Typed client for the investigation routes.
///
/// Every call returns the decoded JSON body. Non-2xx responses become
/// [`ClientError::Status`] carrying the server's `error` string.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("aegis/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", joined, e)))?;
        Ok(joined)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let url = self.endpoint(path)?;
        debug!("{} {}", method, url);

        let start = Instant::now();
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let response_time = start.elapsed();

        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) if status.is_success() => return Err(e.into()),
                Err(_) => Value::String(text),
            }
        };

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| body.as_str().map(str::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            warn!("{} returned {}: {}", url, status.as_u16(), message);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(ApiResponse::new(url, status.as_u16(), body, response_time))
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, path, Some(&body)).await
    }

    pub async fn get_json(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::GET, path, None).await
    }

    pub async fn health(&self) -> Result<ApiResponse> {
        self.get_json("/api/health").await
    }

    pub async fn validate_stock(&self, symbol: &str) -> Result<ApiResponse> {
        self.post_json("/api/validate-stock", &json!({ "symbol": symbol }))
            .await
    }

    pub async fn investigate(&self, symbol: &str, start_date: &str, end_date: &str) -> Result<ApiResponse> {
        let body = json!({
            "symbol": symbol,
            "date_range": { "start_date": start_date, "end_date": end_date },
        });
        self.post_json("/api/investigate", &body).await
    }

    /// POST an analysis route with an arbitrary body
    pub async fn analyze(&self, route: &str, body: &Value) -> Result<ApiResponse> {
        self.post_json(route, body).await
    }

    pub async fn master_inference(&self, body: &Value) -> Result<ApiResponse> {
        self.post_json("/api/claude-master-inference", body).await
    }
}
