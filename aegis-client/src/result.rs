use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A decoded JSON response from one route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub url: String,
    pub status_code: u16,
    pub body: Value,
    pub response_time: Duration,
}

impl ApiResponse {
    pub fn new(url: String, status_code: u16, body: Value, response_time: Duration) -> Self {
        Self {
            url,
            status_code,
            body,
            response_time,
        }
    }

    /// Decode the body into a typed payload
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// String field of the body, if present
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }
}
