//! Server configuration.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inclusive-exclusive range of simulated work time, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    pub const ZERO: LatencyRange = LatencyRange::new(0, 0);

    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draw a delay. Degenerate ranges return `min_ms`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_ms <= self.min_ms {
            Duration::from_millis(self.min_ms)
        } else {
            Duration::from_millis(rng.random_range(self.min_ms..self.max_ms))
        }
    }
}

/// Simulated per-route work time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyProfile {
    /// News, earnings and market analysts.
    pub analysis: LatencyRange,
    pub sub_investigation: LatencyRange,
    pub inference: LatencyRange,
}

impl LatencyProfile {
    /// No artificial delay anywhere
    pub fn none() -> Self {
        Self {
            analysis: LatencyRange::ZERO,
            sub_investigation: LatencyRange::ZERO,
            inference: LatencyRange::ZERO,
        }
    }
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            analysis: LatencyRange::new(2_000, 4_000),
            sub_investigation: LatencyRange::new(3_000, 5_000),
            inference: LatencyRange::new(3_000, 5_000),
        }
    }
}

/// Configuration for the mock analysis server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `3000`, `0` for auto-assign).
    pub port: u16,
    /// Optional analysis backend to proxy narrative generation to.
    pub backend_url: Option<String>,
    pub latency: LatencyProfile,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            backend_url: None,
            latency: LatencyProfile::default(),
        }
    }
}

impl ServerConfig {
    /// Ephemeral port, no latency. Used for in-process servers.
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            latency: LatencyProfile::none(),
            ..Self::default()
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
