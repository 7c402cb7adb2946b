pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod server;

pub use config::{LatencyProfile, LatencyRange, ServerConfig};
pub use error::{AnalysisError, ApiError, ServerError};
pub use server::{AppState, ServerHandle, build_router, run, start};
