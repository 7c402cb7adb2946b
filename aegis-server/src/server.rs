//! Router assembly and listener lifecycle.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use aegis_client::ApiClient;
use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ApiError, ServerError};
use crate::handlers;
use crate::health::{self, HealthResponse};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Client for the optional narrative backend.
    pub backend: Option<ApiClient>,
    /// When the server started.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let backend = match config.backend_url.as_deref() {
            Some(url) => {
                info!(backend = %url, "Proxying analysis narratives");
                Some(ApiClient::with_timeout(url, 20)?)
            }
            None => None,
        };

        Ok(Self {
            config: Arc::new(config),
            backend,
            start_time: Instant::now(),
        })
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api", get(handlers::root_info).post(handlers::root_methods))
        .route("/api/health", get(health_handler))
        .route("/api/validate-stock", post(handlers::validate_stock))
        .route("/api/investigate", post(handlers::investigate))
        .route(
            "/api/claude-news-analysis",
            post(handlers::news_analysis).get(handlers::news_analysis_info),
        )
        .route(
            "/api/claude-earnings-analysis",
            post(handlers::earnings_analysis).get(handlers::earnings_analysis_info),
        )
        .route(
            "/api/claude-market-analysis",
            post(handlers::market_analysis).get(handlers::market_analysis_info),
        )
        .route(
            "/api/claude-master-inference",
            post(handlers::master_inference).get(handlers::master_inference_info),
        )
        .route(
            "/api/claude-sub-investigation",
            post(handlers::sub_investigation).get(handlers::sub_investigation_info),
        )
        .route(
            "/api/langchain-test",
            post(handlers::langchain_test).get(handlers::langchain_test_info),
        )
        .route("/api/langchain-demo/{symbol}", post(handlers::langchain_demo))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// GET /api/health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown error".to_string()
    };
    tracing::error!("Handler panicked: {}", details);
    ApiError::internal("Internal server error", details).into_response()
}

/// Handle returned by [`start`]. Dropping it leaves the server running;
/// call [`ServerHandle::shutdown`] to stop it.
pub struct ServerHandle {
    pub addr: SocketAddr,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URL for clients, e.g. `http://127.0.0.1:3000`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn shutdown(self) {
        self.server.abort();
    }
}

/// Bind and serve in a background task.
pub async fn start(config: ServerConfig) -> Result<ServerHandle, ServerError> {
    let addr = config.bind_addr();
    let router = build_router(AppState::new(config)?);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    info!(port = local_addr.port(), "AEGIS server started");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Server stopped: {}", e);
        }
    });

    Ok(ServerHandle {
        addr: local_addr,
        server,
    })
}

/// Bind and serve until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.bind_addr();
    let router = build_router(AppState::new(config)?);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %listener.local_addr()?, "AEGIS server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
