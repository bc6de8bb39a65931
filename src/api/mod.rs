//! HTTP control plane
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/monitors` - List registered monitors
//! - `POST /api/v1/monitors` - Register and start a monitor from a definition
//! - `GET /api/v1/monitors/:id` - Monitor details
//! - `POST /api/v1/monitors/:id/start` - Start a stopped monitor
//! - `POST /api/v1/monitors/:id/stop` - Stop a running monitor
//! - `DELETE /api/v1/monitors/:id` - Stop and unregister a monitor
//!
//! The response types in [`types`] are shared with the CLI client and are
//! available without the `api` feature.

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
pub use types::{ErrorResponse, HealthResponse, MonitorInfo, MonitorsResponse, RegisterResponse};

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
#[cfg(feature = "api")]
use tracing::info;

use crate::util::get_default_listen_addr;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:3838")
    pub bind_addr: SocketAddr,

    /// Optional authentication token
    pub auth_token: Option<String>,

    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: get_default_listen_addr(),
            auth_token: None,
            enable_cors: true,
        }
    }
}

/// Routes of the control plane, without CORS and auth layers
#[cfg(feature = "api")]
pub fn router(state: ApiState) -> Router {
    use routes::{health, monitors};

    Router::new()
        .route("/api/v1/health", get(health::health_check))
        .route(
            "/api/v1/monitors",
            get(monitors::list_monitors).post(monitors::register_monitor),
        )
        .route(
            "/api/v1/monitors/:id",
            get(monitors::get_monitor).delete(monitors::unregister_monitor),
        )
        .route("/api/v1/monitors/:id/start", post(monitors::start_monitor))
        .route("/api/v1/monitors/:id/stop", post(monitors::stop_monitor))
        .with_state(state)
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    info!("starting API server on {}", config.bind_addr);

    let mut app = router(state).layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    if let Some(token) = config.auth_token {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
