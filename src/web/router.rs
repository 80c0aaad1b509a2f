//! Router and middleware for the status endpoint.

use crate::monitor::{MonitorHandle, MonitorStatus};
use crate::share::{GlucoseReading, Units};
use crate::web::config::WebConfig;
use crate::web::handlers;
use axum::{routing::get, Router};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared handler state: read-only views onto the monitor.
#[derive(Debug, Clone)]
pub struct AppState {
    pub status: watch::Receiver<MonitorStatus>,
    pub readings: watch::Receiver<Vec<GlucoseReading>>,
    pub units: Units,
}

impl AppState {
    pub fn new(handle: MonitorHandle, units: Units) -> Self {
        Self {
            status: handle.status,
            readings: handle.readings,
            units,
        }
    }
}

/// Create the axum application with all routes and middleware.
pub fn create_app(config: &WebConfig, handle: MonitorHandle) -> Router {
    let state = AppState::new(handle, config.units);

    let mut app = Router::new()
        .route("/", get(handlers::get_summary))
        .route("/api/status", get(handlers::get_status))
        .route("/api/readings", get(handlers::get_readings))
        .route("/api/health", get(handlers::health_check))
        .with_state(state);

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
