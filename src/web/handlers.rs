//! HTTP handlers for the status endpoint.

use crate::monitor::MonitorStatus;
use crate::share::GlucoseReading;
use crate::web::router::AppState;
use axum::extract::{Query, State};
use axum::response::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

/// Latest published monitor status.
pub async fn get_status(State(state): State<AppState>) -> Json<MonitorStatus> {
    Json(state.status.borrow().clone())
}

#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    /// Maximum number of readings to return, newest first
    pub limit: Option<usize>,
}

/// Readings from the last successful poll.
pub async fn get_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingsQuery>,
) -> Json<Vec<GlucoseReading>> {
    let readings = state.readings.borrow();
    let limit = query.limit.unwrap_or(readings.len()).min(readings.len());
    Json(readings[..limit].to_vec())
}

/// One-line plain-text summary, handy for status bars.
pub async fn get_summary(State(state): State<AppState>) -> String {
    state.status.borrow().summary(state.units)
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let monitor_state = state.status.borrow().state;
    Json(json!({
        "status": "ok",
        "service": "glucowatch",
        "version": env!("CARGO_PKG_VERSION"),
        "monitor": monitor_state,
        "timestamp": Utc::now().to_rfc3339()
    }))
}
