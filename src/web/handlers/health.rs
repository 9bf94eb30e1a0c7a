//! Liveness endpoint

use axum::{extract::State, response::Response};
use serde::Serialize;

use crate::web::{responses::ok, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub sync_running: bool,
    pub uptime_seconds: i64,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    let database = match sqlx::query("SELECT 1").execute(&state.database.pool()).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!("Health check database probe failed: {}", e);
            "unavailable"
        }
    };

    let status = if database == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    ok(HealthResponse {
        status: status.to_string(),
        database: database.to_string(),
        sync_running: state.sync.is_running(),
        uptime_seconds: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}
