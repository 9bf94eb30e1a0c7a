//! Manual reconciliation trigger

use axum::{extract::State, response::Response};

use crate::errors::{AppError, AppResult};
use crate::sync::SyncTrigger;
use crate::web::responses::ok;
use crate::web::{AdminUser, AppState};

/// Run one pass now; 409 while another pass is running
pub async fn trigger_sync(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Response> {
    tracing::info!("Manual traffic sync requested by '{}'", admin.username);
    let report = state.sync.trigger(SyncTrigger::Manual).await?;
    Ok(ok(report))
}

pub async fn last_report(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> AppResult<Response> {
    let report = state
        .sync
        .last_report()
        .await
        .ok_or_else(|| AppError::not_found("sync report", "last"))?;
    Ok(ok(report))
}
