//! Admin server management

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};

use crate::errors::AppResult;
use crate::models::ServerCreateRequest;
use crate::web::responses::{created, ok, PaginatedResponse};
use crate::web::{AdminUser, AppState, PaginationParams};

pub async fn create_server(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(request): Json<ServerCreateRequest>,
) -> AppResult<Response> {
    let server = state.servers.create(request).await?;
    Ok(created(server))
}

pub async fn list_servers(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    pagination: PaginationParams,
) -> AppResult<Response> {
    let (servers, total) = state.servers.list(pagination.to_query()).await?;
    Ok(ok(PaginatedResponse::new(
        servers,
        total,
        pagination.page,
        pagination.limit,
    )))
}

/// Live stream listing straight from the media server
pub async fn list_server_streams(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(server_id): Path<i64>,
) -> AppResult<Response> {
    let streams = state.servers.live_streams(server_id).await?;
    Ok(ok(streams))
}
