//! Admin user management and stream assignment

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use serde::Deserialize;

use crate::errors::AppResult;
use crate::web::responses::{created, ok, PaginatedResponse};
use crate::web::{AdminUser, AppState, PaginationParams};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct StreamAssignment {
    pub server_id: i64,
    pub stream_name: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<Response> {
    let user = state
        .users
        .create(&request.username, &request.password, request.is_admin)
        .await?;
    Ok(created(user))
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    pagination: PaginationParams,
) -> AppResult<Response> {
    let (users, total) = state.users.list(pagination.to_query()).await?;
    Ok(ok(PaginatedResponse::new(
        users,
        total,
        pagination.page,
        pagination.limit,
    )))
}

pub async fn assign_stream(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(user_id): Path<i64>,
    Json(request): Json<StreamAssignment>,
) -> AppResult<Response> {
    let binding = state
        .users
        .assign_stream(user_id, request.server_id, &request.stream_name)
        .await?;
    Ok(created(binding))
}

pub async fn list_user_streams(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(user_id): Path<i64>,
) -> AppResult<Response> {
    Ok(ok(state.users.streams_of(user_id).await?))
}

pub async fn unassign_stream(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(user_id): Path<i64>,
    Json(request): Json<StreamAssignment>,
) -> AppResult<Response> {
    state
        .users
        .unassign_stream(user_id, request.server_id, &request.stream_name)
        .await?;
    Ok(ok("Stream assignment removed"))
}
