//! Stream owner endpoints
//!
//! Every stream-scoped handler goes through `ClientService`, which runs the
//! access gate before anything else.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppResult;
use crate::models::{PushDestination, User};
use crate::web::responses::{created, ok};
use crate::web::{AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct ServerSelector {
    pub server_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TrafficQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub server_id: Option<i64>,
}

/// Unwrap an extractor result, running the access gate before reporting
/// a parse failure
async fn parsed<T>(
    state: &AppState,
    user: &User,
    stream_name: &str,
    extracted: Result<T, String>,
) -> AppResult<T> {
    match extracted {
        Ok(value) => Ok(value),
        Err(reason) => Err(state
            .client
            .reject_malformed(user, stream_name, reason)
            .await),
    }
}

fn query_of<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, String> {
    query.map(|Query(value)| value).map_err(|e| e.body_text())
}

fn body_of<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, String> {
    body.map(|Json(value)| value).map_err(|e| e.body_text())
}

pub async fn my_streams(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Response> {
    Ok(ok(state.client.my_streams(&user).await?))
}

pub async fn stream_traffic(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(stream_name): Path<String>,
    query: Result<Query<TrafficQuery>, QueryRejection>,
) -> AppResult<Response> {
    let query = parsed(&state, &user, &stream_name, query_of(query)).await?;
    let traffic = state
        .client
        .traffic(
            &user,
            &stream_name,
            query.server_id,
            query.start_date,
            query.end_date,
        )
        .await?;
    Ok(ok(traffic))
}

pub async fn list_pushes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(stream_name): Path<String>,
    selector: Result<Query<ServerSelector>, QueryRejection>,
) -> AppResult<Response> {
    let selector = parsed(&state, &user, &stream_name, query_of(selector)).await?;
    let pushes = state
        .client
        .list_pushes(&user, &stream_name, selector.server_id)
        .await?;
    Ok(ok(pushes))
}

pub async fn add_push(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(stream_name): Path<String>,
    selector: Result<Query<ServerSelector>, QueryRejection>,
    push: Result<Json<PushDestination>, JsonRejection>,
) -> AppResult<Response> {
    let selector = parsed(&state, &user, &stream_name, query_of(selector)).await?;
    let push = parsed(&state, &user, &stream_name, body_of(push)).await?;
    let pushes = state
        .client
        .add_push(&user, &stream_name, selector.server_id, &push.url)
        .await?;
    Ok(created(pushes))
}

pub async fn remove_push(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(stream_name): Path<String>,
    selector: Result<Query<ServerSelector>, QueryRejection>,
    push: Result<Json<PushDestination>, JsonRejection>,
) -> AppResult<Response> {
    let selector = parsed(&state, &user, &stream_name, query_of(selector)).await?;
    let push = parsed(&state, &user, &stream_name, body_of(push)).await?;
    let pushes = state
        .client
        .remove_push(&user, &stream_name, selector.server_id, &push.url)
        .await?;
    Ok(ok(pushes))
}
