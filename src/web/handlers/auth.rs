//! Token issuance

use axum::{extract::State, Json};

use crate::errors::AppResult;
use crate::services::TokenResponse;
use crate::web::extractors::LoginForm;
use crate::web::AppState;

/// `POST /api/auth/token`
///
/// Answers with a bare `{access_token, token_type}` body so standard
/// password-flow clients can consume it.
pub async fn issue_token(
    State(state): State<AppState>,
    LoginForm(request): LoginForm,
) -> AppResult<Json<TokenResponse>> {
    let token = state.auth.login(&request.username, &request.password).await?;
    Ok(Json(token))
}
