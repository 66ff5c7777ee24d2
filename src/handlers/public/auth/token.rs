// handlers/public/auth/token.rs - POST /api-token-auth handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::{json, Value};

use super::utils::{json_error, CredentialsRequest};
use crate::error::ApiError;
use crate::AppState;

/// POST /api-token-auth - Exchange credentials for a bearer token
///
/// Expected Input:
/// ```json
/// { "username": "alice", "password": "s3cret" }
/// ```
///
/// Expected Output:
/// ```json
/// { "token": "eyJhbGciOiJIUzI1NiI..." }
/// ```
///
/// The token is accepted as `Authorization: Token <t>` or `Authorization: Bearer <t>`.
pub async fn token_post(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(credentials) = payload.map_err(json_error)?;
    let issued = state.sessions.login(&credentials.username, &credentials.password).await?;
    Ok(Json(json!({ "token": issued.token })))
}
