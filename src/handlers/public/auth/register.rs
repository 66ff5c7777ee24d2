// handlers/public/auth/register.rs - POST /auth/register handler

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

use super::utils::{json_error, CredentialsRequest};
use crate::config;
use crate::database::models::{Account, AccountCredentials};
use crate::error::ApiError;
use crate::AppState;

/// POST /auth/register - Create an account with an empty address book
///
/// Disabled (403) unless `api.allow_registration` is set. A taken username is a 400
/// naming the `username` field.
pub async fn register_post(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    if !config::config().api.allow_registration {
        return Err(ApiError::forbidden("Registration is disabled"));
    }

    let Json(request) = payload.map_err(json_error)?;
    let account = state
        .ownership
        .create_account_and_owner(AccountCredentials::new(request.username, Some(request.password)))
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}
