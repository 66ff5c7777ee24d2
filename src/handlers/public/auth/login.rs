// handlers/public/auth/login.rs - POST /api-auth/login handler

use axum::{extract::rejection::JsonRejection, extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use super::utils::{json_error, session_cookie, CredentialsRequest};
use crate::error::ApiError;
use crate::AppState;

/// POST /api-auth/login - Open a browser session
///
/// Sets the session cookie and also returns a token bound to the same session, so
/// `POST /api-auth/logout` revokes both.
///
/// Expected Output:
/// ```json
/// { "token": "eyJhbGciOiJIUzI1NiI...", "expires_in": 604800 }
/// ```
pub async fn login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(credentials) = payload.map_err(json_error)?;
    let issued = state.sessions.login(&credentials.username, &credentials.password).await?;

    let jar = jar.add(session_cookie(issued.session.id.to_string()));
    Ok((
        jar,
        Json(json!({
            "token": issued.token,
            "expires_in": issued.expires_in(),
        })),
    ))
}
