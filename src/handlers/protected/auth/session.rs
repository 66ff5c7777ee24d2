use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::public::auth::utils::expired_session_cookie;
use crate::middleware::AuthUser;
use crate::AppState;

/// GET /api/v1/auth/whoami - Current account
///
/// Expected Output:
/// ```json
/// { "id": 1, "username": "alice", "date_joined": "2025-01-01T00:00:00Z" }
/// ```
pub async fn whoami(Extension(user): Extension<AuthUser>) -> Json<Value> {
    Json(json!({
        "id": user.user_id,
        "username": user.username,
        "date_joined": user.date_joined,
    }))
}

/// POST /api-auth/logout - Revoke the current session and clear the cookie
///
/// Tokens issued for the session stop working immediately.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session_id) = user.session_id {
        state.sessions.logout(session_id).await?;
    }
    Ok((jar.remove(expired_session_cookie()), StatusCode::NO_CONTENT))
}
