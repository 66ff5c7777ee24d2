use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension};
use axum_extra::extract::cookie::CookieJar;

use crate::error::ApiError;
use crate::handlers::public::auth::utils::expired_session_cookie;
use crate::middleware::AuthUser;
use crate::AppState;

/// DELETE /api/v1/auth/account - Delete the current account
///
/// Sessions and the address set go with it. Addresses still owned by someone else survive.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let outcomes = state.ownership.delete_account(user.user_id).await?;
    tracing::info!(
        "Account {} deleted, {} of {} addresses removed",
        user.username,
        outcomes.iter().filter(|o| o.deleted).count(),
        outcomes.len()
    );
    Ok((jar.remove(expired_session_cookie()), StatusCode::NO_CONTENT))
}
