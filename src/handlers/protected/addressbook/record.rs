use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::utils::parse_address_id;
use crate::database::models::{AddressPayload, PostalAddress};
use crate::error::ApiError;
use crate::handlers::public::auth::utils::json_error;
use crate::middleware::AuthUser;
use crate::AppState;

/// GET /api/v1/addressbook/:id - One owned address
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<PostalAddress>, ApiError> {
    let id = parse_address_id(&id)?;
    Ok(Json(state.ownership.get_owned(user.user_id, id).await?))
}

/// PATCH /api/v1/addressbook/:id - Partial update
///
/// Absent fields are kept and `null` clears an optional field. The change is visible to
/// every owner of the address.
pub async fn patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<AddressPayload>, JsonRejection>,
) -> Result<Json<PostalAddress>, ApiError> {
    let id = parse_address_id(&id)?;
    let Json(payload) = payload.map_err(json_error)?;
    Ok(Json(state.ownership.update_owned(user.user_id, id, payload).await?))
}

/// DELETE /api/v1/addressbook/:id - Remove from the current user's book
///
/// The record itself is deleted only when no other user still owns it.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_address_id(&id)?;
    state.ownership.remove_owned(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
