use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};

use crate::database::models::{AddressPayload, PostalAddress};
use crate::error::ApiError;
use crate::handlers::public::auth::utils::json_error;
use crate::middleware::AuthUser;
use crate::AppState;

/// POST /api/v1/addressbook - Add an address to the current user's book
///
/// Expected Input:
/// ```json
/// { "address1": "1 High St", "address2": null, "zip_code": "LS1 1AA", "city": "Leeds", "country": "GBR" }
/// ```
///
/// Returns 201 with the stored address. An address already owned by anyone is a 400
/// naming the colliding fields.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<AddressPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<PostalAddress>), ApiError> {
    let Json(payload) = payload.map_err(json_error)?;
    let fields = payload
        .into_fields()
        .map_err(|errors| ApiError::validation_error("Invalid input.", Some(errors)))?;

    let address = state.ownership.create_for_user(user.user_id, fields).await?;
    Ok((StatusCode::CREATED, Json(address)))
}
