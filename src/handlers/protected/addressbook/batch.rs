use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Extension,
};
use serde::Deserialize;

use super::utils::parse_id_list;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub ids: Option<String>,
}

/// DELETE /api/v1/addressbook/batch?ids=1,2,3 - Remove several addresses at once
///
/// All or nothing: if any id is not owned by the current user the response is 404 and
/// nothing is removed.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<BatchQuery>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let raw = query
        .ids
        .ok_or_else(|| ApiError::field_error("ids", "This query parameter is required."))?;
    let ids = parse_id_list(&raw)?;

    state.ownership.remove_owned_batch(user.user_id, &ids).await?;
    Ok(StatusCode::NO_CONTENT)
}
