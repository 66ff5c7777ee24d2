use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, Uri},
    Extension, Json,
};
use serde::Deserialize;

use super::utils::request_url;
use crate::config;
use crate::database::models::PostalAddress;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::{AddressFilter, Page, PageRequest};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub id: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> Result<AddressFilter, ApiError> {
        let id = match self.id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| ApiError::field_error("id", "Enter a number."))?),
            None => None,
        };
        Ok(AddressFilter {
            id,
            address1: self.address1.clone(),
            address2: self.address2.clone(),
            zip_code: self.zip_code.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
        })
    }
}

/// GET /api/v1/addressbook - Addresses owned by the current user
///
/// Exact-match filters on any address field or `id`, ordered by id, paginated with
/// `limit`/`offset`.
///
/// Expected Output:
/// ```json
/// {
///   "count": 3,
///   "next": null,
///   "previous": "http://host/api/v1/addressbook?limit=2",
///   "results": [{ "id": 3, "address1": "...", "address2": null, "zip_code": null, "city": null, "country": "GBR" }]
/// }
/// ```
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    uri: Uri,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<PostalAddress>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let filter = query.filter()?;
    let window = PageRequest::resolve(
        query.limit.as_deref(),
        query.offset.as_deref(),
        &config::config().pagination,
    );
    let url = request_url(&headers, &uri)?;

    let page = state.ownership.list_for_user(user.user_id, &filter, window, &url).await?;
    Ok(Json(page))
}
