use axum::extract::rejection::JsonRejection;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;

use crate::config;
use crate::error::ApiError;

/// Username/password body shared by the token, login and register endpoints
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

pub fn json_error(rejection: JsonRejection) -> ApiError {
    ApiError::invalid_json(rejection.body_text())
}

/// HttpOnly cookie carrying the session id
pub fn session_cookie(value: String) -> Cookie<'static> {
    let security = &config::config().security;
    Cookie::build((security.session_cookie_name.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(security.require_https)
        .build()
}

/// Removal cookie matching [`session_cookie`]'s name and path
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((config::config().security.session_cookie_name.clone(), ""))
        .path("/")
        .build()
}
