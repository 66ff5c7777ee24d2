use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth;
use crate::config;
use crate::database::models::Account;
use crate::error::ApiError;
use crate::AppState;

/// Authenticated account for the current request
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub date_joined: DateTime<Utc>,
    /// Backing session; `None` for Basic credentials
    pub session_id: Option<Uuid>,
}

impl AuthUser {
    fn new(account: Account, session_id: Option<Uuid>) -> Self {
        Self {
            user_id: account.id,
            username: account.username,
            date_joined: account.date_joined,
            session_id,
        }
    }
}

enum Credentials {
    Token(String),
    Basic(String),
    Cookie(String),
}

/// Resolves `Authorization: Bearer|Token|Basic` or the session cookie into an [`AuthUser`].
///
/// Any failure is a 401; the request never reaches the handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = extract_credentials(request.headers())?;

    let auth_user = match credentials {
        Credentials::Token(token) => {
            let (account, session) = state.sessions.resolve_token(&token).await?;
            AuthUser::new(account, Some(session.id))
        }
        Credentials::Basic(encoded) => {
            let (username, password) =
                auth::decode_basic(&encoded).map_err(|e| ApiError::unauthorized(e.to_string()))?;
            let account = state
                .sessions
                .verify_credentials(&username, &password)
                .await
                .map_err(|_| ApiError::unauthorized("Invalid username/password."))?;
            AuthUser::new(account, None)
        }
        Credentials::Cookie(value) => {
            let session_id = Uuid::parse_str(&value).map_err(|_| ApiError::unauthorized("Invalid session."))?;
            let (account, session) = state.sessions.resolve_session(session_id).await?;
            AuthUser::new(account, Some(session.id))
        }
    };

    tracing::debug!("Authenticated user {} ({})", auth_user.username, auth_user.user_id);
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

fn extract_credentials(headers: &HeaderMap) -> Result<Credentials, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

        let (scheme, value) = auth_str
            .split_once(' ')
            .ok_or_else(|| ApiError::unauthorized("Invalid token header. No credentials provided."))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ApiError::unauthorized("Invalid token header. No credentials provided."));
        }

        return match scheme.to_ascii_lowercase().as_str() {
            "bearer" | "token" => Ok(Credentials::Token(value.to_string())),
            "basic" => Ok(Credentials::Basic(value.to_string())),
            _ => Err(ApiError::unauthorized("Unsupported authorization scheme")),
        };
    }

    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(&config::config().security.session_cookie_name) {
        return Ok(Credentials::Cookie(cookie.value().to_string()));
    }

    Err(ApiError::unauthorized("Authentication credentials were not provided."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn recognises_supported_schemes() {
        assert!(matches!(
            extract_credentials(&headers(header::AUTHORIZATION, "Bearer abc")),
            Ok(Credentials::Token(t)) if t == "abc"
        ));
        assert!(matches!(
            extract_credentials(&headers(header::AUTHORIZATION, "Token abc")),
            Ok(Credentials::Token(_))
        ));
        assert!(matches!(
            extract_credentials(&headers(header::AUTHORIZATION, "Basic YTpi")),
            Ok(Credentials::Basic(_))
        ));
        assert!(extract_credentials(&headers(header::AUTHORIZATION, "Digest x")).is_err());
        assert!(extract_credentials(&headers(header::AUTHORIZATION, "Bearer")).is_err());
    }

    #[test]
    fn falls_back_to_session_cookie() {
        let name = &config::config().security.session_cookie_name;
        let h = headers(header::COOKIE, &format!("other=1; {}=abc", name));
        assert!(matches!(extract_credentials(&h), Ok(Credentials::Cookie(v)) if v == "abc"));
        assert!(extract_credentials(&HeaderMap::new()).is_err());
    }
}
