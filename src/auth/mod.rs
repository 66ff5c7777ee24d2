use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::models::{Account, Session};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: i64,
    pub username: String,
    /// Session id; the token is only valid while this session row exists
    pub sid: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(account: &Account, session: &Session) -> Self {
        Self {
            sub: account.id,
            username: account.username.clone(),
            sid: session.id,
            exp: session.expires_at.timestamp(),
            iat: session.created_at.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid username/password.")]
    InvalidCredentials,

    #[error("Password hashing failed")]
    PasswordHash,
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Check signature and expiry. Session liveness is checked separately against the database.
pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Decode the payload of `Authorization: Basic <b64>` into `(username, password)`.
pub fn decode_basic(encoded: &str) -> Result<(String, String), AuthError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::InvalidToken("Invalid basic header. Credentials not correctly base64 encoded.".to_string()))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|_| AuthError::InvalidToken("Invalid basic header. Credentials not correctly encoded.".to_string()))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| AuthError::InvalidToken("Invalid basic header. No credentials provided.".to_string()))?;
    Ok((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn fixtures() -> (Account, Session) {
        let now = Utc::now();
        let account = Account {
            id: 42,
            username: "alice".to_string(),
            password_hash: None,
            is_active: true,
            date_joined: now,
        };
        let session = Session {
            id: Uuid::new_v4(),
            user_id: 42,
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        (account, session)
    }

    #[test]
    fn jwt_roundtrip() {
        let (account, session) = fixtures();
        let token = generate_jwt(&Claims::new(&account, &session)).unwrap();
        let claims = validate_jwt(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.sid, session.id);
    }

    #[test]
    fn rejects_tampered_and_expired_tokens() {
        let (account, mut session) = fixtures();
        let token = generate_jwt(&Claims::new(&account, &session)).unwrap();
        assert!(validate_jwt(&format!("{}x", token)).is_err());

        session.expires_at = Utc::now() - Duration::hours(2);
        let expired = generate_jwt(&Claims::new(&account, &session)).unwrap();
        assert!(matches!(validate_jwt(&expired), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(verify_password("wrong", &hash).is_err());
        assert!(verify_password("anything", "not-a-hash").is_err());
    }

    #[test]
    fn decodes_basic_credentials() {
        let encoded = STANDARD.encode("alice:pa:ss");
        assert_eq!(decode_basic(&encoded).unwrap(), ("alice".to_string(), "pa:ss".to_string()));
        assert!(decode_basic("%%%").is_err());
        assert!(decode_basic(&STANDARD.encode("nocolon")).is_err());
    }
}
