use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{self, AuthError, Claims};
use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{Account, Session};
use crate::database::{AccountRepository, SessionRepository};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unable to log in with provided credentials.")]
    InvalidCredentials,

    #[error("User inactive or deleted.")]
    InactiveAccount,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Session expired or revoked.")]
    SessionRevoked,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A freshly opened session with its signed token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub account: Account,
    pub session: Session,
    pub token: String,
}

impl IssuedSession {
    pub fn expires_in(&self) -> i64 {
        (self.session.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Password checks and the server-side sessions that back tokens and cookies.
#[derive(Clone)]
pub struct SessionService {
    db: DatabaseManager,
}

impl SessionService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Account, SessionError> {
        let mut conn = self.db.pool().acquire().await.map_err(DatabaseError::from)?;
        let account = AccountRepository::find_by_username(&mut conn, username)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;
        // Accounts without a password can never log in
        let hash = account.password_hash.as_deref().ok_or(SessionError::InvalidCredentials)?;
        auth::verify_password(password, hash).map_err(|_| SessionError::InvalidCredentials)?;
        if !account.is_active {
            return Err(SessionError::InactiveAccount);
        }
        Ok(account)
    }

    /// Verify credentials and open a session lasting `security.jwt_expiry_hours`.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, SessionError> {
        let account = self.verify_credentials(username, password).await?;
        let ttl = Duration::hours(config::config().security.jwt_expiry_hours as i64);

        let mut conn = self.db.pool().acquire().await.map_err(DatabaseError::from)?;
        let session = SessionRepository::create(&mut conn, account.id, ttl).await?;
        let token = auth::generate_jwt(&Claims::new(&account, &session))?;

        tracing::info!("Opened session {} for user {}", session.id, account.username);
        Ok(IssuedSession { account, session, token })
    }

    /// Resolve a bearer token to its account; the backing session must still exist.
    pub async fn resolve_token(&self, token: &str) -> Result<(Account, Session), SessionError> {
        let claims = auth::validate_jwt(token).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            SessionError::InvalidToken
        })?;
        let (account, session) = self.resolve_session(claims.sid).await?;
        if account.id != claims.sub {
            return Err(SessionError::InvalidToken);
        }
        Ok((account, session))
    }

    pub async fn resolve_session(&self, session_id: Uuid) -> Result<(Account, Session), SessionError> {
        let mut conn = self.db.pool().acquire().await.map_err(DatabaseError::from)?;
        let session = SessionRepository::get(&mut conn, session_id)
            .await?
            .ok_or(SessionError::SessionRevoked)?;
        if session.is_expired(Utc::now()) {
            SessionRepository::delete(&mut conn, session.id).await?;
            return Err(SessionError::SessionRevoked);
        }
        let account = AccountRepository::get(&mut conn, session.user_id)
            .await?
            .ok_or(SessionError::SessionRevoked)?;
        if !account.is_active {
            return Err(SessionError::InactiveAccount);
        }
        Ok((account, session))
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<bool, SessionError> {
        let mut conn = self.db.pool().acquire().await.map_err(DatabaseError::from)?;
        let removed = SessionRepository::delete(&mut conn, session_id).await?;
        tracing::info!("Closed session {}", session_id);
        Ok(removed)
    }

    pub async fn purge_expired(&self) -> Result<u64, SessionError> {
        let mut conn = self.db.pool().acquire().await.map_err(DatabaseError::from)?;
        Ok(SessionRepository::purge_expired(&mut conn, Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::manager::tests::temp_database;
    use crate::database::models::AccountCredentials;
    use crate::services::OwnershipService;

    async fn setup() -> SessionService {
        let db = temp_database().await;
        let ownership = OwnershipService::new(db.clone());
        ownership
            .create_account_and_owner(AccountCredentials::new("alice", Some("s3cret".to_string())))
            .await
            .unwrap();
        ownership
            .create_account_and_owner(AccountCredentials::new("nopass", None))
            .await
            .unwrap();
        SessionService::new(db)
    }

    #[tokio::test]
    async fn login_then_logout_revokes_token() {
        let sessions = setup().await;
        let issued = sessions.login("alice", "s3cret").await.unwrap();
        assert!(issued.expires_in() > 0);

        let (account, _) = sessions.resolve_token(&issued.token).await.unwrap();
        assert_eq!(account.username, "alice");

        assert!(sessions.logout(issued.session.id).await.unwrap());
        assert!(matches!(
            sessions.resolve_token(&issued.token).await,
            Err(SessionError::SessionRevoked)
        ));
    }

    #[tokio::test]
    async fn rejects_bad_credentials() {
        let sessions = setup().await;
        assert!(matches!(sessions.login("alice", "wrong").await, Err(SessionError::InvalidCredentials)));
        assert!(matches!(sessions.login("ghost", "x").await, Err(SessionError::InvalidCredentials)));
        assert!(matches!(sessions.login("nopass", "").await, Err(SessionError::InvalidCredentials)));
        assert!(matches!(sessions.resolve_token("garbage").await, Err(SessionError::InvalidToken)));
    }
}
