use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Account, Session};

pub struct AccountRepository;

impl AccountRepository {
    pub async fn create(
        conn: &mut SqliteConnection,
        username: &str,
        password_hash: Option<String>,
    ) -> Result<Account, DatabaseError> {
        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO users (username, password_hash, is_active, date_joined) VALUES (?, ?, 1, ?) RETURNING *",
        )
        .bind(username.to_string())
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(account)
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Account>, DatabaseError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(account)
    }

    pub async fn find_by_username(conn: &mut SqliteConnection, username: &str) -> Result<Option<Account>, DatabaseError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE username = ?")
            .bind(username.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(account)
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Account>, DatabaseError> {
        let accounts = sqlx::query_as::<_, Account>("SELECT * FROM users ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;
        Ok(accounts)
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(conn: &mut SqliteConnection, user_id: i64, ttl: Duration) -> Result<Session, DatabaseError> {
        let now = Utc::now();
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(now)
        .bind(now + ttl)
        .fetch_one(&mut *conn)
        .await?;
        Ok(session)
    }

    pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Session>, DatabaseError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(session)
    }

    pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_for_user(conn: &mut SqliteConnection, user_id: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Drop sessions that expired before `now`; expiry itself is checked in Rust on lookup.
    pub async fn purge_expired(conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let expired: Vec<Session> = sqlx::query_as::<_, Session>("SELECT * FROM sessions")
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .filter(|s| s.is_expired(now))
            .collect();
        for session in &expired {
            Self::delete(conn, session.id).await?;
        }
        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::manager::tests::temp_database;

    #[tokio::test]
    async fn usernames_are_unique() {
        let db = temp_database().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let alice = AccountRepository::create(&mut conn, "alice", None).await.unwrap();
        assert!(!alice.has_usable_password());
        let err = AccountRepository::create(&mut conn, "alice", None).await.unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn sessions_roundtrip_and_expire() {
        let db = temp_database().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let alice = AccountRepository::create(&mut conn, "alice", None).await.unwrap();

        let live = SessionRepository::create(&mut conn, alice.id, Duration::hours(1)).await.unwrap();
        let stale = SessionRepository::create(&mut conn, alice.id, Duration::seconds(-5)).await.unwrap();

        let fetched = SessionRepository::get(&mut conn, live.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, alice.id);
        assert!(!fetched.is_expired(Utc::now()));

        assert_eq!(SessionRepository::purge_expired(&mut conn, Utc::now()).await.unwrap(), 1);
        assert!(SessionRepository::get(&mut conn, stale.id).await.unwrap().is_none());

        assert!(SessionRepository::delete(&mut conn, live.id).await.unwrap());
        assert!(!SessionRepository::delete(&mut conn, live.id).await.unwrap());
    }
}
