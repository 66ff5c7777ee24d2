use sqlx::SqliteConnection;

use crate::database::manager::DatabaseError;
use crate::database::models::AddressUser;

/// The address-user association: which owner holds which postal addresses.
pub struct OwnerRepository;

impl OwnerRepository {
    pub async fn create(conn: &mut SqliteConnection, user_id: i64) -> Result<AddressUser, DatabaseError> {
        let owner = sqlx::query_as::<_, AddressUser>("INSERT INTO address_users (user_id) VALUES (?) RETURNING *")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(owner)
    }

    pub async fn find_by_user(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<AddressUser>, DatabaseError> {
        let owner = sqlx::query_as::<_, AddressUser>("SELECT * FROM address_users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(owner)
    }

    pub async fn owns(conn: &mut SqliteConnection, owner_id: i64, address_id: i64) -> Result<bool, DatabaseError> {
        let (owned,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM address_ownerships WHERE owner_id = ? AND address_id = ?)",
        )
        .bind(owner_id)
        .bind(address_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(owned)
    }

    /// Idempotent add. Returns false when the address was already in the set.
    pub async fn attach(conn: &mut SqliteConnection, owner_id: i64, address_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("INSERT OR IGNORE INTO address_ownerships (owner_id, address_id) VALUES (?, ?)")
            .bind(owner_id)
            .bind(address_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn detach(conn: &mut SqliteConnection, owner_id: i64, address_id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM address_ownerships WHERE owner_id = ? AND address_id = ?")
            .bind(owner_id)
            .bind(address_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn owned_ids(conn: &mut SqliteConnection, owner_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT address_id FROM address_ownerships WHERE owner_id = ? ORDER BY address_id")
                .bind(owner_id)
                .fetch_all(&mut *conn)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Remove the association row and every ownership it holds.
    pub async fn delete(conn: &mut SqliteConnection, owner_id: i64) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM address_ownerships WHERE owner_id = ?")
            .bind(owner_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM address_users WHERE id = ?")
            .bind(owner_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
