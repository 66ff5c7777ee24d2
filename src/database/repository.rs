use serde_json::json;
use sqlx::SqliteConnection;

use crate::database::manager::DatabaseError;
use crate::database::models::address::FILTERABLE_COLUMNS;
use crate::database::models::{AddressFields, PostalAddress};
use crate::database::query_builder::QueryBuilder;
use crate::filter::FilterData;

const TABLE: &str = "postal_addresses";
const ALIAS: &str = "a";
const OWNERSHIP_JOIN: &str = "JOIN \"address_ownerships\" AS \"o\" ON \"o\".\"address_id\" = \"a\".\"id\"";

/// Deduplicated postal address records.
///
/// Every function runs on the caller's connection so that multi-step operations can share
/// one write transaction.
pub struct AddressRepository;

impl AddressRepository {
    /// Exact match under the null-aware rule: absent fields only match absent fields.
    pub async fn find_exact(
        conn: &mut SqliteConnection,
        fields: &AddressFields,
    ) -> Result<Option<PostalAddress>, DatabaseError> {
        let row = sqlx::query_as::<_, PostalAddress>(
            "SELECT * FROM postal_addresses \
             WHERE address1 = ? AND address2 IS ? AND zip_code IS ? AND city IS ? AND country = ?",
        )
        .bind(fields.address1.clone())
        .bind(fields.address2.clone())
        .bind(fields.zip_code.clone())
        .bind(fields.city.clone())
        .bind(fields.country.clone())
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Returns the matching record, or inserts one. The flag reports whether it was created.
    pub async fn find_or_create(
        conn: &mut SqliteConnection,
        fields: &AddressFields,
    ) -> Result<(PostalAddress, bool), DatabaseError> {
        if let Some(existing) = Self::find_exact(conn, fields).await? {
            return Ok((existing, false));
        }
        let created = Self::insert(conn, fields).await?;
        Ok((created, true))
    }

    pub async fn insert(conn: &mut SqliteConnection, fields: &AddressFields) -> Result<PostalAddress, DatabaseError> {
        let row = sqlx::query_as::<_, PostalAddress>(
            "INSERT INTO postal_addresses (address1, address2, zip_code, city, country) \
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(fields.address1.clone())
        .bind(fields.address2.clone())
        .bind(fields.zip_code.clone())
        .bind(fields.city.clone())
        .bind(fields.country.clone())
        .fetch_one(&mut *conn)
        .await?;
        tracing::debug!("Inserted postal address {}", row.id);
        Ok(row)
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<PostalAddress>, DatabaseError> {
        let row = sqlx::query_as::<_, PostalAddress>("SELECT * FROM postal_addresses WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Overwrite all five fields. Fails with `UniqueViolation` when another record holds the tuple.
    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        fields: &AddressFields,
    ) -> Result<PostalAddress, DatabaseError> {
        if let Some(other) = Self::find_exact(conn, fields).await? {
            if other.id != id {
                return Err(DatabaseError::UniqueViolation(fields.unique_rule().index_name()));
            }
        }

        sqlx::query_as::<_, PostalAddress>(
            "UPDATE postal_addresses SET address1 = ?, address2 = ?, zip_code = ?, city = ?, country = ? \
             WHERE id = ? RETURNING *",
        )
        .bind(fields.address1.clone())
        .bind(fields.address2.clone())
        .bind(fields.zip_code.clone())
        .bind(fields.city.clone())
        .bind(fields.country.clone())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Postal address {} not found", id)))
    }

    /// Unconditional delete; ownership rows cascade.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM postal_addresses WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists_referenced_by(conn: &mut SqliteConnection, id: i64) -> Result<bool, DatabaseError> {
        let (referenced,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM address_ownerships WHERE address_id = ?)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(referenced)
    }

    /// Delete the record when no owner references it. Returns whether it was deleted.
    pub async fn delete_if_orphaned(conn: &mut SqliteConnection, id: i64) -> Result<bool, DatabaseError> {
        if Self::exists_referenced_by(conn, id).await? {
            return Ok(false);
        }
        let deleted = Self::delete(conn, id).await?;
        if deleted {
            tracing::debug!("Deleted orphaned postal address {}", id);
        }
        Ok(deleted)
    }

    pub async fn select(
        conn: &mut SqliteConnection,
        filter_data: FilterData,
    ) -> Result<Vec<PostalAddress>, DatabaseError> {
        QueryBuilder::<PostalAddress>::new(TABLE, ALIAS, FILTERABLE_COLUMNS)?
            .filter(filter_data)?
            .select_all(conn)
            .await
    }

    pub async fn select_for_owner(
        conn: &mut SqliteConnection,
        owner_id: i64,
        filter_data: FilterData,
    ) -> Result<Vec<PostalAddress>, DatabaseError> {
        QueryBuilder::<PostalAddress>::new(TABLE, ALIAS, FILTERABLE_COLUMNS)?
            .join(OWNERSHIP_JOIN)
            .scope("\"o\".\"owner_id\" = ?", vec![json!(owner_id)])
            .filter(filter_data)?
            .select_all(conn)
            .await
    }

    /// One address, only if `owner_id` holds it
    pub async fn get_for_owner(
        conn: &mut SqliteConnection,
        owner_id: i64,
        id: i64,
    ) -> Result<Option<PostalAddress>, DatabaseError> {
        let by_id = FilterData { where_clause: Some(json!({ "id": id })), ..Default::default() };
        QueryBuilder::<PostalAddress>::new(TABLE, ALIAS, FILTERABLE_COLUMNS)?
            .join(OWNERSHIP_JOIN)
            .scope("\"o\".\"owner_id\" = ?", vec![json!(owner_id)])
            .filter(by_id)?
            .select_optional(conn)
            .await
    }

    pub async fn count_for_owner(
        conn: &mut SqliteConnection,
        owner_id: i64,
        filter_data: FilterData,
    ) -> Result<i64, DatabaseError> {
        QueryBuilder::<PostalAddress>::new(TABLE, ALIAS, FILTERABLE_COLUMNS)?
            .join(OWNERSHIP_JOIN)
            .scope("\"o\".\"owner_id\" = ?", vec![json!(owner_id)])
            .filter(filter_data)?
            .count(conn)
            .await
    }
}
