use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::SqliteConnection;
use url::Url;

use crate::auth;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Account, AccountCredentials, AddressFields, AddressPayload, AddressUser, FieldErrors, PostalAddress, UniqueRule,
};
use crate::database::{AccountRepository, AddressRepository, OwnerRepository, SessionRepository};
use crate::filter::FilterData;
use crate::services::pagination::{Page, PageRequest};

#[derive(Debug, thiserror::Error)]
pub enum OwnershipError {
    #[error("Not found.")]
    NotFound,

    #[error("{message}")]
    Conflict { message: String, fields: Vec<String> },

    #[error("Invalid input.")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Password hashing failed")]
    PasswordHash,
}

impl OwnershipError {
    fn conflict(rule: UniqueRule) -> Self {
        OwnershipError::Conflict {
            message: rule.conflict_message(),
            fields: rule.fields().into_iter().map(String::from).collect(),
        }
    }

    fn username_taken() -> Self {
        OwnershipError::Conflict {
            message: "A user with that username already exists.".to_string(),
            fields: vec!["username".to_string()],
        }
    }
}

/// Translate a lost uniqueness race into the conflict for the tuple being written.
fn address_conflict(rule: UniqueRule) -> impl FnOnce(DatabaseError) -> OwnershipError {
    move |err| match err {
        DatabaseError::UniqueViolation(_) => OwnershipError::conflict(rule),
        other => OwnershipError::Database(other),
    }
}

/// Exact-match list filters. Empty values are ignored.
#[derive(Debug, Clone, Default)]
pub struct AddressFilter {
    pub id: Option<i64>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl AddressFilter {
    fn to_where(&self) -> Value {
        let mut conditions = Map::new();
        if let Some(id) = self.id {
            conditions.insert("id".to_string(), json!(id));
        }
        for (column, value) in [
            ("address1", &self.address1),
            ("address2", &self.address2),
            ("zip_code", &self.zip_code),
            ("city", &self.city),
            ("country", &self.country),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                conditions.insert(column.to_string(), json!(value));
            }
        }
        Value::Object(conditions)
    }
}

/// Result of removing one address from an owner's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemovalOutcome {
    pub address_id: i64,
    /// True when the record itself was deleted because no owner remained
    pub deleted: bool,
}

/// All address operations, scoped to the acting account passed in explicitly.
///
/// A shared address is only deleted once its last owner lets go of it.
#[derive(Clone)]
pub struct OwnershipService {
    db: DatabaseManager,
}

impl OwnershipService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        filter: &AddressFilter,
        window: PageRequest,
        request_url: &Url,
    ) -> Result<Page<PostalAddress>, OwnershipError> {
        let mut conn = self.db.pool().acquire().await.map_err(DatabaseError::from)?;
        let owner = OwnerRepository::find_by_user(&mut conn, user_id)
            .await?
            .ok_or(OwnershipError::NotFound)?;

        let where_clause = filter.to_where();
        let count = AddressRepository::count_for_owner(
            &mut conn,
            owner.id,
            FilterData { where_clause: Some(where_clause.clone()), ..Default::default() },
        )
        .await?;
        let results = AddressRepository::select_for_owner(
            &mut conn,
            owner.id,
            FilterData {
                where_clause: Some(where_clause),
                order: Some(json!("id asc")),
                limit: Some(window.limit),
                offset: Some(window.offset),
            },
        )
        .await?;

        Ok(Page::new(results, count, window, request_url))
    }

    /// Add an address to the user's set, reusing an unowned identical record when there is one.
    pub async fn create_for_user(&self, user_id: i64, fields: AddressFields) -> Result<PostalAddress, OwnershipError> {
        fields.validate().map_err(OwnershipError::Validation)?;
        let rule = fields.unique_rule();

        let mut tx = self.db.begin_write().await?;
        let owner = OwnerRepository::find_by_user(&mut tx, user_id)
            .await?
            .ok_or(OwnershipError::NotFound)?;

        let (address, created) = AddressRepository::find_or_create(&mut tx, &fields)
            .await
            .map_err(address_conflict(rule))?;
        // The tuple is globally unique, so a record someone already holds cannot be claimed again
        if !created && AddressRepository::exists_referenced_by(&mut tx, address.id).await? {
            return Err(OwnershipError::conflict(rule));
        }
        OwnerRepository::attach(&mut tx, owner.id, address.id).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        tracing::info!("User {} added postal address {}", user_id, address.id);
        Ok(address)
    }

    pub async fn get_owned(&self, user_id: i64, address_id: i64) -> Result<PostalAddress, OwnershipError> {
        let mut conn = self.db.pool().acquire().await.map_err(DatabaseError::from)?;
        Self::owned_address(&mut conn, user_id, address_id).await
    }

    pub async fn update_owned(
        &self,
        user_id: i64,
        address_id: i64,
        patch: AddressPayload,
    ) -> Result<PostalAddress, OwnershipError> {
        let mut tx = self.db.begin_write().await?;
        let current = Self::owned_address(&mut tx, user_id, address_id).await?;

        let fields = patch.apply_to(&current.fields()).map_err(OwnershipError::Validation)?;
        let updated = AddressRepository::update(&mut tx, address_id, &fields)
            .await
            .map_err(address_conflict(fields.unique_rule()))?;
        tx.commit().await.map_err(DatabaseError::from)?;

        tracing::info!("User {} updated postal address {}", user_id, address_id);
        Ok(updated)
    }

    pub async fn remove_owned(&self, user_id: i64, address_id: i64) -> Result<RemovalOutcome, OwnershipError> {
        let mut tx = self.db.begin_write().await?;
        let owner = OwnerRepository::find_by_user(&mut tx, user_id)
            .await?
            .ok_or(OwnershipError::NotFound)?;
        let outcome = Self::remove_from_owner(&mut tx, &owner, address_id).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        tracing::info!("User {} removed postal address {} (deleted: {})", user_id, address_id, outcome.deleted);
        Ok(outcome)
    }

    /// All-or-nothing: every id must be owned before anything is removed. Duplicate ids collapse.
    pub async fn remove_owned_batch(
        &self,
        user_id: i64,
        address_ids: &[i64],
    ) -> Result<Vec<RemovalOutcome>, OwnershipError> {
        let mut ids: Vec<i64> = Vec::with_capacity(address_ids.len());
        for id in address_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self.db.begin_write().await?;
        let owner = OwnerRepository::find_by_user(&mut tx, user_id)
            .await?
            .ok_or(OwnershipError::NotFound)?;

        for id in &ids {
            if !OwnerRepository::owns(&mut tx, owner.id, *id).await? {
                tracing::debug!("Batch removal for user {} rejected: address {} not owned", user_id, id);
                return Err(OwnershipError::NotFound);
            }
        }

        let mut outcomes = Vec::with_capacity(ids.len());
        for id in &ids {
            outcomes.push(Self::remove_from_owner(&mut tx, &owner, *id).await?);
        }
        tx.commit().await.map_err(DatabaseError::from)?;

        tracing::info!("User {} removed {} postal addresses", user_id, outcomes.len());
        Ok(outcomes)
    }

    /// Create the account and its empty address set in one transaction.
    pub async fn create_account_and_owner(&self, credentials: AccountCredentials) -> Result<Account, OwnershipError> {
        let mut errors = FieldErrors::new();
        if let Err(message) = credentials.validate_username() {
            errors.insert("username".to_string(), message);
        }
        if matches!(credentials.password.as_deref(), Some("")) {
            errors.insert("password".to_string(), "This field may not be blank.".to_string());
        }
        if !errors.is_empty() {
            return Err(OwnershipError::Validation(errors));
        }

        let password_hash = match credentials.password.as_deref() {
            Some(password) => Some(auth::hash_password(password).map_err(|_| OwnershipError::PasswordHash)?),
            None => None,
        };

        let mut tx = self.db.begin_write().await?;
        if AccountRepository::find_by_username(&mut tx, &credentials.username).await?.is_some() {
            return Err(OwnershipError::username_taken());
        }
        let account = AccountRepository::create(&mut tx, &credentials.username, password_hash)
            .await
            .map_err(|err| match err {
                DatabaseError::UniqueViolation(_) => OwnershipError::username_taken(),
                other => OwnershipError::Database(other),
            })?;
        OwnerRepository::create(&mut tx, account.id).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        tracing::info!("Created account {} ({})", account.id, account.username);
        Ok(account)
    }

    /// Remove the account with its sessions and address set, then delete addresses nobody else owns.
    pub async fn delete_account(&self, user_id: i64) -> Result<Vec<RemovalOutcome>, OwnershipError> {
        let mut tx = self.db.begin_write().await?;

        let owned = match OwnerRepository::find_by_user(&mut tx, user_id).await? {
            Some(owner) => {
                let ids = OwnerRepository::owned_ids(&mut tx, owner.id).await?;
                OwnerRepository::delete(&mut tx, owner.id).await?;
                ids
            }
            None => vec![],
        };
        SessionRepository::delete_for_user(&mut tx, user_id).await?;
        if !AccountRepository::delete(&mut tx, user_id).await? {
            return Err(OwnershipError::NotFound);
        }

        let mut outcomes = Vec::with_capacity(owned.len());
        for address_id in owned {
            let deleted = AddressRepository::delete_if_orphaned(&mut tx, address_id).await?;
            outcomes.push(RemovalOutcome { address_id, deleted });
        }
        tx.commit().await.map_err(DatabaseError::from)?;

        tracing::info!("Deleted account {} and released {} addresses", user_id, outcomes.len());
        Ok(outcomes)
    }

    /// Idempotently add an existing address to the user's set. Returns false if it was already there.
    pub async fn attach_existing(&self, user_id: i64, address_id: i64) -> Result<bool, OwnershipError> {
        let mut tx = self.db.begin_write().await?;
        let owner = Self::ensure_owner(&mut tx, user_id).await?;
        if AddressRepository::get(&mut tx, address_id).await?.is_none() {
            return Err(OwnershipError::NotFound);
        }
        let attached = OwnerRepository::attach(&mut tx, owner.id, address_id).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(attached)
    }

    async fn ensure_owner(conn: &mut SqliteConnection, user_id: i64) -> Result<AddressUser, OwnershipError> {
        if let Some(owner) = OwnerRepository::find_by_user(conn, user_id).await? {
            return Ok(owner);
        }
        if AccountRepository::get(conn, user_id).await?.is_none() {
            return Err(OwnershipError::NotFound);
        }
        Ok(OwnerRepository::create(conn, user_id).await?)
    }

    /// The address if `user_id` owns it. Not owned and nonexistent are indistinguishable.
    async fn owned_address(
        conn: &mut SqliteConnection,
        user_id: i64,
        address_id: i64,
    ) -> Result<PostalAddress, OwnershipError> {
        let owner = OwnerRepository::find_by_user(conn, user_id)
            .await?
            .ok_or(OwnershipError::NotFound)?;
        AddressRepository::get_for_owner(conn, owner.id, address_id)
            .await?
            .ok_or(OwnershipError::NotFound)
    }

    async fn remove_from_owner(
        conn: &mut SqliteConnection,
        owner: &AddressUser,
        address_id: i64,
    ) -> Result<RemovalOutcome, OwnershipError> {
        if !OwnerRepository::detach(conn, owner.id, address_id).await? {
            return Err(OwnershipError::NotFound);
        }
        let deleted = AddressRepository::delete_if_orphaned(conn, address_id).await?;
        Ok(RemovalOutcome { address_id, deleted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationConfig;
    use crate::database::manager::tests::temp_database;

    async fn setup() -> (OwnershipService, DatabaseManager, i64, i64) {
        let db = temp_database().await;
        let service = OwnershipService::new(db.clone());
        let alice = service
            .create_account_and_owner(AccountCredentials::new("alice", None))
            .await
            .unwrap();
        let bob = service
            .create_account_and_owner(AccountCredentials::new("bob", None))
            .await
            .unwrap();
        (service, db, alice.id, bob.id)
    }

    async fn address_exists(db: &DatabaseManager, id: i64) -> bool {
        let mut conn = db.pool().acquire().await.unwrap();
        AddressRepository::get(&mut conn, id).await.unwrap().is_some()
    }

    #[tokio::test]
    async fn create_twice_conflicts_with_rule_fields() {
        let (service, _db, alice, bob) = setup().await;
        let fields = AddressFields::new("1 High St", "GBR").city("Leeds");

        service.create_for_user(alice, fields.clone()).await.unwrap();
        let err = service.create_for_user(alice, fields.clone()).await.unwrap_err();
        match err {
            OwnershipError::Conflict { message, fields } => {
                assert_eq!(message, "The fields address1, city, country must make a unique set.");
                assert_eq!(fields, vec!["address1", "city", "country"]);
            }
            other => panic!("unexpected {:?}", other),
        }

        // Uniqueness is global, not per owner
        assert!(matches!(
            service.create_for_user(bob, fields).await,
            Err(OwnershipError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn create_reuses_unowned_record() {
        let (service, db, alice, _bob) = setup().await;
        let fields = AddressFields::new("7 Orphan Rd", "FRA");
        let orphan = {
            let mut conn = db.pool().acquire().await.unwrap();
            AddressRepository::insert(&mut conn, &fields).await.unwrap()
        };

        let created = service.create_for_user(alice, fields).await.unwrap();
        assert_eq!(created.id, orphan.id);
        assert_eq!(service.get_owned(alice, orphan.id).await.unwrap(), orphan);
    }

    #[tokio::test]
    async fn shared_address_survives_until_last_owner_leaves() {
        let (service, db, alice, bob) = setup().await;
        let shared = service
            .create_for_user(alice, AddressFields::new("1 Shared Way", "GBR"))
            .await
            .unwrap();
        assert!(service.attach_existing(bob, shared.id).await.unwrap());
        assert!(!service.attach_existing(bob, shared.id).await.unwrap());

        let outcome = service.remove_owned(alice, shared.id).await.unwrap();
        assert!(!outcome.deleted);
        assert!(address_exists(&db, shared.id).await);
        assert!(matches!(service.get_owned(alice, shared.id).await, Err(OwnershipError::NotFound)));

        let outcome = service.remove_owned(bob, shared.id).await.unwrap();
        assert!(outcome.deleted);
        assert!(!address_exists(&db, shared.id).await);
    }

    #[tokio::test]
    async fn foreign_address_is_not_found() {
        let (service, db, alice, bob) = setup().await;
        let private = service
            .create_for_user(bob, AddressFields::new("2 Private Ln", "GBR"))
            .await
            .unwrap();

        assert!(matches!(service.remove_owned(alice, private.id).await, Err(OwnershipError::NotFound)));
        assert!(matches!(
            service.update_owned(alice, private.id, AddressPayload::default()).await,
            Err(OwnershipError::NotFound)
        ));
        assert!(address_exists(&db, private.id).await);
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let (service, db, alice, bob) = setup().await;
        let a = service.create_for_user(alice, AddressFields::new("A", "GBR")).await.unwrap();
        let b = service.create_for_user(alice, AddressFields::new("B", "GBR")).await.unwrap();
        let foreign = service.create_for_user(bob, AddressFields::new("C", "GBR")).await.unwrap();

        let err = service.remove_owned_batch(alice, &[a.id, foreign.id, b.id]).await.unwrap_err();
        assert!(matches!(err, OwnershipError::NotFound));
        assert!(address_exists(&db, a.id).await);
        assert!(address_exists(&db, b.id).await);
        assert!(service.get_owned(alice, a.id).await.is_ok());

        let outcomes = service.remove_owned_batch(alice, &[a.id, b.id, a.id]).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.deleted));
        assert!(address_exists(&db, foreign.id).await);
    }

    #[tokio::test]
    async fn update_conflict_and_patch_semantics() {
        let (service, _db, alice, _bob) = setup().await;
        let first = service
            .create_for_user(alice, AddressFields::new("1 High St", "GBR").city("Leeds"))
            .await
            .unwrap();
        let second = service
            .create_for_user(alice, AddressFields::new("1 High St", "GBR"))
            .await
            .unwrap();

        let patch: AddressPayload = serde_json::from_value(json!({ "city": "Leeds" })).unwrap();
        let err = service.update_owned(alice, second.id, patch).await.unwrap_err();
        assert!(matches!(err, OwnershipError::Conflict { .. }));

        let patch: AddressPayload = serde_json::from_value(json!({ "city": null, "zip_code": "LS1" })).unwrap();
        let updated = service.update_owned(alice, first.id, patch).await.unwrap();
        assert_eq!(updated.city, None);
        assert_eq!(updated.zip_code.as_deref(), Some("LS1"));
        assert_eq!(updated.address1, "1 High St");
    }

    #[tokio::test]
    async fn list_is_scoped_filtered_and_paginated() {
        let (service, _db, alice, bob) = setup().await;
        for line in ["1", "2", "3"] {
            service.create_for_user(alice, AddressFields::new(line, "GBR")).await.unwrap();
        }
        service.create_for_user(bob, AddressFields::new("4", "GBR")).await.unwrap();

        let config = PaginationConfig { default_limit: 100, max_limit: Some(1000) };
        let url = Url::parse("http://testserver/api/v1/addressbook?limit=2&offset=2").unwrap();
        let window = PageRequest::resolve(Some("2"), Some("2"), &config);
        let page = service.list_for_user(alice, &AddressFilter::default(), window, &url).await.unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].address1, "3");
        assert!(page.next.is_none());
        assert!(page.previous.is_some());

        let filter = AddressFilter { address1: Some("2".to_string()), city: Some(String::new()), ..Default::default() };
        let window = PageRequest::resolve(None, None, &config);
        let page = service.list_for_user(alice, &filter, window, &url).await.unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].address1, "2");
    }

    #[tokio::test]
    async fn account_lifecycle() {
        let (service, db, alice, bob) = setup().await;
        let err = service
            .create_account_and_owner(AccountCredentials::new("alice", Some("pw".to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, OwnershipError::Conflict { ref fields, .. } if fields == &vec!["username".to_string()]));

        let private = service.create_for_user(alice, AddressFields::new("P", "GBR")).await.unwrap();
        let shared = service.create_for_user(alice, AddressFields::new("S", "GBR")).await.unwrap();
        service.attach_existing(bob, shared.id).await.unwrap();

        let outcomes = service.delete_account(alice).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(!address_exists(&db, private.id).await);
        assert!(address_exists(&db, shared.id).await);
        assert!(service.get_owned(bob, shared.id).await.is_ok());

        assert!(matches!(service.delete_account(alice).await, Err(OwnershipError::NotFound)));
    }

    #[tokio::test]
    async fn account_without_address_book_is_not_found() {
        let (service, db, alice, _bob) = setup().await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            sqlx::query("DELETE FROM address_users WHERE user_id = ?")
                .bind(alice)
                .execute(&mut *conn)
                .await
                .unwrap();
        }

        let config = PaginationConfig { default_limit: 100, max_limit: Some(1000) };
        let url = Url::parse("http://testserver/api/v1/addressbook").unwrap();
        let window = PageRequest::resolve(None, None, &config);
        assert!(matches!(
            service.list_for_user(alice, &AddressFilter::default(), window, &url).await,
            Err(OwnershipError::NotFound)
        ));
        assert!(matches!(
            service.create_for_user(alice, AddressFields::new("1 High St", "GBR")).await,
            Err(OwnershipError::NotFound)
        ));

        let mut conn = db.pool().acquire().await.unwrap();
        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM postal_addresses")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(rows, 0);
        assert!(OwnerRepository::find_by_user(&mut conn, alice).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_of_one_tuple_yield_one_record() {
        let db = temp_database().await;
        let service = OwnershipService::new(db.clone());
        let mut users = vec![];
        for n in 0..8 {
            let account = service
                .create_account_and_owner(AccountCredentials::new(format!("user{}", n), None))
                .await
                .unwrap();
            users.push(account.id);
        }

        let fields = AddressFields::new("1 Race Rd", "GBR").zip_code("RC1");
        let handles: Vec<_> = users
            .into_iter()
            .map(|user_id| {
                let service = service.clone();
                let fields = fields.clone();
                tokio::spawn(async move { service.create_for_user(user_id, fields).await })
            })
            .collect();

        let (mut created, mut conflicts) = (0, 0);
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(OwnershipError::Conflict { fields, .. }) => {
                    assert_eq!(fields, vec!["address1", "zip_code", "country"]);
                    conflicts += 1;
                }
                Err(other) => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 7);

        let mut conn = db.pool().acquire().await.unwrap();
        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM postal_addresses")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }
}
