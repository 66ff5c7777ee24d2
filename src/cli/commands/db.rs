use serde::Serialize;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::models::{AccountCredentials, AddressFields};
use crate::database::{AccountRepository, AddressRepository, DatabaseManager};
use crate::services::OwnershipService;

/// Development fixture: two users with private addresses, one address they share, a user
/// with no addresses and an address with no users.
const FIXTURE_USERS: [(&str, Option<&str>); 3] = [
    ("testuser1", Some("notarealpassword")),
    ("testuser2", None),
    ("testuser3Unassociated", None),
];

#[derive(Debug, Default, Serialize)]
pub struct SeedReport {
    pub users_created: usize,
    pub addresses_created: usize,
    pub links_created: usize,
}

pub async fn migrate(output_format: OutputFormat) -> anyhow::Result<()> {
    let db = DatabaseManager::connect(&config::config().database).await?;
    db.migrate().await?;
    output_success(
        &output_format,
        "Database schema is up to date",
        Some(json!({ "database": config::config().database.url })),
    )
}

pub async fn seed(output_format: OutputFormat) -> anyhow::Result<()> {
    let db = connect().await?;
    let report = load_fixture(&db).await?;
    output_success(
        &output_format,
        &format!(
            "Fixture loaded: {} users, {} addresses, {} links created",
            report.users_created, report.addresses_created, report.links_created
        ),
        Some(json!({ "report": report })),
    )
}

pub async fn load_fixture(db: &DatabaseManager) -> anyhow::Result<SeedReport> {
    let ownership = OwnershipService::new(db.clone());
    let mut report = SeedReport::default();

    let mut user_ids = Vec::new();
    for (username, password) in FIXTURE_USERS {
        let mut conn = db.pool().acquire().await?;
        let existing = AccountRepository::find_by_username(&mut conn, username).await?;
        drop(conn);
        let account = match existing {
            Some(account) => account,
            None => {
                report.users_created += 1;
                ownership
                    .create_account_and_owner(AccountCredentials::new(username, password.map(String::from)))
                    .await?
            }
        };
        user_ids.push(account.id);
    }
    let (user1, user2) = (user_ids[0], user_ids[1]);

    let links: [(AddressFields, &[i64]); 6] = [
        (
            AddressFields::new("25 SomeDay Road", "GBR").address2("testuser1only").zip_code("728wye").city("London"),
            &[user1],
        ),
        (
            AddressFields::new("14 SomeDay Road", "GBR").address2("testuser1only").zip_code("728wye").city("London"),
            &[user1],
        ),
        (
            AddressFields::new("64 SomeDay Road", "GBR").address2("testuser2only").zip_code("22kss").city("York"),
            &[user2],
        ),
        (
            AddressFields::new("54 Askel road", "GBR").address2("testuser2only").zip_code("fds0l2").city("York"),
            &[user2],
        ),
        (
            AddressFields::new("Our Coworking space", "GBR")
                .address2("testuser1andtestuser2")
                .zip_code("reqaw2")
                .city("Cambridge"),
            &[user1, user2],
        ),
        (
            AddressFields::new("903 Keeton", "GBR").address2("NoAssociatedUsers").zip_code("wqew").city("Manchester"),
            &[],
        ),
    ];

    for (fields, owners) in links {
        let mut tx = db.begin_write().await?;
        let (address, created) = AddressRepository::find_or_create(&mut tx, &fields).await?;
        tx.commit().await?;
        if created {
            report.addresses_created += 1;
        }
        for owner in owners {
            if ownership.attach_existing(*owner, address.id).await? {
                report.links_created += 1;
            }
        }
    }

    tracing::info!("Fixture loaded: {:?}", report);
    Ok(report)
}
