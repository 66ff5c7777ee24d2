use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::{AddressFields, PostalAddress};
use crate::database::{AccountRepository, AddressRepository, OwnerRepository};
use crate::filter::FilterData;
use crate::services::OwnershipService;

#[derive(Subcommand)]
pub enum AddressCommands {
    #[command(about = "List postal addresses")]
    List {
        #[arg(long, help = "Only addresses owned by this user")]
        user: Option<String>,
    },

    #[command(about = "Add a postal address to a user's book")]
    Add {
        #[arg(help = "Owning username")]
        username: String,

        #[arg(long)]
        address1: String,

        #[arg(long)]
        address2: Option<String>,

        #[arg(long)]
        zip_code: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long, help = "ISO 3166-1 alpha-3 country code")]
        country: String,
    },
}

pub async fn handle(cmd: AddressCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let db = connect().await?;

    match cmd {
        AddressCommands::List { user } => {
            let mut conn = db.pool().acquire().await?;
            let ordered = FilterData { order: Some(json!("id")), ..Default::default() };
            let addresses = match user {
                Some(username) => {
                    let account = AccountRepository::find_by_username(&mut conn, &username)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("user '{}' not found", username))?;
                    match OwnerRepository::find_by_user(&mut conn, account.id).await? {
                        Some(owner) => AddressRepository::select_for_owner(&mut conn, owner.id, ordered).await?,
                        None => vec![],
                    }
                }
                None => AddressRepository::select(&mut conn, ordered).await?,
            };

            if addresses.is_empty() {
                return output_empty_collection(&output_format, "addresses", "No addresses");
            }
            print_addresses(&output_format, &addresses)
        }
        AddressCommands::Add { username, address1, address2, zip_code, city, country } => {
            let mut conn = db.pool().acquire().await?;
            let account = AccountRepository::find_by_username(&mut conn, &username)
                .await?
                .ok_or_else(|| anyhow::anyhow!("user '{}' not found", username))?;
            drop(conn);

            let fields = AddressFields { address1, address2, zip_code, city, country };
            let address = OwnershipService::new(db).create_for_user(account.id, fields).await?;
            output_success(
                &output_format,
                &format!("Address {} added for '{}'", address.id, username),
                Some(json!({ "address": address })),
            )
        }
    }
}

fn print_addresses(output_format: &OutputFormat, addresses: &[PostalAddress]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "addresses": addresses }))?);
        }
        OutputFormat::Text => {
            println!("{:<6} {:<30} {:<24} {:<12} {:<16} {}", "ID", "ADDRESS1", "ADDRESS2", "ZIP", "CITY", "COUNTRY");
            println!("{}", "-".repeat(100));
            for a in addresses {
                println!(
                    "{:<6} {:<30} {:<24} {:<12} {:<16} {}",
                    a.id,
                    a.address1,
                    or_dash(&a.address2),
                    or_dash(&a.zip_code),
                    or_dash(&a.city),
                    a.country
                );
            }
        }
    }
    Ok(())
}
