use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::AccountCredentials;
use crate::database::AccountRepository;
use crate::services::OwnershipService;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List accounts")]
    List,

    #[command(about = "Create an account with an empty address book")]
    Create {
        #[arg(help = "Username")]
        username: String,

        #[arg(long, help = "Password (omit for an account that cannot log in)")]
        password: Option<String>,
    },

    #[command(about = "Delete an account; addresses nobody else owns are deleted too")]
    Delete {
        #[arg(help = "Username")]
        username: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let db = connect().await?;

    match cmd {
        UserCommands::List => {
            let mut conn = db.pool().acquire().await?;
            let accounts = AccountRepository::list(&mut conn).await?;
            if accounts.is_empty() {
                return output_empty_collection(&output_format, "users", "No users");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "users": accounts }))?);
                }
                OutputFormat::Text => {
                    println!("{:<6} {:<30} {:<8} {}", "ID", "USERNAME", "LOGIN", "JOINED");
                    println!("{}", "-".repeat(70));
                    for account in &accounts {
                        let login = if account.has_usable_password() { "yes" } else { "no" };
                        println!(
                            "{:<6} {:<30} {:<8} {}",
                            account.id,
                            account.username,
                            login,
                            account.date_joined.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
            Ok(())
        }
        UserCommands::Create { username, password } => {
            let account = OwnershipService::new(db)
                .create_account_and_owner(AccountCredentials::new(username, password))
                .await?;
            output_success(
                &output_format,
                &format!("User '{}' created", account.username),
                Some(json!({ "user": account })),
            )
        }
        UserCommands::Delete { username } => {
            let mut conn = db.pool().acquire().await?;
            let account = AccountRepository::find_by_username(&mut conn, &username)
                .await?
                .ok_or_else(|| anyhow::anyhow!("user '{}' not found", username))?;
            drop(conn);

            let outcomes = OwnershipService::new(db).delete_account(account.id).await?;
            let deleted: Vec<i64> = outcomes.iter().filter(|o| o.deleted).map(|o| o.address_id).collect();
            output_success(
                &output_format,
                &format!("User '{}' deleted ({} addresses removed)", username, deleted.len()),
                Some(json!({ "deleted_addresses": deleted })),
            )
        }
    }
}
