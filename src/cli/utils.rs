use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config;
use crate::database::DatabaseManager;

/// Open the configured database and make sure the schema exists
pub async fn connect() -> anyhow::Result<DatabaseManager> {
    let db = DatabaseManager::connect(&config::config().database).await?;
    db.migrate().await?;
    Ok(db)
}

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(Value::Object(extra)) = data {
                if let Some(map) = response.as_object_mut() {
                    map.extend(extra);
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: [] }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Render an optional column for text tables
pub fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}
