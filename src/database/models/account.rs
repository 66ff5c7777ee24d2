use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const USERNAME_MAX_LEN: usize = 150;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl Account {
    pub fn has_usable_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// The address-book side of an account: owns a set of postal addresses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AddressUser {
    pub id: i64,
    pub user_id: i64,
}

/// Input for account creation. A missing password leaves the account unusable for login.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountCredentials {
    pub username: String,
    pub password: Option<String>,
}

impl AccountCredentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self { username: username.into(), password }
    }

    pub fn validate_username(&self) -> Result<(), String> {
        let username = &self.username;
        if username.is_empty() {
            return Err("This field may not be blank.".to_string());
        }
        if username.chars().count() > USERNAME_MAX_LEN {
            return Err(format!("Ensure this field has no more than {} characters.", USERNAME_MAX_LEN));
        }
        if !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c)) {
            return Err("Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(AccountCredentials::new("bob.smith+1@example", None).validate_username().is_ok());
        assert!(AccountCredentials::new("", None).validate_username().is_err());
        assert!(AccountCredentials::new("bob smith", None).validate_username().is_err());
        assert!(AccountCredentials::new("x".repeat(151), None).validate_username().is_err());
    }
}
