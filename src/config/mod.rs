use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: i64,
    pub max_limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
    pub enable_request_logging: bool,
    pub allow_registration: bool,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub session_cookie_name: String,
    pub require_https: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = v.parse().unwrap_or(self.database.busy_timeout_ms);
        }

        // Pagination overrides
        if let Ok(v) = env::var("PAGINATION_DEFAULT_LIMIT") {
            self.pagination.default_limit = v.parse().unwrap_or(self.pagination.default_limit);
        }
        if let Ok(v) = env::var("PAGINATION_MAX_LIMIT") {
            self.pagination.max_limit = v.parse().ok();
        }

        // API overrides
        if let Ok(v) = env::var("ADDRESSBOOK_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_ALLOW_REGISTRATION") {
            self.api.allow_registration = v.parse().unwrap_or(self.api.allow_registration);
        }
        if let Ok(v) = env::var("API_LOG_LEVEL") {
            self.api.log_level = v;
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_SESSION_COOKIE_NAME") {
            self.security.session_cookie_name = v;
        }
        if let Ok(v) = env::var("SECURITY_REQUIRE_HTTPS") {
            self.security.require_https = v.parse().unwrap_or(self.security.require_https);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: "sqlite://addressbook.db".to_string(),
                max_connections: 5,
                connection_timeout: 30,
                busy_timeout_ms: 5_000,
            },
            pagination: PaginationConfig {
                default_limit: 100,
                max_limit: Some(1000),
            },
            api: ApiConfig {
                port: 8000,
                max_request_size_bytes: 1024 * 1024, // 1MB
                enable_request_logging: true,
                allow_registration: true,
                log_level: "debug".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: "development-only-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
                session_cookie_name: "sessionid".to_string(),
                require_https: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: "sqlite://addressbook.db".to_string(),
                max_connections: 10,
                connection_timeout: 10,
                busy_timeout_ms: 5_000,
            },
            pagination: PaginationConfig {
                default_limit: 50,
                max_limit: Some(500),
            },
            api: ApiConfig {
                port: 8000,
                max_request_size_bytes: 256 * 1024,
                enable_request_logging: true,
                allow_registration: true,
                log_level: "info".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                session_cookie_name: "sessionid".to_string(),
                require_https: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: "sqlite://addressbook.db".to_string(),
                max_connections: 20,
                connection_timeout: 5,
                busy_timeout_ms: 2_000,
            },
            pagination: PaginationConfig {
                default_limit: 50,
                max_limit: Some(100),
            },
            api: ApiConfig {
                port: 8000,
                max_request_size_bytes: 64 * 1024,
                enable_request_logging: false,
                allow_registration: false,
                log_level: "info".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                enable_cors: false,
                session_cookie_name: "sessionid".to_string(),
                require_https: true,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.api.allow_registration);
        assert_eq!(config.pagination.max_limit, Some(1000));
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.api.allow_registration);
        assert_eq!(config.pagination.max_limit, Some(100));
        // Production refuses to sign tokens until JWT_SECRET is provided
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.security.require_https);
    }
}
