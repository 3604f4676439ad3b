use std::env;

use thiserror::Error;

/// Errors raised while reading configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Process-wide configuration, read once in `main` and passed explicitly
/// through `AppState`. No global singleton.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub cors_origins: Vec<String>,
    /// Base URL prefixed onto relative asset paths in API responses.
    pub asset_base_url: String,
    pub max_upload_bytes: usize,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Duration strings like "15m" or "7d"; a bare number means seconds.
    pub access_token_ttl: String,
    pub refresh_token_ttl: String,
    pub cookie_domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub admin_email: String,
    /// Sender address for admin notifications.
    pub notifications_from: String,
    /// Sender address for customer-facing order confirmations.
    pub orders_from: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = parse_environment(env::var("APP_ENV").ok().as_deref());

        let port = match env::var("PORT") {
            Ok(v) => v
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value: v })?,
            Err(_) => 4000,
        };

        Ok(Self {
            environment,
            port,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            cors_origins: parse_origins(&optional("CORS_ORIGINS").unwrap_or_default()),
            asset_base_url: optional("BASE_URL").unwrap_or_default(),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            auth: AuthConfig {
                jwt_secret: required("JWT_SECRET")?,
                access_token_ttl: optional("JWT_ACCESS_TOKEN_TTL").unwrap_or_else(|| "15m".into()),
                refresh_token_ttl: optional("JWT_REFRESH_TOKEN_TTL").unwrap_or_else(|| "7d".into()),
                cookie_domain: optional("COOKIE_DOMAIN"),
            },
            storage: StorageConfig {
                bucket: required("AWS_S3_BUCKET")?,
                region: optional("AWS_REGION").unwrap_or_else(|| "eu-north-1".into()),
                endpoint: optional("AWS_S3_ENDPOINT"),
                access_key: optional("AWS_ACCESS_KEY_ID"),
                secret_key: optional("AWS_SECRET_ACCESS_KEY"),
            },
            email: EmailConfig {
                api_url: optional("EMAIL_API_URL")
                    .unwrap_or_else(|| "https://api.resend.com".into()),
                api_key: optional("EMAIL_API_KEY").unwrap_or_default(),
                admin_email: optional("ADMIN_EMAIL").unwrap_or_else(|| "admin@example.com".into()),
                notifications_from: optional("EMAIL_NOTIFICATIONS_FROM")
                    .unwrap_or_else(|| "Store <noreply@example.com>".into()),
                orders_from: optional("EMAIL_ORDERS_FROM")
                    .unwrap_or_else(|| "Store <orders@example.com>".into()),
            },
        })
    }

    pub fn is_dev(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn parse_environment(value: Option<&str>) -> Environment {
    match value {
        Some("production") | Some("prod") => Environment::Production,
        _ => Environment::Development,
    }
}

/// Comma-separated allow-list; empty input yields an empty list.
fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_defaults_to_development() {
        assert_eq!(parse_environment(None), Environment::Development);
        assert_eq!(parse_environment(Some("staging")), Environment::Development);
        assert_eq!(parse_environment(Some("prod")), Environment::Production);
        assert_eq!(parse_environment(Some("production")), Environment::Production);
    }

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        let origins = parse_origins("https://shop.example.com, http://localhost:5173 ,,");
        assert_eq!(
            origins,
            vec!["https://shop.example.com", "http://localhost:5173"]
        );
        assert!(parse_origins("").is_empty());
    }
}
