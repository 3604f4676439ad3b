//! Registration, login, and refresh-token rotation.

use std::collections::HashMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{self, TokenPair};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

pub const REFRESH_COOKIE: &str = "refreshToken";

/// Login and registration share the same credential shape.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl CredentialsRequest {
    /// Reports every failing field at once rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut field_errors = HashMap::new();

        if !looks_like_email(&self.email) {
            field_errors.insert("email".to_string(), "Must be a valid email".to_string());
        }
        if self.password.len() < 8 {
            field_errors.insert(
                "password".to_string(),
                "Must be at least 8 characters".to_string(),
            );
        }

        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(
                "Validation failed",
                Some(field_errors),
            ))
        }
    }
}

pub(crate) fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

pub async fn register(
    state: &AppState,
    request: &CredentialsRequest,
) -> Result<(User, TokenPair), ApiError> {
    request.validate()?;

    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&request.email)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("User already exists"));
    }

    let password_hash = hash_password(&request.password)?;
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING *",
    )
    .bind(&request.email)
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await?;

    let tokens = auth::issue_token_pair(&state.config.auth, user.id)?;
    Ok((user, tokens))
}

pub async fn login(
    state: &AppState,
    request: &CredentialsRequest,
) -> Result<(User, TokenPair), ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&request.email)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(invalid_credentials());
    }

    let tokens = auth::issue_token_pair(&state.config.auth, user.id)?;
    Ok((user, tokens))
}

/// Verifies the refresh token, re-resolves the user, and rotates both tokens.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<(User, TokenPair), ApiError> {
    let claims = auth::verify_token(&state.config.auth, refresh_token)?;
    let user = find_user(state, claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    let tokens = auth::issue_token_pair(&state.config.auth, user.id)?;
    Ok((user, tokens))
}

pub async fn find_user(state: &AppState, user_id: Uuid) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?;
    Ok(user)
}

// Unknown email and wrong password return the same message so the response
// does not reveal which accounts exist.
fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid email or password")
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::internal_server_error("Failed to process credentials")
        })
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// HTTP-only refresh cookie. Development runs cross-site against a local
/// frontend, so it gets `SameSite=None` without `Secure`; production uses
/// `Secure` with `SameSite=Lax`.
pub fn refresh_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    let max_age = auth::ttl_to_duration(&config.auth.refresh_token_ttl);
    let mut builder = Cookie::build((REFRESH_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(!config.is_dev())
        .same_site(if config.is_dev() {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .max_age(time::Duration::seconds(max_age.num_seconds()));

    if let Some(domain) = &config.auth.cookie_domain {
        builder = builder.domain(domain.clone());
    }

    builder.build()
}

/// Expired clone of the refresh cookie, used to clear it on logout.
pub fn removal_cookie(config: &AppConfig) -> Cookie<'static> {
    let mut cookie = refresh_cookie(config, String::new());
    cookie.set_max_age(time::Duration::ZERO);
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_validation_reports_all_failing_fields() {
        let request = CredentialsRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };

        let err = request.validate().unwrap_err();
        match err {
            ApiError::ValidationError { field_errors, .. } => {
                let fields = field_errors.unwrap();
                assert_eq!(fields.len(), 2);
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("password"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_credentials_pass() {
        let request = CredentialsRequest {
            email: "admin@example.com".to_string(),
            password: "long-enough-password".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn email_shape_checks() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("plainaddress"));
        assert!(!looks_like_email("@missing-local.com"));
        assert!(!looks_like_email("user@nodot"));
    }

    #[test]
    fn password_hashes_verify_and_are_salted() {
        let hash_a = hash_password("correct horse battery").unwrap();
        let hash_b = hash_password("correct horse battery").unwrap();

        // random salts produce distinct hashes
        assert_ne!(hash_a, hash_b);
        assert!(verify_password("correct horse battery", &hash_a));
        assert!(verify_password("correct horse battery", &hash_b));
        assert!(!verify_password("wrong password", &hash_a));
        assert!(!verify_password("correct horse battery", "not-a-phc-string"));
    }

    #[test]
    fn refresh_cookie_attributes_follow_environment() {
        let mut config = crate::config::AppConfig {
            environment: crate::config::Environment::Development,
            port: 4000,
            database_url: String::new(),
            database_max_connections: 10,
            cors_origins: vec![],
            asset_base_url: String::new(),
            max_upload_bytes: 1024,
            auth: crate::config::AuthConfig {
                jwt_secret: "secret".to_string(),
                access_token_ttl: "15m".to_string(),
                refresh_token_ttl: "7d".to_string(),
                cookie_domain: None,
            },
            storage: crate::config::StorageConfig {
                bucket: "b".to_string(),
                region: "r".to_string(),
                endpoint: None,
                access_key: None,
                secret_key: None,
            },
            email: crate::config::EmailConfig {
                api_url: String::new(),
                api_key: String::new(),
                admin_email: String::new(),
                notifications_from: String::new(),
                orders_from: String::new(),
            },
        };

        let dev = refresh_cookie(&config, "token".to_string());
        assert_eq!(dev.name(), REFRESH_COOKIE);
        assert_eq!(dev.http_only(), Some(true));
        assert_eq!(dev.secure(), Some(false));
        assert_eq!(dev.same_site(), Some(SameSite::None));
        assert_eq!(
            dev.max_age(),
            Some(time::Duration::seconds(7 * 24 * 3600))
        );

        config.environment = crate::config::Environment::Production;
        let prod = refresh_cookie(&config, "token".to_string());
        assert_eq!(prod.secure(), Some(true));
        assert_eq!(prod.same_site(), Some(SameSite::Lax));

        let removal = removal_cookie(&config);
        assert_eq!(removal.max_age(), Some(time::Duration::ZERO));
    }
}
