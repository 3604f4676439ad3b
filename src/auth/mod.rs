use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Access/refresh token pair sharing the same `{sub}` payload. The refresh
/// token is additionally stored in an HTTP-only cookie by the auth handlers.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Invalid or expired token")]
    InvalidToken,
}

/// Issues a fresh access/refresh pair for the user. Called on register,
/// login, and refresh alike (refresh rotates both tokens).
pub fn issue_token_pair(config: &AuthConfig, user_id: Uuid) -> Result<TokenPair, AuthError> {
    let access_token = sign(config, user_id, ttl_to_duration(&config.access_token_ttl))?;
    let refresh_token = sign(config, user_id, ttl_to_duration(&config.refresh_token_ttl))?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

fn sign(config: &AuthConfig, user_id: Uuid, ttl: Duration) -> Result<String, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verifies signature and expiry and returns the claims.
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|_| AuthError::InvalidToken)?;

    Ok(token_data.claims)
}

/// Converts a duration string like `"15m"` or `"7d"` into a duration.
/// A bare number is treated as seconds.
pub fn ttl_to_duration(value: &str) -> Duration {
    let trimmed = value.trim();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    let amount: i64 = digits.parse().unwrap_or(0);

    match trimmed[digits.len()..].trim() {
        "m" => Duration::minutes(amount),
        "h" => Duration::hours(amount),
        "d" => Duration::days(amount),
        "w" => Duration::weeks(amount),
        _ => Duration::seconds(amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl: "15m".to_string(),
            refresh_token_ttl: "7d".to_string(),
            cookie_domain: None,
        }
    }

    #[test]
    fn duration_strings_convert_to_expected_lengths() {
        assert_eq!(ttl_to_duration("30s").num_milliseconds(), 30_000);
        assert_eq!(ttl_to_duration("15m").num_minutes(), 15);
        assert_eq!(ttl_to_duration("2h").num_hours(), 2);
        assert_eq!(ttl_to_duration("7d").num_days(), 7);
        assert_eq!(ttl_to_duration("1w").num_days(), 7);
        // bare number means seconds
        assert_eq!(ttl_to_duration("90").num_seconds(), 90);
    }

    #[test]
    fn issued_tokens_verify_and_carry_the_user_id() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let pair = issue_token_pair(&config, user_id).unwrap();
        let access = verify_token(&config, &pair.access_token).unwrap();
        let refresh = verify_token(&config, &pair.refresh_token).unwrap();

        assert_eq!(access.sub, user_id);
        assert_eq!(refresh.sub, user_id);
        // refresh outlives access
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let config = test_config();
        let pair = issue_token_pair(&config, Uuid::new_v4()).unwrap();

        let mut forged = pair.access_token.clone();
        forged.push('x');
        assert!(matches!(
            verify_token(&config, &forged),
            Err(AuthError::InvalidToken)
        ));

        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..test_config()
        };
        assert!(matches!(
            verify_token(&other, &pair.access_token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn empty_secret_is_refused() {
        let config = AuthConfig {
            jwt_secret: String::new(),
            ..test_config()
        };
        assert!(matches!(
            issue_token_pair(&config, Uuid::new_v4()),
            Err(AuthError::MissingSecret)
        ));
    }
}
