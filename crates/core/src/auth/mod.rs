//! Admin token authentication.
//!
//! Login exchanges the configured admin credentials for an HMAC-SHA-256
//! JWT with subject `superuser` and a bounded lifetime; mutating endpoints
//! validate that token.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const VALID_SUBJECT: &str = "superuser";

/// Errors for token operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and validates admin tokens.
pub struct JwtAuthenticator {
    admin_user: String,
    admin_password: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtAuthenticator {
    pub fn new(admin_user: &str, admin_password: &str, secret: &str, ttl: Duration) -> Self {
        Self {
            admin_user: admin_user.to_string(),
            admin_password: admin_password.to_string(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Exchange credentials for a signed token.
    pub fn create_token(&self, name: &str, password: &str) -> Result<String, AuthError> {
        if name != self.admin_user || password != self.admin_password {
            return Err(AuthError::InvalidCredentials);
        }

        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: VALID_SUBJECT.to_string(),
            iat,
            exp: iat + self.ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Check the signature, expiry and subject of a presented token.
    pub fn validate_token(&self, token: &str) -> Result<(), AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.sub = Some(VALID_SUBJECT.to_string());
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|_| ())
            .map_err(|_| AuthError::InvalidCredentials)
    }
}
