//! JWT issuing and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::{Account, Role};
use crate::errors::{AppError, AppResult};

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn role(&self) -> Role {
        Role::from(self.role.as_str())
    }
}

/// Token response returned after successful authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Signs and checks HS256 tokens with the secret it was built with.
#[derive(Clone, Debug)]
pub struct TokenService {
    config: AuthConfig,
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issue an access token for `account`.
    pub fn issue(&self, account: &Account) -> AppResult<TokenResponse> {
        let ttl_hours = self.config.token_ttl_hours;
        let now = Utc::now();
        let out_of_range =
            || AppError::internal(format!("Token lifetime of {}h is out of range", ttl_hours));

        let expires_at = Duration::try_hours(ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(out_of_range)?;
        let expires_in = ttl_hours
            .checked_mul(SECONDS_PER_HOUR)
            .ok_or_else(out_of_range)?;

        let claims = Claims {
            sub: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret_bytes()),
        )
        .map_err(|e| AppError::internal(format!("Token signing failed: {}", e)))?;

        Ok(TokenResponse {
            access_token: token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in,
        })
    }

    /// Check signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            AppError::Unauthenticated
        })?;

        Ok(token_data.claims)
    }
}
