//! Application settings loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use super::constants::{
    DEFAULT_CACHE_TTL_SECONDS, DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_DATABASE_URL,
    DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_REDIS_URL, DEFAULT_SCOPE_TIMEOUT_SECONDS,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, MAX_JWT_EXPIRATION_HOURS, MIN_JWT_SECRET_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Which repository implementation backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepositoryBackend {
    /// SeaORM entity API
    #[default]
    Orm,
    /// Hand-written SQL statements executed through SeaORM
    Sql,
}

impl FromStr for RepositoryBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "orm" => Ok(RepositoryBackend::Orm),
            "sql" => Ok(RepositoryBackend::Sql),
            other => Err(AppError::validation(format!(
                "REPOSITORY_BACKEND must be 'orm' or 'sql', got '{}'",
                other
            ))),
        }
    }
}

/// Token signing settings handed to the token service at construction.
#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

impl AuthConfig {
    /// Build auth settings, rejecting secrets that are too short.
    pub fn new(jwt_secret: impl Into<String>, token_ttl_hours: i64) -> AppResult<Self> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }
        if !(1..=MAX_JWT_EXPIRATION_HOURS).contains(&token_ttl_hours) {
            return Err(AppError::validation(format!(
                "JWT_EXPIRATION_HOURS must be between 1 and {}",
                MAX_JWT_EXPIRATION_HOURS
            )));
        }

        Ok(Self {
            jwt_secret,
            token_ttl_hours,
        })
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub repository_backend: RepositoryBackend,
    pub redis_url: String,
    pub cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    pub scope_timeout_seconds: u64,
    pub auth: AuthConfig,
    pub server_host: String,
    pub server_port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("repository_backend", &self.repository_backend)
            .field("redis_url", &"[REDACTED]")
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("scope_timeout_seconds", &self.scope_timeout_seconds)
            .field("auth", &self.auth)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `JWT_SECRET` is mandatory in release builds; debug builds fall back to
    /// an insecure development secret with a warning.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            }
            Err(_) => {
                return Err(AppError::validation(
                    "JWT_SECRET environment variable must be set in production",
                ))
            }
        };

        let auth = AuthConfig::new(
            jwt_secret,
            parse_var("JWT_EXPIRATION_HOURS", DEFAULT_JWT_EXPIRATION_HOURS),
        )?;

        let repository_backend = match env::var("REPOSITORY_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => RepositoryBackend::default(),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            ),
            repository_backend,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            cache_enabled: parse_var("CACHE_ENABLED", true),
            cache_ttl_seconds: parse_var("CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS),
            scope_timeout_seconds: parse_var(
                "SCOPE_TIMEOUT_SECONDS",
                DEFAULT_SCOPE_TIMEOUT_SECONDS,
            ),
            auth,
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_var("SERVER_PORT", DEFAULT_SERVER_PORT),
        })
    }

    /// Cache entry lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Deadline applied to each unit of work.
    pub fn scope_timeout(&self) -> Duration {
        Duration::from_secs(self.scope_timeout_seconds)
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_rejects_short_secret() {
        assert!(AuthConfig::new("short", 72).is_err());
        assert!(AuthConfig::new("a-secret-that-is-long-enough-for-hs256", 72).is_ok());
    }

    #[test]
    fn test_auth_config_bounds_token_lifetime() {
        let secret = "a-secret-that-is-long-enough-for-hs256";
        assert!(AuthConfig::new(secret, 0).is_err());
        assert!(AuthConfig::new(secret, MAX_JWT_EXPIRATION_HOURS).is_ok());
        assert!(matches!(
            AuthConfig::new(secret, 10_000_000_000_000_000),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_auth_config_debug_is_redacted() {
        let auth = AuthConfig::new("a-secret-that-is-long-enough-for-hs256", 72).unwrap();
        let printed = format!("{:?}", auth);
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("long-enough"));
    }

    #[test]
    fn test_repository_backend_parsing() {
        assert_eq!("orm".parse::<RepositoryBackend>().unwrap(), RepositoryBackend::Orm);
        assert_eq!("SQL".parse::<RepositoryBackend>().unwrap(), RepositoryBackend::Sql);
        assert!("mongo".parse::<RepositoryBackend>().is_err());
    }
}
