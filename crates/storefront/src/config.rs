//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; the cart works fully offline with defaults.
//!
//! - `DUKICKS_APP_NAME` - Brand name shown in logs and Sentry (default: DUKICKS)
//! - `DUKICKS_CURRENCY` - ISO 4217 currency for price labels (default: MXN)
//! - `DUKICKS_CART_NAMESPACE` - Local storage key for the anonymous cart (default: `dukicks_cart`)
//! - `DUKICKS_DATA_DIR` - Directory for the file-backed local store (default: in-memory)
//! - `DUKICKS_DATABASE_URL` - `PostgreSQL` URL for cart documents and products
//!   (falls back to `DATABASE_URL`)
//! - `DUKICKS_REMOTE_WRITE_RETRIES` - Extra attempts for a failed remote cart write (default: 0, max: 5)
//! - `DUKICKS_REMOTE_RETRY_BACKOFF_MS` - Delay between remote write attempts (default: 250)
//! - `DUKICKS_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use dukicks_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;

/// Default local storage key for the anonymous cart.
pub const DEFAULT_CART_NAMESPACE: &str = "dukicks_cart";

const MAX_REMOTE_WRITE_RETRIES: u32 = 5;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront library configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Brand name
    pub app_name: String,
    /// Currency used for price labels
    pub currency: CurrencyCode,
    /// Cart persistence settings
    pub cart: CartConfig,
    /// `PostgreSQL` URL for remote cart documents and the product table
    pub database_url: Option<SecretString>,
    /// Catalog cache lifetime
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Cart persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Key the anonymous cart is stored under
    pub namespace: String,
    /// Directory for the file-backed key-value store; `None` keeps it in memory
    pub data_dir: Option<PathBuf>,
    /// Extra attempts after a failed remote write
    pub remote_write_retries: u32,
    /// Delay between remote write attempts
    pub remote_retry_backoff: Duration,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_CART_NAMESPACE.to_string(),
            data_dir: None,
            remote_write_retries: 0,
            remote_retry_backoff: Duration::from_millis(250),
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            app_name: "DUKICKS".to_string(),
            currency: CurrencyCode::default(),
            cart: CartConfig::default(),
            database_url: None,
            catalog_cache_ttl: Duration::from_secs(300),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let currency = get_env_or_default("DUKICKS_CURRENCY", "MXN")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("DUKICKS_CURRENCY".to_string(), e))?;

        let catalog_cache_ttl =
            Duration::from_secs(get_parsed_or_default("DUKICKS_CATALOG_CACHE_TTL_SECS", 300)?);

        Ok(Self {
            app_name: get_env_or_default("DUKICKS_APP_NAME", "DUKICKS"),
            currency,
            cart: CartConfig::from_env()?,
            database_url: get_database_url("DUKICKS_DATABASE_URL"),
            catalog_cache_ttl,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// The database URL, or an error naming the variable to set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when no database is configured.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DUKICKS_DATABASE_URL".to_string()))
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let namespace = get_env_or_default("DUKICKS_CART_NAMESPACE", DEFAULT_CART_NAMESPACE);
        if namespace.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "DUKICKS_CART_NAMESPACE".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let remote_write_retries = get_parsed_or_default("DUKICKS_REMOTE_WRITE_RETRIES", 0u32)?;
        if remote_write_retries > MAX_REMOTE_WRITE_RETRIES {
            return Err(ConfigError::InvalidEnvVar(
                "DUKICKS_REMOTE_WRITE_RETRIES".to_string(),
                format!("must be at most {MAX_REMOTE_WRITE_RETRIES} (got {remote_write_retries})"),
            ));
        }

        Ok(Self {
            namespace,
            data_dir: get_optional_env("DUKICKS_DATA_DIR").map(PathBuf::from),
            remote_write_retries,
            remote_retry_backoff: Duration::from_millis(get_parsed_or_default(
                "DUKICKS_REMOTE_RETRY_BACKOFF_MS",
                250,
            )?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.app_name, "DUKICKS");
        assert_eq!(config.currency, CurrencyCode::MXN);
        assert_eq!(config.cart.namespace, "dukicks_cart");
        assert_eq!(config.cart.remote_write_retries, 0);
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_parse_value() {
        let retries: u32 = parse_value("TEST_VAR", " 3 ").unwrap();
        assert_eq!(retries, 3);

        let err = parse_value::<u32>("TEST_VAR", "three").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "TEST_VAR"));
    }

    #[test]
    fn test_require_database_url() {
        let config = StorefrontConfig::default();
        let err = config.require_database_url().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variable: DUKICKS_DATABASE_URL"
        );

        let config = StorefrontConfig {
            database_url: Some(SecretString::from("postgres://localhost/dukicks")),
            ..StorefrontConfig::default()
        };
        assert!(config.require_database_url().is_ok());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = StorefrontConfig {
            database_url: Some(SecretString::from("postgres://user:hunter2@db/dukicks")),
            ..StorefrontConfig::default()
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("DUKICKS"));
        assert!(!debug_output.contains("hunter2"));
    }
}
