//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `SDCART_API_URL` - Backend origin (default: `https://sdcart-backend-1.onrender.com`)
//! - `SDCART_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `SDCART_CATALOG_CACHE_TTL_SECS` - Catalog cache time-to-live (default: 300)
//! - `SDCART_CATALOG_CACHE_CAPACITY` - Maximum cached catalog entries (default: 1000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (e.g., production, staging)

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Production backend origin.
pub const DEFAULT_API_URL: &str = "https://sdcart-backend-1.onrender.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin that API paths are joined onto
    pub api_url: Url,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
    /// Catalog response cache settings
    pub catalog_cache: CatalogCacheConfig,
    /// Error tracking settings
    pub sentry: SentryConfig,
}

/// In-memory cache settings for catalog reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCacheConfig {
    /// How long a cached product or listing stays fresh
    pub ttl: Duration,
    /// Maximum number of cached entries
    pub capacity: u64,
}

impl Default for CatalogCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when absent
    pub dsn: Option<String>,
    /// Environment tag attached to events
    pub environment: Option<String>,
}

impl ClientConfig {
    /// Create a configuration for the given backend origin with default
    /// timeouts and cache settings.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            catalog_cache: CatalogCacheConfig::default(),
            sentry: SentryConfig::default(),
        }
    }

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

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = parse_api_url(
            &lookup("SDCART_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )?;

        let timeout_secs =
            parse_or_default(&lookup, "SDCART_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SDCART_REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let catalog_cache = CatalogCacheConfig {
            ttl: Duration::from_secs(parse_or_default(
                &lookup,
                "SDCART_CATALOG_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            capacity: parse_or_default(
                &lookup,
                "SDCART_CATALOG_CACHE_CAPACITY",
                DEFAULT_CACHE_CAPACITY,
            )?,
        };

        let sentry = SentryConfig {
            dsn: non_empty(lookup("SENTRY_DSN")),
            environment: non_empty(lookup("SENTRY_ENVIRONMENT")),
        };

        Ok(Self {
            api_url,
            request_timeout: Duration::from_secs(timeout_secs),
            catalog_cache,
            sentry,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and validate the backend origin.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("SDCART_API_URL".to_string(), reason);

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("must have a host".to_string()));
    }
    Ok(url)
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup(key)) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Treat empty strings as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.api_url.as_str(), "https://sdcart-backend-1.onrender.com/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.catalog_cache, CatalogCacheConfig::default());
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("SDCART_API_URL", "http://127.0.0.1:8080"),
            ("SDCART_REQUEST_TIMEOUT_SECS", "5"),
            ("SDCART_CATALOG_CACHE_TTL_SECS", "60"),
            ("SDCART_CATALOG_CACHE_CAPACITY", "10"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ]))
        .unwrap();

        assert_eq!(config.api_url.port(), Some(8080));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.catalog_cache.ttl, Duration::from_secs(60));
        assert_eq!(config.catalog_cache.capacity, 10);
        assert_eq!(config.sentry.environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[("SDCART_API_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "SDCART_API_URL"));

        let err =
            ClientConfig::from_lookup(lookup_from(&[("SDCART_API_URL", "ftp://files.example")]))
                .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let err =
            ClientConfig::from_lookup(lookup_from(&[("SDCART_REQUEST_TIMEOUT_SECS", "soon")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));

        let err =
            ClientConfig::from_lookup(lookup_from(&[("SDCART_REQUEST_TIMEOUT_SECS", "0")]))
                .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("SENTRY_DSN", "  "),
            ("SDCART_CATALOG_CACHE_CAPACITY", ""),
        ]))
        .unwrap();

        assert!(config.sentry.dsn.is_none());
        assert_eq!(config.catalog_cache.capacity, 1000);
    }
}
