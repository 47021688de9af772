//! Backend client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TARIMAS_API_URL` - Base URL of the inventory REST backend
//!
//! ## Optional
//! - `TARIMAS_API_TOKEN` - Bearer token sent with every request
//! - `TARIMAS_CACHE_TTL_SECS` - Read cache time-to-live (default: 300)
//! - `TARIMAS_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `TARIMAS_EVOLUTION_DAYS` - Width of the default evolution window (default: 30)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Inventory backend configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct InventoryConfig {
    /// Base URL; endpoint paths are joined onto it.
    pub api_url: Url,
    /// Bearer token, if the backend requires one
    pub api_token: Option<SecretString>,
    /// How long bulk and evolution reads stay cached
    pub cache_ttl: Duration,
    /// Timeout for a single HTTP request
    pub http_timeout: Duration,
    /// Default evolution window width, in days
    pub evolution_days: u64,
}

impl std::fmt::Debug for InventoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("cache_ttl", &self.cache_ttl)
            .field("http_timeout", &self.http_timeout)
            .field("evolution_days", &self.evolution_days)
            .finish()
    }
}

impl InventoryConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = get_required_env(&lookup, "TARIMAS_API_URL")?;
        let api_url = parse_base_url(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("TARIMAS_API_URL".to_string(), e))?;

        let api_token = lookup("TARIMAS_API_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .map(SecretString::from);

        Ok(Self {
            api_url,
            api_token,
            cache_ttl: Duration::from_secs(get_u64_or_default(
                &lookup,
                "TARIMAS_CACHE_TTL_SECS",
                300,
            )?),
            http_timeout: Duration::from_secs(get_u64_or_default(
                &lookup,
                "TARIMAS_HTTP_TIMEOUT_SECS",
                30,
            )?),
            evolution_days: get_u64_or_default(&lookup, "TARIMAS_EVOLUTION_DAYS", 30)?,
        })
    }

    /// Configuration pointing at `api_url` with every default applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not a valid
    /// HTTP(S) URL.
    pub fn for_url(api_url: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| (key == "TARIMAS_API_URL").then(|| api_url.to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required_env<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a positive integer variable with a default value.
fn get_u64_or_default<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Parse the base URL, making sure relative joins keep its path.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
