//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_BASE_URL` - Public URL of the dashboard (used for notification click links)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `CLEANUP_HOUR_UTC` - Hour of day (0-23, UTC) for the stale device sweep (default: 3)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)
//!
//! ## Optional (FCM - enables push notifications)
//! - `FCM_PROJECT_ID` - Firebase project ID
//! - `FCM_ACCESS_TOKEN` - OAuth2 bearer token for the FCM HTTP v1 API
//! - `FCM_VAPID_PUBLIC_KEY` - Web push VAPID public key handed to browsers
//!
//! The three FCM variables must be set together or not at all.

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Firebase Cloud Messaging configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct FcmConfig {
    /// Firebase project ID (part of the send URL).
    pub project_id: String,
    /// Bearer token for the HTTP v1 API.
    pub access_token: SecretString,
    /// Public VAPID key browsers need to obtain a token.
    pub vapid_public_key: String,
}

impl std::fmt::Debug for FcmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcmConfig")
            .field("project_id", &self.project_id)
            .field("access_token", &"[REDACTED]")
            .field("vapid_public_key", &self.vapid_public_key)
            .finish()
    }
}

impl FcmConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_parts(
            get_optional_env("FCM_PROJECT_ID"),
            get_optional_env("FCM_ACCESS_TOKEN"),
            get_optional_env("FCM_VAPID_PUBLIC_KEY"),
        )
    }

    fn from_parts(
        project_id: Option<String>,
        access_token: Option<String>,
        vapid_public_key: Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        match (project_id, access_token, vapid_public_key) {
            (Some(project_id), Some(token), Some(vapid_public_key)) => {
                validate_secret_strength(&token, "FCM_ACCESS_TOKEN")?;
                Ok(Some(Self {
                    project_id,
                    access_token: SecretString::from(token),
                    vapid_public_key,
                }))
            }
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "FCM_*".to_string(),
                "FCM_PROJECT_ID, FCM_ACCESS_TOKEN and FCM_VAPID_PUBLIC_KEY must be set together"
                    .to_string(),
            )),
        }
    }
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the dashboard
    pub base_url: String,
    /// Hour of day (UTC) at which stale devices are swept
    pub cleanup_hour_utc: u32,
    /// Push delivery settings; `None` disables push
    pub fcm: Option<FcmConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors reported to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the FCM variables are only partially set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = parse_env("ADMIN_HOST", "127.0.0.1")?;
        let port = parse_env("ADMIN_PORT", "3001")?;
        let cleanup_hour_utc = parse_cleanup_hour(&get_env_or_default("CLEANUP_HOUR_UTC", "3"))?;

        let fcm = FcmConfig::from_env()?;
        if fcm.is_none() {
            tracing::warn!("FCM not configured; push notifications are disabled");
        }
        let base_url = parse_base_url(&get_required_env("ADMIN_BASE_URL")?, fcm.is_some())?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            cleanup_hour_utc,
            fcm,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Get the push configuration, if push is enabled.
    #[must_use]
    pub const fn fcm(&self) -> Option<&FcmConfig> {
        self.fcm.as_ref()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate the dashboard URL. FCM rejects web push click links that are not
/// HTTPS, so `https` is required once push is enabled.
fn parse_base_url(raw: &str, push_enabled: bool) -> Result<String, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("ADMIN_BASE_URL".to_string(), msg);
    let url = url::Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if push_enabled && url.scheme() != "https" {
        return Err(invalid(format!(
            "must use https when push is enabled (got {})",
            url.scheme()
        )));
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

/// Parse an hour of day in `0..=23`.
fn parse_cleanup_hour(raw: &str) -> Result<u32, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("CLEANUP_HOUR_UTC".to_string(), msg);
    let hour = raw.trim().parse::<u32>().map_err(|e| invalid(e.to_string()))?;
    if hour > 23 {
        return Err(invalid(format!("hour must be 0-23 (got {hour})")));
    }
    Ok(hour)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq = std::collections::HashMap::<char, usize>::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject tokens that are obviously not real credentials.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }
    Ok(())
}
