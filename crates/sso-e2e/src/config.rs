//! Configuration loaded from environment variables.
//!
//! The helpers run against a locally started stack, so every URL defaults to
//! the public localhost address a browser would use. Only the values shared
//! with the auth service (signing secret, issuer, audience) are required.

use crate::error::ConfigError;
use std::env;
use std::time::Duration;

/// Public Users service URL, as seen from outside the Docker network.
pub const DEFAULT_USERS_URL: &str = "http://localhost/v1/users";

/// Default WebDriver endpoint (geckodriver / chromedriver / selenium).
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Subject used for service-to-service tokens.
pub const DEFAULT_SERVICE_SUBJECT: &str = "telescope-service";

/// Lifetime of a minted service token.
pub const SERVICE_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

/// Settings used to mint service tokens for the Users service.
#[derive(Clone)]
pub struct ServiceTokenSettings {
    /// Shared HS256 secret.
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub subject: String,
    pub ttl: Duration,
}

impl ServiceTokenSettings {
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            subject: DEFAULT_SERVICE_SUBJECT.to_string(),
            ttl: SERVICE_TOKEN_TTL,
        }
    }
}

impl std::fmt::Debug for ServiceTokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTokenSettings")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("subject", &self.subject)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Everything the helpers need to reach the stack under test.
#[derive(Debug, Clone)]
pub struct E2eConfig {
    /// Users service base URL, without trailing slash.
    pub users_url: String,
    pub service_token: ServiceTokenSettings,
    pub webdriver_url: String,
    /// Ask the browser to run without a window.
    pub headless: bool,
    /// Upper bound for a single navigation wait.
    pub navigation_timeout: Duration,
    /// How often the current URL is polled during a navigation wait.
    pub poll_interval: Duration,
    /// Per-request timeout for Users service calls.
    pub http_timeout: Duration,
}

impl E2eConfig {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first, if present.
    ///
    /// # Required Variables
    ///
    /// - `SECRET` - HS256 secret shared with the auth service
    /// - `JWT_ISSUER` - issuer of service tokens
    /// - `JWT_AUDIENCE` - audience of service tokens
    ///
    /// # Optional Variables
    ///
    /// - `USERS_URL` (default: `http://localhost/v1/users`)
    /// - `SERVICE_TOKEN_SUBJECT` (default: `telescope-service`)
    /// - `WEBDRIVER_URL` (default: `http://localhost:4444`)
    /// - `HEADLESS` (default: true)
    /// - `NAVIGATION_TIMEOUT_MS` (default: 30000)
    /// - `HTTP_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &str| -> Result<String, ConfigError> {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(var.to_string()))
        };

        let secret = required("SECRET")?;
        let issuer = required("JWT_ISSUER")?;
        let audience = required("JWT_AUDIENCE")?;

        let mut service_token = ServiceTokenSettings::new(secret, issuer, audience);
        if let Some(subject) = lookup("SERVICE_TOKEN_SUBJECT") {
            service_token.subject = subject;
        }

        let users_url = lookup("USERS_URL").unwrap_or_else(|| DEFAULT_USERS_URL.to_string());
        validate_http_url("USERS_URL", &users_url)?;

        let webdriver_url =
            lookup("WEBDRIVER_URL").unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string());
        validate_http_url("WEBDRIVER_URL", &webdriver_url)?;

        let headless = parse_bool(&lookup, "HEADLESS", true)?;
        let navigation_timeout_ms = parse_u64(&lookup, "NAVIGATION_TIMEOUT_MS", 30_000)?;
        let http_timeout_secs = parse_u64(&lookup, "HTTP_TIMEOUT_SECS", 10)?;

        Ok(Self {
            users_url: users_url.trim_end_matches('/').to_string(),
            service_token,
            webdriver_url,
            headless,
            navigation_timeout: Duration::from_millis(navigation_timeout_ms),
            poll_interval: Duration::from_millis(100),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}

fn parse_u64<F>(lookup: &F, var: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected a non-negative integer, got {raw:?}"),
        }),
    }
}

fn parse_bool<F>(lookup: &F, var: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected a boolean, got {raw:?}"),
        }),
    }
}

fn validate_http_url(var: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        var: var.to_string(),
        message: format!("invalid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("unsupported scheme {:?}", parsed.scheme()),
        });
    }
    Ok(())
}
