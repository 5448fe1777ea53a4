use crate::error::{config_error, env_error, OrganiserResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default address of the organiser web service
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
/// Default path under which the event endpoints live
pub const DEFAULT_API_PREFIX: &str = "/organiser/api/events/";
/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Default lifetime of a notification toast in milliseconds
pub const DEFAULT_NOTIFICATION_TTL_MS: u64 = 3000;
/// Optional settings file, relative to the working directory
pub const CONFIG_FILE: &str = "config/organiser.toml";

/// Main configuration structure for the organiser client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the organiser web service
    pub base_url: String,
    /// Path prefix of the event endpoints
    pub api_prefix: String,
    /// CSRF token handed out by the hosting page, sent on every mutating request
    pub csrf_token: String,
    /// Timeout for a single request
    pub request_timeout_secs: u64,
    /// How long a notification stays visible
    pub notification_ttl_ms: u64,
}

/// Non-secret overrides read from `config/organiser.toml`
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    base_url: Option<String>,
    api_prefix: Option<String>,
    request_timeout_secs: Option<u64>,
    notification_ttl_ms: Option<u64>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> OrganiserResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let csrf_token =
            env::var("ORGANISER_CSRF_TOKEN").map_err(|_| env_error("ORGANISER_CSRF_TOKEN"))?;

        let base_url =
            env::var("ORGANISER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let api_prefix =
            env::var("ORGANISER_API_PREFIX").unwrap_or_else(|_| DEFAULT_API_PREFIX.to_string());

        let request_timeout_secs =
            parse_env_u64("ORGANISER_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let notification_ttl_ms =
            parse_env_u64("ORGANISER_NOTIFICATION_TTL_MS", DEFAULT_NOTIFICATION_TTL_MS)?;

        let mut config = Config {
            base_url,
            api_prefix,
            csrf_token,
            request_timeout_secs,
            notification_ttl_ms,
        };

        if Path::new(CONFIG_FILE).exists() {
            let content = fs::read_to_string(CONFIG_FILE)?;
            config.apply_overrides(&content)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Merge the settings found in a TOML document over the current values
    pub fn apply_overrides(&mut self, content: &str) -> OrganiserResult<()> {
        let overrides: FileOverrides = toml::from_str(content)?;

        if let Some(base_url) = overrides.base_url {
            self.base_url = base_url;
        }
        if let Some(api_prefix) = overrides.api_prefix {
            self.api_prefix = api_prefix;
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(ms) = overrides.notification_ttl_ms {
            self.notification_ttl_ms = ms;
        }

        Ok(())
    }

    /// Check that the service address can be turned into endpoint URLs
    pub fn validate(&self) -> OrganiserResult<()> {
        self.events_url().map(|_| ())
    }

    /// URL of the event list endpoint; the mutation endpoints hang off it
    pub fn events_url(&self) -> OrganiserResult<Url> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| config_error(&format!("Invalid base URL '{}': {}", self.base_url, e)))?;

        // Url::join drops the last segment unless the prefix ends in '/'
        let mut prefix = self.api_prefix.clone();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }

        base.join(&prefix)
            .map_err(|e| config_error(&format!("Invalid API prefix '{}': {}", self.api_prefix, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}

fn parse_env_u64(var: &str, default: u64) -> OrganiserResult<u64> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| env_error(&format!("Invalid {} format", var))),
        Err(_) => Ok(default),
    }
}
