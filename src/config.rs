//! Configuration module for slotbook.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, SlotbookError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/slotbook.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Authentication configuration.
///
/// `secret` signs the session credential; `encryption_key` signs the
/// short-lived login challenge tokens. The two trust boundaries are
/// deliberately separate keys.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to verify session credentials (must be set).
    #[serde(default)]
    pub secret: String,
    /// Secret used to verify login challenge tokens.
    #[serde(default)]
    pub encryption_key: String,
    /// Public base URL of the application, e.g. "https://book.example.com".
    #[serde(default = "default_website_url")]
    pub website_url: String,
    /// Additional origins allowed as redirect destinations.
    #[serde(default)]
    pub trusted_origins: Vec<String>,
    /// Maximum number of resolved sessions held in the in-process cache.
    #[serde(default = "default_session_cache_capacity")]
    pub session_cache_capacity: usize,
    /// Whether password login is offered on the login surface.
    #[serde(default = "default_true")]
    pub password_login_enabled: bool,
    /// Whether Google OAuth login is offered on the login surface.
    #[serde(default)]
    pub google_login_enabled: bool,
    /// Whether SAML SSO login is offered on the login surface.
    #[serde(default)]
    pub saml_login_enabled: bool,
    /// SAML tenant identifier passed to the login surface.
    #[serde(default)]
    pub saml_tenant_id: String,
    /// SAML product identifier passed to the login surface.
    #[serde(default)]
    pub saml_product_id: String,
}

fn default_website_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_session_cache_capacity() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            encryption_key: String::new(),
            website_url: default_website_url(),
            trusted_origins: vec![],
            session_cache_capacity: default_session_cache_capacity(),
            password_login_enabled: default_true(),
            google_login_enabled: false,
            saml_login_enabled: false,
            saml_tenant_id: String::new(),
            saml_product_id: String::new(),
        }
    }
}

/// License / entitlement configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LicenseConfig {
    /// License key for this deployment. Absent means unlicensed.
    #[serde(default)]
    pub key: String,
    /// Base URL of the license validation API.
    #[serde(default = "default_license_api_url")]
    pub api_url: String,
    /// How long a license verdict is cached, in seconds.
    #[serde(default = "default_license_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Request timeout in seconds.
    #[serde(default = "default_license_timeout")]
    pub timeout_secs: u64,
}

fn default_license_api_url() -> String {
    "https://console.slotbook.dev/api/license".to_string()
}

fn default_license_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_license_timeout() -> u64 {
    10
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            api_url: default_license_api_url(),
            cache_ttl_secs: default_license_cache_ttl(),
            timeout_secs: default_license_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/slotbook.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// License configuration.
    #[serde(default)]
    pub license: LicenseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(SlotbookError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SlotbookError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SLOTBOOK_AUTH_SECRET`: Override the credential signing secret
    /// - `SLOTBOOK_ENCRYPTION_KEY`: Override the challenge token secret
    /// - `SLOTBOOK_LICENSE_KEY`: Override the deployment license key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("SLOTBOOK_AUTH_SECRET") {
            if !secret.is_empty() {
                self.auth.secret = secret;
            }
        }
        if let Ok(key) = std::env::var("SLOTBOOK_ENCRYPTION_KEY") {
            if !key.is_empty() {
                self.auth.encryption_key = key;
            }
        }
        if let Ok(key) = std::env::var("SLOTBOOK_LICENSE_KEY") {
            if !key.is_empty() {
                self.license.key = key;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The website URL does not parse as an absolute URL
    /// - The session cache capacity is zero
    ///
    /// A missing auth secret is deliberately NOT an error here: session
    /// resolution degrades to anonymous with a warning instead of refusing
    /// to boot (see `auth::credential`).
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.auth.website_url).is_err() {
            return Err(SlotbookError::Config(format!(
                "auth.website_url is not a valid URL: {}",
                self.auth.website_url
            )));
        }
        if self.auth.session_cache_capacity == 0 {
            return Err(SlotbookError::Config(
                "auth.session_cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
