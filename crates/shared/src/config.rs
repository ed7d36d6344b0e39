//! Configuration management for the MAL API toolkit.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings. Account credentials are not part
//! of the file; they are resolved from CLI flags or the environment.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Resource API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// OAuth endpoint settings
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Browser automation settings used by the login flow
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Token persistence settings
    #[serde(default)]
    pub tokens: TokensConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MyAnimeList v2 resource API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL
    pub base_url: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Request timeout in seconds (None = no timeout)
    pub timeout_secs: Option<u64>,

    /// Reject `fields` entries that are not known query fields
    pub strict_fields: bool,
}

/// OAuth2 endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization endpoint opened in the browser
    pub authorize_url: String,

    /// Token endpoint for code exchange and refresh
    pub token_url: String,

    /// Redirect URI registered for the client (optional)
    pub redirect_uri: Option<String>,

    /// PKCE challenge method announced to the provider
    pub code_challenge_method: String,

    /// Path of the provider login page the authorization URL may bounce to
    pub login_path: String,
}

/// Browser automation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver server URL (chromedriver)
    pub webdriver_url: String,

    /// Run the browser without a window
    pub headless: bool,

    /// Delay after each click so the next page can load, in milliseconds
    pub settle_delay_ms: u64,
}

/// Token persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokensConfig {
    /// Token file path
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log directory path
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.myanimelist.net/v2".to_string(),
            user_agent: "mal-client/0.1.0".to_string(),
            timeout_secs: None,
            strict_fields: false,
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorize_url: "https://myanimelist.net/v1/oauth2/authorize".to_string(),
            token_url: "https://myanimelist.net/v1/oauth2/token".to_string(),
            redirect_uri: None,
            // MAL only accepts the plain method
            code_challenge_method: "plain".to_string(),
            login_path: "/login.php".to_string(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            settle_delay_ms: 1000,
        }
    }
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            path: "tokens.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: false,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            oauth: OAuthConfig::default(),
            browser: BrowserConfig::default(),
            tokens: TokensConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Get the token file path
    pub fn tokens_path(&self) -> PathBuf {
        PathBuf::from(&self.tokens.path)
    }

    /// Get the log directory path
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.logging.log_dir)
    }

    /// Parse the configured default log level, falling back to INFO
    pub fn log_level(&self) -> tracing::Level {
        self.logging
            .default_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}
