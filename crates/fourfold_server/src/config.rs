//! Server configuration loaded from TOML.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Timing budgets for matchmaking, reconnection and bot pacing.
///
/// All values are milliseconds in the TOML file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// How long a lone player waits before the bot takes the other seat.
    matchmaking_timeout_ms: u64,
    /// How long a disconnected player may be gone before forfeiting.
    reconnect_grace_ms: u64,
    /// How long a finished session stays around before cleanup.
    completion_cleanup_ms: u64,
    /// Delay before the bot answers a human move.
    bot_response_delay_ms: u64,
    /// Delay before the bot makes an opening move.
    bot_opening_delay_ms: u64,
}

impl Timings {
    /// Creates timings from explicit millisecond values.
    pub fn new(
        matchmaking_timeout_ms: u64,
        reconnect_grace_ms: u64,
        completion_cleanup_ms: u64,
        bot_response_delay_ms: u64,
        bot_opening_delay_ms: u64,
    ) -> Self {
        Self {
            matchmaking_timeout_ms,
            reconnect_grace_ms,
            completion_cleanup_ms,
            bot_response_delay_ms,
            bot_opening_delay_ms,
        }
    }

    /// Matchmaking fallback timeout.
    pub fn matchmaking_timeout(&self) -> Duration {
        Duration::from_millis(self.matchmaking_timeout_ms)
    }

    /// Reconnection grace window.
    pub fn reconnect_grace(&self) -> Duration {
        Duration::from_millis(self.reconnect_grace_ms)
    }

    /// Delay between a terminal outcome and registry cleanup.
    pub fn completion_cleanup(&self) -> Duration {
        Duration::from_millis(self.completion_cleanup_ms)
    }

    /// Delay before the bot answers a move.
    pub fn bot_response_delay(&self) -> Duration {
        Duration::from_millis(self.bot_response_delay_ms)
    }

    /// Delay before the bot opens a session.
    pub fn bot_opening_delay(&self) -> Duration {
        Duration::from_millis(self.bot_opening_delay_ms)
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self::new(10_000, 30_000, 5_000, 300, 500)
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind to.
    #[serde(default = "default_port")]
    port: u16,

    /// SQLite database path. `None` disables persistence.
    #[serde(default = "default_db_path")]
    db_path: Option<String>,

    /// Display name used for the scripted opponent.
    #[serde(default = "default_bot_name")]
    bot_name: String,

    /// Timer budgets.
    #[serde(default)]
    timings: Timings,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> Option<String> {
    Some("fourfold.db".to_string())
}

fn default_bot_name() -> String {
    "Bot".to_string()
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is invalid or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the config with the bind address replaced.
    pub fn with_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Returns the config with the database path replaced.
    pub fn with_db_path(mut self, db_path: Option<String>) -> Self {
        self.db_path = db_path;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::new("bot_name must not be empty".to_string()));
        }
        if self.timings.matchmaking_timeout_ms == 0 || self.timings.reconnect_grace_ms == 0 {
            return Err(ConfigError::new(
                "matchmaking_timeout_ms and reconnect_grace_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            bot_name: default_bot_name(),
            timings: Timings::default(),
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ServerConfig::from_toml("").expect("Empty config is valid");
        assert_eq!(config.port(), &3000);
        assert_eq!(config.bot_name(), "Bot");
        assert_eq!(config.timings().matchmaking_timeout(), Duration::from_secs(10));
        assert_eq!(config.timings().reconnect_grace(), Duration::from_secs(30));
        assert_eq!(config.timings().completion_cleanup(), Duration::from_secs(5));
        assert_eq!(config.timings().bot_response_delay(), Duration::from_millis(300));
        assert_eq!(config.timings().bot_opening_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_timings_override() {
        let config = ServerConfig::from_toml(
            r#"
            port = 8080
            bot_name = "Robo"

            [timings]
            matchmaking_timeout_ms = 2000
            "#,
        )
        .expect("Valid config");
        assert_eq!(config.port(), &8080);
        assert_eq!(config.bot_name(), "Robo");
        assert_eq!(config.timings().matchmaking_timeout(), Duration::from_secs(2));
        assert_eq!(config.timings().reconnect_grace(), Duration::from_secs(30));
    }

    #[test]
    fn test_blank_bot_name_rejected() {
        let result = ServerConfig::from_toml("bot_name = \"  \"");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ServerConfig::from_toml("[timings]\nmatchmaking_timeout_ms = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_bind_override() {
        let config = ServerConfig::default().with_bind(Some("0.0.0.0".to_string()), None);
        assert_eq!(config.host(), "0.0.0.0");
        assert_eq!(config.port(), &3000);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = ServerConfig::from_file("/nonexistent/fourfold.toml");
        assert!(result.is_err());
    }
}
