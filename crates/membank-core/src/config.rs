//! Server configuration.
//!
//! Defaults come from an optional TOML file at `~/.membank/config.toml`;
//! environment variables override file values. Everything has a sensible
//! default so a bare `membank serve` works.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::MemBankError;

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory name of the per-project database, created under each
    /// project root.
    pub db_filename: String,
    /// Bind host for the HTTP transport.
    pub host: String,
    /// Port for the plain HTTP endpoint.
    pub port: u16,
    /// Port for the HTTP streaming (SSE) endpoint.
    pub http_stream_port: u16,
    /// Log level 0-4: off, error, warn, info, debug.
    pub debug: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_filename: "memory-bank.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            http_stream_port: 3001,
            debug: 2,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the given TOML path.
    pub fn load(path: &Path) -> Result<Self, MemBankError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MemBankError::Config(e.to_string()))
    }

    /// Save configuration to the given TOML path.
    pub fn save(&self, path: &Path) -> Result<(), MemBankError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| MemBankError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config path: `~/.membank/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".membank")
            .join("config.toml")
    }

    /// Load from the default path (or defaults), then apply env overrides:
    /// `DB_FILENAME`, `HOST`, `PORT`, `HTTP_STREAM_PORT`, `DEBUG`.
    pub fn from_env() -> Self {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load(&path).unwrap_or_default()
        } else {
            Self::default()
        };
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("DB_FILENAME") {
            if !v.is_empty() {
                self.db_filename = v;
            }
        }
        if let Ok(v) = std::env::var("HOST") {
            if !v.is_empty() {
                self.host = v;
            }
        }
        if let Ok(v) = std::env::var("PORT") {
            if let Ok(port) = v.parse() {
                self.port = port;
            }
        }
        if let Ok(v) = std::env::var("HTTP_STREAM_PORT") {
            if let Ok(port) = v.parse() {
                self.http_stream_port = port;
            }
        }
        if let Ok(v) = std::env::var("DEBUG") {
            if let Ok(level) = v.parse::<u8>() {
                self.debug = level.min(4);
            }
        }
    }

    /// Map the numeric `debug` level onto a tracing filter directive.
    pub fn log_filter(&self) -> &'static str {
        match self.debug {
            0 => "off",
            1 => "error",
            2 => "warn",
            3 => "info",
            _ => "debug",
        }
    }
}
