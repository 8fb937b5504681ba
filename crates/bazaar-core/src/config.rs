//! Configuration resolution for Bazaar.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Settings file (explicit path, else ~/.config/bazaar/settings.json)
//! 3. Environment variables (`BAZAAR_*`)
//! 4. CLI arguments (highest priority, applied by the server binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Bazaar configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Maximum accepted request body (image uploads), in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            max_body_bytes: 10 * 1024 * 1024, // 10 MB
        }
    }
}

/// Database and upload locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            upload_dir: PathBuf::from("static/uploads"),
        }
    }
}

/// Server-side session lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a session stays valid after it is created.
    pub ttl_secs: i64,
    /// Interval of the expired-session sweep.
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 7 * 24 * 60 * 60, // 7 days
            cleanup_interval_secs: 3600,
        }
    }
}

/// Seller notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub default_sender: String,
    /// Log notifications instead of delivering them.
    pub suppress_send: bool,
    /// Endpoint that accepts JSON mail messages when sending is enabled.
    pub webhook_url: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            default_sender: "noreply@onlinestore.com".to_string(),
            suppress_send: true,
            webhook_url: None,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `settings_path` overrides the global settings file location. A missing
/// global file is not an error; a missing explicit file is.
pub fn load_config(settings_path: Option<&Path>) -> Result<Config> {
    let mut config = match settings_path {
        Some(path) => load_config_file(path)?,
        None => match global_config_path() {
            Some(global) if global.exists() => load_config_file(&global)?,
            _ => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("bazaar").join("settings.json"))
}

/// Default database location when none is configured.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("bazaar").join("bazaar.db"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply `BAZAAR_*` overrides. Values that fail to parse are ignored.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("BAZAAR_ADDR") {
        config.server.addr = val;
    }
    if let Some(val) = lookup("BAZAAR_DATABASE_PATH") {
        config.storage.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("BAZAAR_UPLOAD_DIR") {
        config.storage.upload_dir = PathBuf::from(val);
    }
    if let Some(n) = lookup("BAZAAR_SESSION_TTL").and_then(|v| v.parse().ok()) {
        config.sessions.ttl_secs = n;
    }
    if let Some(val) = lookup("BAZAAR_MAIL_SENDER") {
        config.mail.default_sender = val;
    }
    if let Some(b) = lookup("BAZAAR_MAIL_SUPPRESS_SEND").and_then(|v| v.parse().ok()) {
        config.mail.suppress_send = b;
    }
    if let Some(val) = lookup("BAZAAR_MAIL_WEBHOOK_URL") {
        config.mail.webhook_url = Some(val);
    }
}
