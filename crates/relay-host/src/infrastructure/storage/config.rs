//! TOML-based configuration persistence for the host application.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\BleHidRelay\config.toml`
//! - Linux:    `~/.config/blehidrelay/config.toml`
//! - macOS:    `~/Library/Application Support/BleHidRelay/config.toml`
//!
//! The peer's identity (device name, service/characteristic UUIDs) is
//! configuration, not code: the defaults match the stock peer firmware and
//! only need editing for modified builds. Every field carries a
//! `#[serde(default = ...)]` so the app works on first run with no file
//! present and tolerates older files missing newer fields.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::infrastructure::link::{
    LinkConfig, DEFAULT_DEVICE_NAME, DEFAULT_NOTIFY_CHAR_UUID, DEFAULT_SERVICE_UUID,
    DEFAULT_WRITE_CHAR_UUID,
};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A UUID field is not a valid UUID string.
    #[error("invalid UUID in config field {field}: {value:?}")]
    InvalidUuid { field: &'static str, value: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub link: LinkSettings,
}

/// General host behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Peer identity and session timing settings.
///
/// UUIDs are stored as strings so a hand-edited file fails with a clear
/// error instead of a serde type mismatch; see [`LinkSettings::to_link_config`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkSettings {
    /// Substring the advertised BLE device name must contain.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// GATT service UUID the peer advertises.
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,
    /// Characteristic the host writes input lines to.
    #[serde(default = "default_write_char_uuid")]
    pub write_char_uuid: String,
    /// Characteristic the peer notifies status bytes on.
    #[serde(default = "default_notify_char_uuid")]
    pub notify_char_uuid: String,
    /// Bounded scan window in seconds for one discovery pass.
    #[serde(default = "default_scan_window_secs")]
    pub scan_window_secs: u64,
    /// Pause in milliseconds before retrying a failed discovery pass.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl LinkSettings {
    /// Validates the UUID strings and builds the runtime [`LinkConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUuid`] naming the offending field.
    pub fn to_link_config(&self) -> Result<LinkConfig, ConfigError> {
        Ok(LinkConfig {
            device_name: self.device_name.clone(),
            service_uuid: parse_uuid("link.service_uuid", &self.service_uuid)?,
            write_char_uuid: parse_uuid("link.write_char_uuid", &self.write_char_uuid)?,
            notify_char_uuid: parse_uuid("link.notify_char_uuid", &self.notify_char_uuid)?,
            scan_window: Duration::from_secs(self.scan_window_secs),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        })
    }
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidUuid {
        field,
        value: value.to_string(),
    })
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}
fn default_service_uuid() -> String {
    DEFAULT_SERVICE_UUID.to_string()
}
fn default_write_char_uuid() -> String {
    DEFAULT_WRITE_CHAR_UUID.to_string()
}
fn default_notify_char_uuid() -> String {
    DEFAULT_NOTIFY_CHAR_UUID.to_string()
}
fn default_scan_window_secs() -> u64 {
    10
}
fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            service_uuid: default_service_uuid(),
            write_char_uuid: default_write_char_uuid(),
            notify_char_uuid: default_notify_char_uuid(),
            scan_window_secs: default_scan_window_secs(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from disk, returning `AppConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("BleHidRelay"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("blehidrelay"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library/Application Support/BleHidRelay"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
