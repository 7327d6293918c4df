//! TOML-based client configuration.
//!
//! Reads and writes [`ClientConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Beamctl\config.toml`
//! - Linux:    `~/.config/beamctl/config.toml`
//! - macOS:    `~/Library/Application Support/Beamctl/config.toml`
//!
//! Fields annotated with `#[serde(default = "…")]` fall back to the built-in
//! defaults when absent from the file, so the client works on first run and
//! after upgrades that add new fields.
//!
//! The config is also where the two channel endpoints are derived:
//! [`ClientConfig::control_url`] and [`ClientConfig::upload_url`] validate the
//! host/port/path combination eagerly, so a malformed address fails fast
//! before any socket is touched.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Error type for configuration operations.
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

    /// The host/port/path combination does not form a valid endpoint.
    #[error("invalid endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

/// All runtime settings for the projector client.
///
/// Both channel managers are driven by the same host; only the port (and, for
/// uploads, a fixed path segment) differs between the two endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Projector hostname or IP address on the LAN.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the text command/status channel.
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    /// Port of the binary media-upload channel.
    #[serde(default = "default_upload_port")]
    pub upload_port: u16,
    /// Path segment of the upload endpoint. Must start with `/`.
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "10.42.0.47".to_string()
}
fn default_control_port() -> u16 {
    8080
}
fn default_upload_port() -> u16 {
    8081
}
fn default_upload_path() -> String {
    "/video".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            control_port: default_control_port(),
            upload_port: default_upload_port(),
            upload_path: default_upload_path(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Endpoint of the command channel, e.g. `ws://10.42.0.47:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] when the host does not form a
    /// valid `ws://` URL (empty host, embedded whitespace, and so on).
    pub fn control_url(&self) -> Result<Url, ConfigError> {
        parse_ws_url(format!("ws://{}:{}", self.host, self.control_port))
    }

    /// Endpoint of the upload channel, e.g. `ws://10.42.0.47:8081/video`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] for a malformed host or when
    /// `upload_path` does not start with `/`.
    pub fn upload_url(&self) -> Result<Url, ConfigError> {
        if !self.upload_path.starts_with('/') {
            return Err(ConfigError::InvalidEndpoint {
                url: self.upload_path.clone(),
                reason: "upload path must start with '/'".to_string(),
            });
        }
        parse_ws_url(format!(
            "ws://{}:{}{}",
            self.host, self.upload_port, self.upload_path
        ))
    }
}

fn parse_ws_url(raw: String) -> Result<Url, ConfigError> {
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEndpoint {
        url: raw,
        reason: e.to_string(),
    })
}

// ── Config file persistence ───────────────────────────────────────────────────

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the platform base
/// directory cannot be determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)
        .map(|dir| dir.join("config.toml"))
}

/// Loads [`ClientConfig`] from disk, returning `ClientConfig::default()` if
/// the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the config directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ClientConfig) -> Result<(), ConfigError> {
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

/// Resolves the platform config directory for this application.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Beamctl"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("beamctl"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Beamctl")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
