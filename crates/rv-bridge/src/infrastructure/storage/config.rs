//! TOML-based configuration for the bridge binary.
//!
//! Reads `AppConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\RvBridge\config.toml`
//! - Linux:    `~/.config/rv-bridge/config.toml` (or `$XDG_CONFIG_HOME`)
//! - macOS:    `~/Library/Application Support/RvBridge/config.toml`
//!
//! Example:
//!
//! ```toml
//! backend = "native"
//!
//! [bus]
//! service = "7500"
//! network = ";239.1.1.1"
//! daemon = "tcp:7500"
//! subjects = ["ORDERS.>", "PRICES.*"]
//!
//! [session]
//! parameters = ["-reliability", "3"]
//!
//! [dispatch]
//! poll_interval_ms = 500
//! channel_capacity = 1
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every section and field is optional; missing values take the defaults
//! below.  Command-line flags are merged on top in `main.rs`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use rv_core::{validate_subject, BusParams, SubjectError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::DispatchOptions;

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

    /// A configured subject is not a valid Rendezvous subject.
    #[error("invalid subject in config: {0}")]
    InvalidSubject(#[from] SubjectError),

    /// `dispatch.channel_capacity` was zero.
    #[error("dispatch.channel_capacity must be at least 1")]
    ZeroCapacity,

    /// `backend` named something other than `simulated` or `native`.
    #[error("unknown backend {0:?} (expected \"simulated\" or \"native\")")]
    UnknownBackend(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Which [`rv_core::BusLibrary`] implementation the binary runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process bus; no native library needed.
    Simulated,
    /// The linked Rendezvous library (requires the `tibrv` feature).
    Native,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "tibrv") {
            Backend::Native
        } else {
            Backend::Simulated
        }
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simulated" => Ok(Backend::Simulated),
            "native" => Ok(Backend::Native),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Simulated => f.write_str("simulated"),
            Backend::Native => f.write_str("native"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub bus: BusParams,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Library startup settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Flags passed to the library before it opens, e.g. `["-reliability", "3"]`.
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Dispatch loop and output channel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchConfig {
    /// Longest single wait inside the native dispatch call.  `0` waits
    /// forever, which makes the loop unable to notice a stop request until
    /// the next message arrives.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Output channel capacity.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_poll_interval_ms() -> u64 {
    500
}
fn default_channel_capacity() -> usize {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DispatchConfig {
    /// Converts to the options taken by
    /// [`start_subscriptions`](crate::application::start_subscriptions).
    pub fn to_options(&self) -> DispatchOptions {
        DispatchOptions {
            poll_interval: match self.poll_interval_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            channel_capacity: self.channel_capacity,
        }
    }
}

impl AppConfig {
    /// Checks values that deserialize fine but cannot work.
    ///
    /// An empty subject list is accepted here; starting the subscriptions
    /// reports it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSubject`] or [`ConfigError::ZeroCapacity`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for subject in &self.bus.subjects {
            validate_subject(subject)?;
        }
        if self.dispatch.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the default location, returning
/// `AppConfig::default()` if the file does not exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Resolves the platform config directory including the `RvBridge` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("RvBridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("rv-bridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("RvBridge")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
