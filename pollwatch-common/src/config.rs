//! Configuration loading and root folder resolution
//!
//! Configuration comes from an optional TOML file. A missing file is not an
//! error: the service logs a warning and starts with compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "POLLWATCH_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "pollwatch.db";

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Folder holding the database (overridden by CLI / environment)
    pub root_folder: Option<PathBuf>,
    /// Interface to bind the HTTP listener to
    pub bind_addr: String,
    /// HTTP port
    pub port: u16,
    /// Outbound queue length per realtime client; events beyond it are dropped
    pub client_buffer: usize,
    /// Seconds without heartbeat after which a live stream is reported stale
    pub stream_stale_after_secs: i64,
    /// Window used for "recent" station updates sent to new election subscribers
    pub live_window_minutes: i64,
    /// Page size for list endpoints
    pub page_size: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_addr: "0.0.0.0".to_string(),
            port: 5780,
            client_buffer: 64,
            stream_stale_after_secs: 60,
            live_window_minutes: 60,
            page_size: 50,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    ///
    /// `None` or a missing file yields defaults. A file that exists but does
    /// not parse is a configuration error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file not found: {} (using defaults)", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.client_buffer == 0 {
            return Err(Error::Config("client_buffer must be at least 1".to_string()));
        }
        if self.page_size < 1 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if self.stream_stale_after_secs < 1 {
            return Err(Error::Config(
                "stream_stale_after_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `root_folder` key of the TOML config
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &ServerConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/pollwatch (or /var/lib/pollwatch for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("pollwatch"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/pollwatch"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("pollwatch"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/pollwatch"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("pollwatch"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\pollwatch"))
    } else {
        PathBuf::from("./pollwatch_data")
    }
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}
