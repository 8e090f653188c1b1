//! Configuration management for olcli

pub mod schema;

pub use schema::Config;

use crate::error::{OlError, OlResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("olcli")
            .join("config.toml")
    }

    /// Get the default state directory path
    pub fn default_state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("olcli")
    }

    /// State directory for a loaded configuration
    pub fn state_dir(config: &Config) -> PathBuf {
        config
            .paths
            .state_dir
            .clone()
            .unwrap_or_else(Self::default_state_dir)
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub fn load(&self) -> OlResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(&self, path: &Path) -> OlResult<Config> {
        let content = fs::read_to_string(path)
            .map_err(|e| OlError::io(format!("reading config from {}", path.display()), e))?;

        let mut config: Config = toml::from_str(&content).map_err(|e| OlError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let base = config.service.base_url.trim_end_matches('/').to_string();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(OlError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: format!("service.base_url must be an http(s) URL, got '{}'", base),
            });
        }
        config.service.base_url = base;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> OlResult<()> {
        self.ensure_config_dir()?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).map_err(|e| {
            OlError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    fn ensure_config_dir(&self) -> OlResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| OlError::ConfigDirCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Ensure the state directory exists with owner-only permissions
    pub fn ensure_state_dir(config: &Config) -> OlResult<PathBuf> {
        let dir = Self::state_dir(config);
        fs::create_dir_all(&dir).map_err(|e| OlError::storage(&dir, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(&dir, perms).map_err(|e| OlError::storage(&dir, e))?;
        }

        Ok(dir)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
