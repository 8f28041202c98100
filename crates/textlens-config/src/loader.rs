//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// Default config location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/textlens.toml";

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("Invalid env var regex"));

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load an explicit path, or the first default location that exists,
    /// or fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_locations().into_iter().find(|p| p.exists()) {
            Some(found) => Self::load(&found),
            None => Ok(Config::default()),
        }
    }

    /// Candidate config files, in search order.
    pub fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(DEFAULT_CONFIG_PATH)];
        if let Some(dir) = dirs::config_dir() {
            locations.push(dir.join("textlens").join("textlens.toml"));
        }
        locations
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in ENV_VAR.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}
