//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/hierpart/hierpart.toml`
//! 3. Local config: a file passed explicitly by the caller
//! 4. Environment variables: `HIERPART_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// Default length of the leading window used to seed node weights.
pub const DEFAULT_INIT_DAYS: usize = 7;

/// Unified configuration for hierpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Number of leading days of the per-day series summed into initial weights
    pub init_days: usize,
    /// Recheck all subtree sums after every separate/unite call
    pub verify_invariants: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            init_days: DEFAULT_INIT_DAYS,
            verify_invariants: false,
        }
    }
}

/// Raw settings for intermediate parsing (fields are Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RawSettings {
    pub init_days: Option<usize>,
    pub verify_invariants: Option<bool>,
}

/// Get the XDG config directory for hierpart.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hierpart").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("hierpart.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            init_days: overlay.init_days.unwrap_or(self.init_days),
            verify_invariants: overlay.verify_invariants.unwrap_or(self.verify_invariants),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_path` - Optional config file; unlike the global file it must exist
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/hierpart/hierpart.toml`
    /// 3. Local config file
    /// 4. Environment variables: `HIERPART_*` prefix
    pub fn load(local_path: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = local_path {
            debug!(path = %path.display(), "loading local config");
            current = current.merge_with(&load_raw_settings(path)?);
        }

        Self::apply_env_overrides(current)
    }

    /// Apply HIERPART_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("HIERPART").try_parsing(true))
            .build()
            .map_err(config_err)?;

        match config.get::<usize>("init_days") {
            Ok(val) => settings.init_days = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(config_err(e)),
        }
        match config.get_bool("verify_invariants") {
            Ok(val) => settings.verify_invariants = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(config_err(e)),
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# hierpart configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/hierpart/hierpart.toml
#   Local:  file passed to Settings::load
#   Env:    HIERPART_* environment variables (explicit overrides)

# Leading days of the per-day task series summed into initial node weights
# init_days = 7

# Recheck every subtree sum after each separate/unite call (slow on big trees)
# verify_invariants = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
