//! Tool configuration
//!
//! Loaded from a JSON file, then adjusted by environment variables:
//! - `CHECKIN_ROSTER`: roster CSV path
//! - `CHECKIN_MAX_DIM`: downscale captures to this longest side (`0` disables)

use crate::desk::DuplicatePolicy;
use crate::error::ConfigError;
use crate::session::Operators;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default longest side for captures before decoding
pub const DEFAULT_MAX_DIM: u32 = 1200;

const ROSTER_VAR: &str = "CHECKIN_ROSTER";
const MAX_DIM_VAR: &str = "CHECKIN_MAX_DIM";

/// Everything needed to open a check-in session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Roster CSV file
    pub roster: PathBuf,
    /// Operators allowed to scan
    pub operators: Operators,
    /// Longest side captures are downscaled to, `None` to keep full size
    #[serde(default = "default_max_dim")]
    pub max_dim: Option<u32>,
    /// Handling of repeated roll numbers
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

fn default_max_dim() -> Option<u32> {
    Some(DEFAULT_MAX_DIM)
}

impl Config {
    /// Load a config file and apply environment overrides.
    ///
    /// A relative roster path is taken relative to the config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_json(&text)?;
        if config.roster.is_relative() {
            if let Some(dir) = path.parent() {
                config.roster = dir.join(&config.roster);
            }
        }
        config.apply_overrides(|var| env::var(var).ok())?;
        Ok(config)
    }

    /// Parse and validate config text without touching the environment.
    ///
    /// `"max_dim": 0` disables downscaling, as `CHECKIN_MAX_DIM=0` does.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(text)?;
        if config.operators.is_empty() {
            return Err(ConfigError::NoOperators);
        }
        config.max_dim = config.max_dim.filter(|&dim| dim > 0);
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(roster) = lookup(ROSTER_VAR) {
            self.roster = PathBuf::from(roster);
        }

        if let Some(value) = lookup(MAX_DIM_VAR) {
            self.max_dim = match value.trim().parse::<u32>() {
                Ok(0) => None,
                Ok(v) => Some(v),
                Err(_) => {
                    return Err(ConfigError::InvalidEnv {
                        var: MAX_DIM_VAR,
                        value,
                    });
                }
            };
        }

        Ok(())
    }
}
