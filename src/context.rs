//! Application context: loaded config plus the user's saved preferences.
//!
//! Built once at start-up and passed by reference to whatever needs it.
//! Preferences live in `preferences.toml` beside the config file and are only
//! written when [`AppContext::save_preferences`] is called.

use crate::config::{self, AppConfig, ConfigError};
use crate::imaging::{OutputFormat, Quality};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const PREFERENCES_FILE: &str = "preferences.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        })
    }
}

impl FromStr for Theme {
    type Err = crate::imaging::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            _ => Err(crate::imaging::ParseError {
                kind: "theme",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preferences {
    pub theme: Theme,
    pub last_format: Option<OutputFormat>,
    pub last_quality: Option<u32>,
}

impl Preferences {
    /// Read preferences from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub preferences: Preferences,
    preferences_path: PathBuf,
}

impl AppContext {
    /// Load the config at `config_path` and the preferences stored next to it.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let config = config::load_config(config_path)?;
        let preferences_path = config_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(PREFERENCES_FILE);
        let preferences = Preferences::load(&preferences_path)?;
        debug!(
            config = %config_path.display(),
            preferences = %preferences_path.display(),
            "loaded context"
        );
        Ok(Self {
            config,
            preferences,
            preferences_path,
        })
    }

    pub fn preferences_path(&self) -> &Path {
        &self.preferences_path
    }

    pub fn save_preferences(&self) -> Result<(), ConfigError> {
        self.preferences.save(&self.preferences_path)
    }

    /// Output format: last used, else the configured default.
    pub fn output_format(&self) -> OutputFormat {
        self.preferences
            .last_format
            .unwrap_or(self.config.output.format)
    }

    /// Output quality: last used, else the configured default.
    pub fn output_quality(&self) -> Quality {
        self.preferences
            .last_quality
            .map(Quality::new)
            .unwrap_or_else(|| self.config.output.quality())
    }

    /// Quality for a lossy encode: `requested` on the command line, else
    /// [`output_quality`](Self::output_quality).
    pub fn requested_quality(&self, requested: Option<u32>) -> Quality {
        requested
            .map(Quality::new)
            .unwrap_or_else(|| self.output_quality())
    }

    /// Remember the format and quality of a successful run.
    pub fn remember_output(&mut self, format: OutputFormat, quality: Quality) {
        self.preferences.last_format = Some(format);
        self.preferences.last_quality = Some(quality.value());
    }
}
