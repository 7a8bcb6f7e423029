//! Application configuration.
//!
//! Handles loading, validating, and merging `imageforge.toml`. Stock defaults
//! are the base layer; the user file is merged on top key by key, so it only
//! needs the values it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! format = "jpeg"           # Default target for convert and bulk
//! quality = 80              # Lossy quality (0-100)
//!
//! [batch]
//! policy = "fail-fast"      # or "best-effort"
//! archive_name = "ImageForge_Bulk.zip"
//!
//! [merge]
//! direction = "horizontal"  # or "vertical"
//! file_name = "ImageForge_Merged.png"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [upload]
//! max_file_bytes = 52428800 # Per-file size cap (50 MiB)
//!
//! [ai]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! image_model = "gpt-image-1"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 60
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::batch::BatchPolicy;
use crate::imaging::{MergeDirection, OutputFormat, Quality};
use crate::upload::DEFAULT_MAX_FILE_BYTES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "imageforge.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `imageforge.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Default output format and quality.
    pub output: OutputConfig,
    /// Bulk processing policy and archive naming.
    pub batch: BatchConfig,
    /// Merge direction and output name.
    pub merge: MergeConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Input limits.
    pub upload: UploadConfig,
    /// Remote suggestion service.
    pub ai: AiConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.quality > 100 {
            return Err(ConfigError::Validation(
                "output.quality must be 0-100".into(),
            ));
        }
        if !self.batch.archive_name.to_ascii_lowercase().ends_with(".zip")
            || self.batch.archive_name.len() <= ".zip".len()
        {
            return Err(ConfigError::Validation(
                "batch.archive_name must be a .zip file name".into(),
            ));
        }
        if self.merge.file_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "merge.file_name must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.upload.max_file_bytes == 0 {
            return Err(ConfigError::Validation(
                "upload.max_file_bytes must be positive".into(),
            ));
        }
        if !self.ai.base_url.starts_with("http://") && !self.ai.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "ai.base_url must be an http(s) URL".into(),
            ));
        }
        if self.ai.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "ai.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Quality::default().value(),
        }
    }
}

impl OutputConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub policy: BatchPolicy,
    pub archive_name: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            policy: BatchPolicy::FailFast,
            archive_name: "ImageForge_Bulk.zip".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub direction: MergeDirection,
    pub file_name: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            direction: MergeDirection::Horizontal,
            file_name: "ImageForge_Merged.png".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub max_file_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Remote suggestion service (any OpenAI-compatible API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiConfig {
    pub base_url: String,
    /// Chat model used for DPI and compression suggestions.
    pub model: String,
    /// Image model used for related-image generation.
    pub image_model: String,
    /// Environment variable holding the API key. The key itself is never
    /// read from the config file.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            image_model: "gpt-image-1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `imageforge.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# ImageForge Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output defaults (convert, bulk)
# ---------------------------------------------------------------------------
[output]
# One of: jpeg, png, webp, gif, pdf
format = "jpeg"

# Lossy quality for JPEG, WebP and PDF (0 = smallest, 100 = best).
# PNG and GIF ignore it.
quality = 80

# ---------------------------------------------------------------------------
# Bulk processing
# ---------------------------------------------------------------------------
[batch]
# "fail-fast": stop at the first broken image and write nothing.
# "best-effort": skip broken images and archive the rest.
policy = "fail-fast"

# Name of the ZIP written by `imageforge bulk`.
archive_name = "ImageForge_Bulk.zip"

# ---------------------------------------------------------------------------
# Merge
# ---------------------------------------------------------------------------
[merge]
# "horizontal" (side by side) or "vertical" (stacked).
direction = "horizontal"
file_name = "ImageForge_Merged.png"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Input limits
# ---------------------------------------------------------------------------
[upload]
# Largest accepted input file, in bytes (50 MiB).
max_file_bytes = 52428800

# ---------------------------------------------------------------------------
# AI suggestions (dpi, enhance, compress --ai)
# ---------------------------------------------------------------------------
[ai]
# Any OpenAI-compatible API.
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
image_model = "gpt-image-1"

# Environment variable holding the API key.
api_key_env = "OPENAI_API_KEY"

# Per-request timeout. Requests are never retried.
timeout_secs = 60
"##
}
