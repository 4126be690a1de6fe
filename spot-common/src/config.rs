//! Configuration loading and resolution
//!
//! Settings come from four places, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! Command-line and environment values are merged by the binaries (clap reads
//! both); this module locates and parses the TOML file and applies defaults.

use crate::annotation::MalformedClockPolicy;
use crate::extract::DEFAULT_HIGH_RECALL_THRESHOLD;
use crate::timing::{Timeline, DEFAULT_FPS, DEFAULT_HALF_DURATION_SECS};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "SPOT_CONFIG";

/// TOML configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[alignment]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Frame rate of the extracted frames
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Nominal seconds per half
    #[serde(default = "default_half_duration")]
    pub half_duration: f64,
    #[serde(default)]
    pub malformed_clock: MalformedClockPolicy,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            half_duration: DEFAULT_HALF_DURATION_SECS,
            malformed_clock: MalformedClockPolicy::default(),
        }
    }
}

/// `[extraction]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_high_recall_threshold")]
    pub high_recall_threshold: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            high_recall_threshold: DEFAULT_HIGH_RECALL_THRESHOLD,
        }
    }
}

/// `[logging]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

fn default_half_duration() -> f64 {
    DEFAULT_HALF_DURATION_SECS
}

fn default_high_recall_threshold() -> f64 {
    DEFAULT_HIGH_RECALL_THRESHOLD
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: TomlConfig = toml::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Locate and load the config file, falling back to defaults
    ///
    /// An explicitly named file (argument or [`CONFIG_ENV_VAR`]) must exist
    /// and parse. The per-user default file is optional.
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Self::load(path);
        }

        // Priority 2: Environment variable
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }

        // Priority 3: Per-user config file
        if let Some(path) = default_config_path().filter(|p| p.is_file()) {
            return Self::load(&path);
        }

        // Priority 4: Compiled defaults
        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }
}

/// `<user config dir>/spot/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spot").join("config.toml"))
}

/// Resolve alignment parameters: explicit override, else config value
///
/// # Errors
///
/// [`Error::InvalidConfiguration`] if the resulting fps or half duration is
/// not a positive finite number.
pub fn resolve_timeline(config: &AlignmentConfig, fps: Option<f64>, half_duration: Option<f64>) -> Result<Timeline> {
    let fps = fps.unwrap_or(config.fps);
    let half_duration = half_duration.unwrap_or(config.half_duration);
    Timeline::new(fps, half_duration)
}

/// Resolve the high-recall threshold: explicit override, else config value
pub fn resolve_high_recall_threshold(config: &ExtractionConfig, threshold: Option<f64>) -> Result<f64> {
    let threshold = threshold.unwrap_or(config.high_recall_threshold);
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(Error::InvalidConfiguration(format!(
            "high-recall threshold must lie in [0, 1], got {}",
            threshold
        )))
    }
}
