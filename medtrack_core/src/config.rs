//! Configuration file support for MedTrack.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/medtrack/config.toml`.

use crate::medications::DEFAULT_TIME_OPTIONS;
use crate::{DoseTime, Error, Medication, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from `config.toml`
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Where users, sessions and medication data live
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
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

/// Schedule and adherence configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Count inactive medications in today's schedule and adherence
    #[serde(default = "default_include_inactive")]
    pub include_inactive: bool,

    /// Slots suggested when adding a medication
    #[serde(default = "default_time_options")]
    pub time_options: Vec<DoseTime>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            include_inactive: default_include_inactive(),
            time_options: default_time_options(),
        }
    }
}

impl ScheduleConfig {
    /// Medications that take part in schedule and adherence calculation
    pub fn tracked(&self, medications: &[Medication]) -> Vec<Medication> {
        medications
            .iter()
            .filter(|m| self.include_inactive || m.is_active)
            .cloned()
            .collect()
    }
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("medtrack")
}

fn default_log_level() -> String {
    "warn".into()
}

fn default_include_inactive() -> bool {
    true
}

fn default_time_options() -> Vec<DoseTime> {
    DEFAULT_TIME_OPTIONS.clone()
}

impl Config {
    /// Read `config.toml` from the user's config directory
    ///
    /// A missing file is not an error; every setting has a default.
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path();
        if !path.exists() {
            tracing::debug!("{:?} not present, running with default settings", path);
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Read and validate a config file at an explicit location
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str::<Config>(&raw)?;
        config.validate()?;
        tracing::debug!("Config read from {:?}", path);
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("medtrack")
            .join("config.toml")
    }

    /// Reject values the rest of the system can't work with
    pub fn validate(&self) -> Result<()> {
        if self.data.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("data.data_dir must not be empty".into()));
        }
        if self.schedule.time_options.is_empty() {
            return Err(Error::Config(
                "schedule.time_options must list at least one slot".into(),
            ));
        }
        Ok(())
    }

    /// Write the config as TOML, creating missing directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let rendered = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("cannot render config as TOML: {}", e)))?;

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, rendered)?;
        tracing::info!("Config written to {:?}", path);
        Ok(())
    }
}
