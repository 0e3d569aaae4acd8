//! TOML-based scheduling configuration.
//!
//! Stores the parameters a build reads:
//! - schedule horizon (`max_days`)
//! - hours available on each weekday
//! - how long expired tasks stay in the archive
//!
//! Configuration is read from `DAYPLAN_CONFIG` if set, otherwise from
//! `~/.config/dayplan/config.toml`. A missing file means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Hours available for tasks on each day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekHours {
    #[serde(default = "default_weekend_hours")]
    pub sunday: f64,
    #[serde(default = "default_weekday_hours")]
    pub monday: f64,
    #[serde(default = "default_weekday_hours")]
    pub tuesday: f64,
    #[serde(default = "default_weekday_hours")]
    pub wednesday: f64,
    #[serde(default = "default_weekday_hours")]
    pub thursday: f64,
    #[serde(default = "default_weekday_hours")]
    pub friday: f64,
    #[serde(default = "default_weekend_hours")]
    pub saturday: f64,
}

/// User scheduling parameters, treated as a snapshot for one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Number of days a build may construct.
    #[serde(default = "default_max_days")]
    pub max_days: u32,
    #[serde(default)]
    pub hours: WeekHours,
    /// Days an expired task is kept in the archive past its due date.
    #[serde(default = "default_archive_days")]
    pub archive_days: u32,
}

fn default_max_days() -> u32 {
    14
}
fn default_archive_days() -> u32 {
    30
}
fn default_weekday_hours() -> f64 {
    8.0
}
fn default_weekend_hours() -> f64 {
    0.0
}

impl Default for WeekHours {
    fn default() -> Self {
        Self {
            sunday: default_weekend_hours(),
            monday: default_weekday_hours(),
            tuesday: default_weekday_hours(),
            wednesday: default_weekday_hours(),
            thursday: default_weekday_hours(),
            friday: default_weekday_hours(),
            saturday: default_weekend_hours(),
        }
    }
}

impl WeekHours {
    /// Same number of hours every day.
    pub fn uniform(hours: f64) -> Self {
        Self {
            sunday: hours,
            monday: hours,
            tuesday: hours,
            wednesday: hours,
            thursday: hours,
            friday: hours,
            saturday: hours,
        }
    }

    pub fn get(&self, day: Weekday) -> f64 {
        match day {
            Weekday::Sun => self.sunday,
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
        }
    }

    /// Day names paired with their hours, Sunday first.
    pub fn entries(&self) -> [(&'static str, f64); 7] {
        [
            ("sunday", self.sunday),
            ("monday", self.monday),
            ("tuesday", self.tuesday),
            ("wednesday", self.wednesday),
            ("thursday", self.thursday),
            ("friday", self.friday),
            ("saturday", self.saturday),
        ]
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            max_days: default_max_days(),
            hours: WeekHours::default(),
            archive_days: default_archive_days(),
        }
    }
}

/// Returns the path to the configuration file.
pub fn config_path() -> PathBuf {
    std::env::var("DAYPLAN_CONFIG").map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("dayplan");
        p.push("config.toml");
        p
    })
}

impl UserConfig {
    /// Loads the configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: UserConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_days".into(),
                message: "must be at least 1".into(),
            });
        }
        for (day, hours) in self.hours.entries() {
            if !hours.is_finite() || !(0.0..=24.0).contains(&hours) {
                return Err(ConfigError::InvalidValue {
                    key: format!("hours.{day}"),
                    message: format!("{hours} is not between 0 and 24"),
                });
            }
        }
        Ok(())
    }

    pub fn hours_for(&self, day: Weekday) -> f64 {
        self.hours.get(day)
    }
}
