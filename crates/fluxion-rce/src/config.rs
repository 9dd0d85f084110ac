// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Configuration for the RCE price calculator

use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RceError, Result};
use crate::pricing::pse::PSE_API_URL;

fn default_timezone() -> String {
    "Europe/Warsaw".to_owned()
}

fn default_api_url() -> String {
    PSE_API_URL.to_owned()
}

fn default_tax_rate() -> f64 {
    0.23
}

fn default_morning_window() -> HourWindow {
    HourWindow {
        start_hour: 7,
        end_hour: 9,
    }
}

fn default_evening_window() -> HourWindow {
    HourWindow {
        start_hour: 17,
        end_hour: 21,
    }
}

fn default_best_window_duration_hours() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// Time-of-day range `[start_hour, end_hour)` searched for a best window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl HourWindow {
    pub fn span_hours(&self) -> u32 {
        self.end_hour.saturating_sub(self.start_hour)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.start_hour > 23 {
            return Err(RceError::Config(format!(
                "{name}.start_hour must be 0-23, got {}",
                self.start_hour
            )));
        }
        if !(1..=24).contains(&self.end_hour) {
            return Err(RceError::Config(format!(
                "{name}.end_hour must be 1-24, got {}",
                self.end_hour
            )));
        }
        if self.start_hour >= self.end_hour {
            return Err(RceError::Config(format!(
                "{name}: start_hour ({}) must be before end_hour ({})",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RceConfig {
    /// IANA zone the market's wall-clock timestamps are expressed in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// VAT applied when converting to gross kWh prices
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,

    /// Report the current price from the first period of each hour
    #[serde(default)]
    pub use_hourly_prices: bool,

    #[serde(default = "default_morning_window")]
    pub morning_window: HourWindow,

    #[serde(default = "default_evening_window")]
    pub evening_window: HourWindow,

    #[serde(default = "default_best_window_duration_hours")]
    pub best_window_duration_hours: u32,

    /// Fallback log filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RceConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            api_url: default_api_url(),
            tax_rate: default_tax_rate(),
            use_hourly_prices: false,
            morning_window: default_morning_window(),
            evening_window: default_evening_window(),
            best_window_duration_hours: default_best_window_duration_hours(),
            log_level: default_log_level(),
        }
    }
}

impl RceConfig {
    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;

        if self.api_url.trim().is_empty() {
            return Err(RceError::Config("api_url must not be empty".to_owned()));
        }
        if !self.tax_rate.is_finite() || self.tax_rate < 0.0 {
            return Err(RceError::Config(format!(
                "tax_rate must be a non-negative number, got {}",
                self.tax_rate
            )));
        }

        self.morning_window.validate("morning_window")?;
        self.evening_window.validate("evening_window")?;

        if self.best_window_duration_hours == 0 {
            return Err(RceError::Config(
                "best_window_duration_hours must be at least 1".to_owned(),
            ));
        }
        for (name, window) in [
            ("morning_window", self.morning_window),
            ("evening_window", self.evening_window),
        ] {
            if self.best_window_duration_hours > window.span_hours() {
                return Err(RceError::Config(format!(
                    "best_window_duration_hours ({}) does not fit {name} ({}-{})",
                    self.best_window_duration_hours, window.start_hour, window.end_hour
                )));
            }
        }

        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| RceError::UnknownTimezone(self.timezone.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = RceConfig::default();
        assert_eq!(config.timezone, "Europe/Warsaw");
        assert_eq!(config.api_url, PSE_API_URL);
        assert_eq!(config.tax_rate, 0.23);
        assert!(!config.use_hourly_prices);
        assert_eq!(config.morning_window, HourWindow { start_hour: 7, end_hour: 9 });
        assert_eq!(config.evening_window, HourWindow { start_hour: 17, end_hour: 21 });
        assert_eq!(config.best_window_duration_hours, 1);
        assert!(config.validate().is_ok());
        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::Warsaw);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RceConfig::from_toml_str(
            r#"
            use_hourly_prices = true

            [morning_window]
            start_hour = 5
            end_hour = 10
            "#,
        )
        .unwrap();

        assert!(config.use_hourly_prices);
        assert_eq!(config.morning_window.span_hours(), 5);
        assert_eq!(config.evening_window, default_evening_window());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validation_errors() {
        let bad_tz = RceConfig {
            timezone: "Mars/Olympus".to_owned(),
            ..RceConfig::default()
        };
        assert!(matches!(bad_tz.validate(), Err(RceError::UnknownTimezone(_))));

        let inverted = RceConfig {
            evening_window: HourWindow {
                start_hour: 21,
                end_hour: 17,
            },
            ..RceConfig::default()
        };
        assert!(inverted.validate().is_err());

        let too_long = RceConfig {
            best_window_duration_hours: 3,
            ..RceConfig::default()
        };
        assert!(too_long.validate().is_err());

        let negative_tax = RceConfig {
            tax_rate: -0.1,
            ..RceConfig::default()
        };
        assert!(negative_tax.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timezone = \"Europe/Prague\"\ntax_rate = 0.21").unwrap();

        let config = RceConfig::load(file.path()).unwrap();

        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::Prague);
        assert_eq!(config.tax_rate, 0.21);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tax_rate = \"lots\"").unwrap();

        assert!(matches!(
            RceConfig::load(file.path()),
            Err(RceError::ConfigParse(_))
        ));
    }
}
