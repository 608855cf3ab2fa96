//! Corrector configuration parsing from slide.toml files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::slide::clock::TickClock;
use crate::slide::constants::{current, legacy, NORMAL_EPSILON};
use crate::slide::math::SlideGains;

/// Preset bundle of gains, thresholds, gate and timestep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Support tracking, small thresholds, fixed 60 Hz step
    #[default]
    Current,
    /// Airborne-only gate, 0.5 m/s threshold, measured frame time
    Legacy,
}

/// Decides whether a tracked character is eligible for correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Supported-state machine driven by support normal changes
    SupportTracking,
    /// Only rejects jumping, falling and flying characters
    AirborneOnly,
}

/// Source of the per-tick `dt`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimestepConfig {
    Fixed { dt: f64 },
    Measured,
}

/// Corrector configuration from slide.toml
///
/// Every optional field overrides the value the profile would pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    pub profile: Profile,
    pub lateral_gain: Option<f64>,
    pub outward_gain: Option<f64>,
    pub min_linear_speed: Option<f64>,
    pub min_angular_speed: Option<f64>,
    /// Support normal change needed to become supported
    pub normal_epsilon: f64,
    pub timestep: Option<TimestepConfig>,
    pub gate: Option<GateMode>,
    /// Emit per-character diagnostics at debug level each tick
    pub diagnostics: bool,
}

impl Default for SlideConfig {
    fn default() -> Self {
        Self::for_profile(Profile::Current)
    }
}

impl SlideConfig {
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            profile,
            lateral_gain: None,
            outward_gain: None,
            min_linear_speed: None,
            min_angular_speed: None,
            normal_epsilon: NORMAL_EPSILON,
            timestep: None,
            gate: None,
            diagnostics: false,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: SlideConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn gains(&self) -> SlideGains {
        let (lateral, outward) = match self.profile {
            Profile::Current => (current::LATERAL_GAIN, current::OUTWARD_GAIN),
            Profile::Legacy => (legacy::LATERAL_GAIN, legacy::OUTWARD_GAIN),
        };
        SlideGains {
            lateral: self.lateral_gain.unwrap_or(lateral),
            outward: self.outward_gain.unwrap_or(outward),
        }
    }

    pub fn min_linear_speed(&self) -> f64 {
        self.min_linear_speed.unwrap_or(match self.profile {
            Profile::Current => current::MIN_LINEAR_SPEED,
            Profile::Legacy => legacy::MIN_LINEAR_SPEED,
        })
    }

    pub fn min_angular_speed(&self) -> f64 {
        self.min_angular_speed.unwrap_or(match self.profile {
            Profile::Current => current::MIN_ANGULAR_SPEED,
            Profile::Legacy => legacy::MIN_ANGULAR_SPEED,
        })
    }

    pub fn gate(&self) -> GateMode {
        self.gate.unwrap_or(match self.profile {
            Profile::Current => GateMode::SupportTracking,
            Profile::Legacy => GateMode::AirborneOnly,
        })
    }

    pub fn timestep(&self) -> TimestepConfig {
        self.timestep.unwrap_or(match self.profile {
            Profile::Current => TimestepConfig::Fixed {
                dt: current::TIMESTEP,
            },
            Profile::Legacy => TimestepConfig::Measured,
        })
    }

    pub fn clock(&self) -> TickClock {
        match self.timestep() {
            TimestepConfig::Fixed { dt } => TickClock::fixed(dt),
            TimestepConfig::Measured => TickClock::measured(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gains = self.gains();
        check_non_negative("lateral_gain", gains.lateral)?;
        check_non_negative("outward_gain", gains.outward)?;
        check_non_negative("min_linear_speed", self.min_linear_speed())?;
        check_non_negative("min_angular_speed", self.min_angular_speed())?;

        if !(self.normal_epsilon.is_finite() && self.normal_epsilon > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "normal_epsilon must be positive, got {}",
                self.normal_epsilon
            )));
        }
        if let TimestepConfig::Fixed { dt } = self.timestep() {
            if !(dt.is_finite() && dt > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "timestep dt must be positive, got {}",
                    dt
                )));
            }
        }
        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        )))
    }
}

/// Errors that can occur when loading corrector configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
