//! Process wide settings.
//!
//! Settings are read from the environment the first time they are needed,
//! unless [`Settings::install`] ran before. A TOML form is accepted too:
//!
//! ```toml
//! violations = "capture"
//! step-limit = 10000
//! ```

use std::env;
use std::num::NonZeroU64;

use parking_lot::{const_rwlock, RwLock};
use serde::Deserialize;
use thiserror::Error;

pub const VIOLATIONS_ENV: &str = "LAZY_FRAME_VIOLATIONS";
pub const STEP_LIMIT_ENV: &str = "LAZY_FRAME_STEP_LIMIT";

/// What happens when a contract is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationPolicy {
    /// Report the location and terminate the process.
    #[default]
    Abort,
    /// Record the violation and unwind, for tests.
    Capture,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    pub violations: ViolationPolicy,
    /// Default bound on the resume steps a frame may take.
    pub step_limit: Option<NonZeroU64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

impl Settings {
    pub const DEFAULT: Settings = Settings {
        violations: ViolationPolicy::Abort,
        step_limit: None,
    };

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Settings::DEFAULT;

        if let Some(value) = lookup(VIOLATIONS_ENV) {
            settings.violations = match value.trim().to_ascii_lowercase().as_str() {
                "abort" => ViolationPolicy::Abort,
                "capture" => ViolationPolicy::Capture,
                _ => return Err(invalid(VIOLATIONS_ENV, value)),
            };
        }

        if let Some(value) = lookup(STEP_LIMIT_ENV) {
            match value.trim().parse::<NonZeroU64>() {
                Ok(limit) => settings.step_limit = Some(limit),
                Err(_) => return Err(invalid(STEP_LIMIT_ENV, value)),
            }
        }

        Ok(settings)
    }

    /// Makes these settings the process wide ones.
    pub fn install(self) {
        log::debug!("installing {self:?}");
        *CURRENT.write() = Some(self);
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::DEFAULT
    }
}

fn invalid(key: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidEnv { key, value }
}

static CURRENT: RwLock<Option<Settings>> = const_rwlock(None);

/// The installed settings, loaded from the environment on first use.
pub fn settings() -> Settings {
    if let Some(settings) = CURRENT.read().clone() {
        return settings;
    }

    let mut current = CURRENT.write();
    current
        .get_or_insert_with(|| {
            Settings::from_env().unwrap_or_else(|err| {
                log::warn!("{err}, using default settings");
                Settings::DEFAULT
            })
        })
        .clone()
}

pub(crate) fn set_violation_policy(policy: ViolationPolicy) {
    let mut current = settings();
    if current.violations != policy {
        current.violations = policy;
        current.install();
    }
}
