mod defaults;

use std::path::PathBuf;

use defaults::*;
use serde::{Deserialize, Serialize};

use crate::{LoginGuardError, Secret};

/// Threshold policy for the detection engine.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DetectionConfig {
    #[serde(default = "_default_max_failed_attempts")]
    pub max_failed_attempts: u32,

    #[serde(default = "_default_time_window_minutes")]
    pub time_window_minutes: u32,

    #[serde(default = "_default_lockout_duration_minutes")]
    pub lockout_duration_minutes: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: _default_max_failed_attempts(),
            time_window_minutes: _default_time_window_minutes(),
            lockout_duration_minutes: _default_lockout_duration_minutes(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), LoginGuardError> {
        if self.max_failed_attempts == 0 {
            return Err(LoginGuardError::Validation(
                "detection.max_failed_attempts must be at least 1".into(),
            ));
        }
        if self.time_window_minutes == 0 {
            return Err(LoginGuardError::Validation(
                "detection.time_window_minutes must be at least 1".into(),
            ));
        }
        if self.lockout_duration_minutes == 0 {
            return Err(LoginGuardError::Validation(
                "detection.lockout_duration_minutes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Reason stored on blocks triggered by the threshold.
    pub fn block_reason(&self) -> String {
        format!(
            "Exceeded {} failed attempts in {} minutes",
            self.max_failed_attempts, self.time_window_minutes
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ManualBlockConfig {
    #[serde(default = "_default_manual_block_minutes")]
    pub duration_minutes: u32,

    #[serde(default = "_default_manual_block_reason")]
    pub default_reason: String,
}

impl Default for ManualBlockConfig {
    fn default() -> Self {
        Self {
            duration_minutes: _default_manual_block_minutes(),
            default_reason: _default_manual_block_reason(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RetentionConfig {
    /// Window used by `attempts --recent` and the security status counters
    #[serde(default = "_default_recent_window_hours")]
    pub recent_window_hours: u32,

    #[serde(default = "_default_history_limit")]
    pub history_limit: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            recent_window_hours: _default_recent_window_hours(),
            history_limit: _default_history_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginGuardConfigStore {
    #[serde(default = "_default_database_url")]
    pub database_url: Secret<String>,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub manual_block: ManualBlockConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Default for LoginGuardConfigStore {
    fn default() -> Self {
        Self {
            database_url: _default_database_url(),
            detection: <_>::default(),
            manual_block: <_>::default(),
            retention: <_>::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginGuardConfig {
    pub store: LoginGuardConfigStore,
    pub paths_relative_to: PathBuf,
}

impl LoginGuardConfig {
    pub fn validate(&self) -> Result<(), LoginGuardError> {
        self.store.detection.validate()?;
        if self.store.manual_block.duration_minutes == 0 {
            return Err(LoginGuardError::Validation(
                "manual_block.duration_minutes must be at least 1".into(),
            ));
        }
        if self.store.database_url.expose_secret().trim().is_empty() {
            return Err(LoginGuardError::Validation(
                "database_url must not be empty".into(),
            ));
        }
        Ok(())
    }
}
