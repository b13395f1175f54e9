use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use loginguard_common::helpers::fs::secure_file;
use loginguard_common::{LoginGuardConfig, LoginGuardConfigStore};
use tracing::*;

pub fn load_config(path: &Path, secure: bool) -> Result<LoginGuardConfig> {
    if secure {
        secure_file(path).context("Could not secure config")?;
    }

    let store: LoginGuardConfigStore = Config::builder()
        .add_source(File::from(path))
        .add_source(Environment::with_prefix("LOGINGUARD").separator("__"))
        .build()
        .context("Could not load config")?
        .try_deserialize()
        .context("Could not parse config")?;

    let config = LoginGuardConfig {
        store,
        paths_relative_to: path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    config.validate().context("Invalid config")?;

    info!(
        "Using config: {path:?} (threshold: {} failures in {} min, lockout: {} min)",
        config.store.detection.max_failed_attempts,
        config.store.detection.time_window_minutes,
        config.store.detection.lockout_duration_minutes,
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_config_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loginguard.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "detection:\n  max_failed_attempts: 5").unwrap();
        drop(file);

        let config = load_config(&path, true).unwrap();
        assert_eq!(config.store.detection.max_failed_attempts, 5);
        assert_eq!(config.store.detection.time_window_minutes, 5);
        assert_eq!(config.paths_relative_to, dir.path());
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loginguard.yaml");
        std::fs::write(&path, "detection:\n  lockout_duration_minutes: 0\n").unwrap();
        assert!(load_config(&path, false).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("nope.yaml"), false).is_err());
    }
}
