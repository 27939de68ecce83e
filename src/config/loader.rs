//! Configuration Loader
//!
//! Environment-aware loading: file discovery, environment detection, and
//! layering of YAML files and `REPLICATOR__*` variables over built-in defaults.

use super::ReplicatorConfig;
use crate::error::Result;
use crate::logging::get_environment;
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const CONFIG_FILE_STEM: &str = "replicator";
const ENV_PREFIX: &str = "REPLICATOR";
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ReplicatorConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        debug!(
            environment = %environment,
            retention_seconds = config.checkpoints.retention_seconds,
            checkpoint_directory = %config.checkpoints.directory.display(),
            time_budget_seconds = config.defaults.time_budget_seconds,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: ReplicatorConfig, environment: &str) -> Result<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ReplicatorConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect environment from environment variables
    pub fn detect_environment() -> String {
        get_environment().to_lowercase()
    }

    /// Base file, then the environment file, then environment variables.
    /// Missing files are skipped; fields nobody sets keep their defaults.
    fn load_and_merge_config(config_dir: &Path, environment: &str) -> Result<ReplicatorConfig> {
        let base_file = config_dir.join(format!("{CONFIG_FILE_STEM}.yaml"));
        let env_file = config_dir.join(format!("{CONFIG_FILE_STEM}.{environment}.yaml"));

        for path in [&base_file, &env_file] {
            if path.exists() {
                debug!("Merging configuration file: {}", path.display());
            }
        }

        let config = Config::builder()
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(env_file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepUnit;
    use std::fs;

    #[test]
    fn test_missing_directory_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().join("absent")), "test")
                .unwrap();
        assert_eq!(manager.config(), &ReplicatorConfig::default());
        assert_eq!(manager.environment(), "test");
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("replicator.yaml"),
            "defaults:\n  time_budget_seconds: 45\n  step_unit: month\ncheckpoints:\n  key_prefix: base_\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("replicator.staging.yaml"),
            "checkpoints:\n  key_prefix: staging_\n",
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "staging")
                .unwrap();
        let config = manager.config();
        assert_eq!(config.defaults.time_budget_seconds, 45);
        assert_eq!(config.defaults.step_unit, StepUnit::Month);
        assert_eq!(config.defaults.total_count, 1000);
        assert_eq!(config.checkpoints.key_prefix, "staging_");
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("replicator.yaml"),
            "defaults:\n  time_budget_seconds: 2\n",
        )
        .unwrap();

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(result.is_err());
    }
}
