//! Configuration layering against the shipped configuration files

use batch_replicator::config::ConfigManager;
use batch_replicator::models::StepUnit;
use std::path::PathBuf;
use std::time::Duration;

fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_shipped_base_configuration() {
    let manager =
        ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "development")
            .expect("base configuration should load");
    let config = manager.config();

    assert_eq!(config.defaults.total_count, 1000);
    assert_eq!(config.defaults.time_budget_seconds, 30);
    assert_eq!(config.defaults.step_unit, StepUnit::Day);
    assert_eq!(config.checkpoints.retention(), Duration::from_secs(7 * 86_400));
    assert_eq!(config.checkpoints.key_prefix, "batch_gen_");
    assert_eq!(manager.environment(), "development");
}

#[test]
fn test_environment_overlay_and_variables() {
    std::env::set_var("REPLICATOR__SCHEDULER__RESUME_DELAY_MS", "250");

    let manager = ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "test")
        .expect("test configuration should load");
    let config = manager.config();

    std::env::remove_var("REPLICATOR__SCHEDULER__RESUME_DELAY_MS");

    assert_eq!(config.defaults.total_count, 10);
    assert_eq!(config.defaults.time_budget_seconds, 15);
    assert_eq!(config.defaults.step_interval, 1);
    assert_eq!(config.checkpoints.directory, PathBuf::from("tmp/checkpoints"));
    assert_eq!(config.scheduler.resume_delay(), Duration::from_millis(250));

    let spec = config.defaults.job_spec("1234");
    assert_eq!(spec.total_count, 10);
    assert_eq!(spec.time_budget_seconds, 15);
}
