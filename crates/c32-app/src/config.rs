//! Engine configuration, loaded from YAML.
//!
//! Every section and field has a default, so a partial file (or none at
//! all) is valid.

use std::path::Path;

use c32_core::SystemConfig;
use c32_link::LinkConfig;
use c32_runtime::SchedulerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub link: LinkConfig,
    pub system: SystemConfig,
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> AppResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> AppResult<()> {
        let s = &self.scheduler;
        if s.min_sleep_ms == 0 {
            return Err(AppError::Validation(
                "scheduler.min_sleep_ms must be at least 1".to_string(),
            ));
        }
        if s.max_sleep_ms < s.min_sleep_ms {
            return Err(AppError::Validation(format!(
                "scheduler.max_sleep_ms ({}) is below min_sleep_ms ({})",
                s.max_sleep_ms, s.min_sleep_ms
            )));
        }
        if s.command_queue_capacity == 0 {
            return Err(AppError::Validation(
                "scheduler.command_queue_capacity must be positive".to_string(),
            ));
        }
        if self.link.inbound_capacity == 0 {
            return Err(AppError::Validation(
                "link.inbound_capacity must be positive".to_string(),
            ));
        }
        if self.link.max_message_len < c32_link::REQUEST_HEADER_LEN {
            return Err(AppError::Validation(format!(
                "link.max_message_len must be at least {}",
                c32_link::REQUEST_HEADER_LEN
            )));
        }
        Ok(())
    }
}

/// Load and validate a config file.
pub fn load_yaml(path: &Path) -> AppResult<EngineConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    EngineConfig::from_yaml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("scheduler:\n  max_sleep_ms: 20\n").unwrap();
        assert_eq!(config.scheduler.max_sleep_ms, 20);
        assert_eq!(config.scheduler.min_sleep_ms, 1);
        assert_eq!(config.link, LinkConfig::default());
        assert_eq!(config.system.cpu_frequency_mhz, 240);
    }

    #[test]
    fn empty_document_is_default() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn default_round_trips_through_yaml() {
        let yaml = EngineConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("command_queue_capacity: 32"));
        assert_eq!(EngineConfig::from_yaml_str(&yaml).unwrap(), EngineConfig::default());
    }

    #[test]
    fn inverted_sleep_bounds_are_rejected() {
        let err = EngineConfig::from_yaml_str("scheduler:\n  min_sleep_ms: 50\n  max_sleep_ms: 10\n")
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = EngineConfig::from_yaml_str("scheduler:\n  min_sleep_ms: 0\n").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = EngineConfig::from_yaml_str("link:\n  max_message_len: 4\n").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let path = Path::new("/nonexistent/c32/engine.yaml");
        match load_yaml(path) {
            Err(AppError::ConfigFileRead { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn load_from_disk() {
        let path = std::env::temp_dir().join(format!("c32-engine-{}.yaml", std::process::id()));
        std::fs::write(&path, "link:\n  inbound_capacity: 8\n").unwrap();
        let config = load_yaml(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.link.inbound_capacity, 8);
    }
}
