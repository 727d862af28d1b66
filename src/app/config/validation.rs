use super::{Config, ConfigError};
use crate::app::logging::LogDirective;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_path.file_name().is_none() {
            return Err(ConfigError::InvalidConfig(format!(
                "Log path '{}' does not name a file",
                self.log_path.display()
            )));
        }

        if self.flush_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        if self.retry_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Retry interval must be greater than 0".to_string(),
            ));
        }

        if self.max_pending_records == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Max pending records must be greater than 0 when set".to_string(),
            ));
        }

        for directive in &self.log_directives {
            LogDirective::parse(directive)
                .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        }

        if let Some(settings) = &self.settings_file
            && !settings.exists()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Settings file does not exist: {}",
                settings.display()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let config = Config {
            flush_interval_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            retry_interval_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let config = Config {
            max_pending_records: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_directive_rejected() {
        let config = Config {
            log_directives: vec!["bootlog=loud".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_path_must_name_a_file() {
        let config = Config {
            log_path: PathBuf::from("/"),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
