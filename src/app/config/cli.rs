use super::serde_helpers::{
    load_env_list, load_env_path, load_env_path_opt, load_env_var, load_env_var_opt,
};
use super::{ConfigError, LogLevel};
use crate::lifecycle::{DEFAULT_LOG_PATH, EngineConfig};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Persist each line read from stdin as a boot log record
    Record,
    /// Print the header and records of a boot log file
    Dump {
        /// Log file to decode
        file: PathBuf,
        /// Emit one JSON object per line
        #[arg(long)]
        json: bool,
        /// Include a hex preview of each payload
        #[arg(long)]
        hex: bool,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Boot log file, truncated whenever the worker opens it
    #[arg(long, env = "BOOTLOG_LOG_PATH", default_value = DEFAULT_LOG_PATH, global = true)]
    pub log_path: PathBuf,

    /// Pause between flush cycles in milliseconds
    #[arg(long, env = "BOOTLOG_FLUSH_INTERVAL_MS", default_value = "1000", global = true)]
    pub flush_interval_ms: u64,

    /// Pause before reopening the log file after a failure, in milliseconds
    #[arg(long, env = "BOOTLOG_RETRY_INTERVAL_MS", default_value = "1000", global = true)]
    pub retry_interval_ms: u64,

    /// Drop the oldest pending records beyond this count
    #[arg(long, env = "BOOTLOG_MAX_PENDING_RECORDS", global = true)]
    pub max_pending_records: Option<usize>,

    /// Log level
    #[arg(long, env = "BOOTLOG_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Extra `target=level` filter directives
    #[arg(long = "log-directive", env = "BOOTLOG_LOG_DIRECTIVES", value_delimiter = ',', global = true)]
    pub log_directives: Vec<String>,

    /// Boot settings (LogBoot, BootLogging subkey) as TOML
    #[arg(long, env = "BOOTLOG_SETTINGS_FILE", global = true)]
    pub settings_file: Option<PathBuf>,

    /// Configuration file path (optional)
    #[serde(skip)]
    #[arg(long, env = "BOOTLOG_CONFIG_FILE", global = true)]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            flush_interval_ms: 1000,
            retry_interval_ms: 1000,
            max_pending_records: None,
            log_level: LogLevel::Info,
            log_directives: Vec::new(),
            settings_file: None,
            config_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_path("BOOTLOG_LOG_PATH", &mut config.log_path);
        load_env_var("BOOTLOG_FLUSH_INTERVAL_MS", &mut config.flush_interval_ms)?;
        load_env_var("BOOTLOG_RETRY_INTERVAL_MS", &mut config.retry_interval_ms)?;
        load_env_var_opt("BOOTLOG_MAX_PENDING_RECORDS", &mut config.max_pending_records)?;
        load_env_var("BOOTLOG_LOG_LEVEL", &mut config.log_level)?;
        load_env_list("BOOTLOG_LOG_DIRECTIVES", &mut config.log_directives);
        load_env_path_opt("BOOTLOG_SETTINGS_FILE", &mut config.settings_file);
        load_env_path_opt("BOOTLOG_CONFIG_FILE", &mut config.config_file);

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// The command line (with env fallbacks) unless a config file is named,
    /// in which case the file wins.
    pub fn resolve(self) -> Result<Self, ConfigError> {
        match &self.config_file {
            Some(path) => {
                let mut config = Self::from_file(path)?;
                config.config_file = Some(path.clone());
                Ok(config)
            }
            None => {
                self.validate()?;
                Ok(self)
            }
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            log_path: self.log_path.clone(),
            flush_interval: self.flush_interval(),
            retry_interval: self.retry_interval(),
            max_pending_records: self.max_pending_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_with_overrides() {
        let cli = Cli::try_parse_from([
            "bootlog",
            "--log-path",
            "/tmp/boot.bin",
            "--max-pending-records",
            "500",
            "record",
        ])
        .unwrap();

        assert_eq!(cli.command, Command::Record);
        assert_eq!(cli.config.log_path, PathBuf::from("/tmp/boot.bin"));
        assert_eq!(cli.config.engine_config().max_pending_records, Some(500));
    }

    #[test]
    fn test_parse_dump_flags() {
        let cli = Cli::try_parse_from(["bootlog", "dump", "boot.bin", "--json", "--hex"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Dump {
                file: PathBuf::from("boot.bin"),
                json: true,
                hex: true,
            }
        );
    }

    #[test]
    fn test_file_config_uses_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bootlog.toml");
        std::fs::write(&path, "flush_interval_ms = 200\nlog_level = \"debug\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.flush_interval(), Duration::from_millis(200));
        assert_eq!(config.retry_interval(), Duration::from_millis(1000));
        assert_eq!(config.log_level, LogLevel::Debug);
    }
}
