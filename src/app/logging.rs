use super::config::LogLevel;
use parking_lot::RwLock;
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid directive format '{input}'. Expected: 'target=level'")]
    InvalidDirectiveFormat { input: String },

    #[error("Empty target in directive '{input}'")]
    EmptyTarget { input: String },

    #[error("Invalid level in directive '{input}'")]
    InvalidLevel { input: String },

    #[error("Logging system initialization failed: {details}")]
    InitFailed { details: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn parse(directive: &str) -> Result<Self, LoggingError> {
        let Some((target, level)) = directive.split_once('=') else {
            return Err(LoggingError::InvalidDirectiveFormat {
                input: directive.to_string(),
            });
        };

        let target = target.trim();
        if target.is_empty() {
            return Err(LoggingError::EmptyTarget {
                input: directive.to_string(),
            });
        }
        let level = level.parse().map_err(|_| LoggingError::InvalidLevel {
            input: directive.to_string(),
        })?;

        Ok(Self::new(target, level))
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

/// Accumulates filter directives and installs the global subscriber.
#[derive(Debug, Default)]
pub struct LoggingSystem {
    directives: RwLock<Vec<LogDirective>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_directive(&self, directive: &str) -> Result<(), LoggingError> {
        let parsed = LogDirective::parse(directive)?;
        self.directives.write().push(parsed);
        Ok(())
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();
        std::iter::once(default_level.as_str().to_string())
            .chain(directives.iter().map(LogDirective::to_filter_string))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    pub fn initialize_tracing(&self, default_level: LogLevel) -> Result<(), LoggingError> {
        let filter_string = self.build_filter_string(default_level);
        let env_filter =
            EnvFilter::try_new(&filter_string).map_err(|e| LoggingError::InitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}': {e}"),
            })?;

        let subscriber = tracing_subscriber::registry().with(env_filter).with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .compact(),
        );

        tracing::subscriber::set_global_default(subscriber).map_err(|e| {
            LoggingError::InitFailed {
                details: format!("Failed to set global tracing subscriber: {e}"),
            }
        })
    }
}

/// Installs the subscriber once per process. Later calls report whether the
/// first one succeeded.
pub fn setup_logging_safe(level: LogLevel, directives: &[String]) -> Result<(), LoggingError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let outcome = INIT.get_or_init(|| {
        let system = LoggingSystem::new();
        for directive in directives {
            system.add_directive(directive).map_err(|e| e.to_string())?;
        }
        system.initialize_tracing(level).map_err(|e| e.to_string())
    });

    outcome
        .clone()
        .map_err(|details| LoggingError::InitFailed { details })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_parse_directive() {
        let directive = LogDirective::parse("bootlog::persistence = debug").unwrap();
        assert_eq!(directive.target, "bootlog::persistence");
        assert_eq!(directive.level, LogLevel::Debug);
        assert_eq!(directive.to_filter_string(), "bootlog::persistence=debug");
    }

    #[test]
    fn test_parse_rejects_malformed_directives() {
        assert!(matches!(
            LogDirective::parse("bootlog"),
            Err(LoggingError::InvalidDirectiveFormat { .. })
        ));
        assert!(matches!(
            LogDirective::parse("=info"),
            Err(LoggingError::EmptyTarget { .. })
        ));
        assert!(matches!(
            LogDirective::parse("bootlog=chatty"),
            Err(LoggingError::InvalidLevel { .. })
        ));
    }

    #[test]
    fn test_build_filter_string() {
        let system = LoggingSystem::new();
        assert_eq!(system.build_filter_string(LogLevel::Info), "info");

        system.add_directive("tokio=warn").unwrap();
        system.add_directive("bootlog::buffer=trace").unwrap();
        assert_eq!(
            system.build_filter_string(LogLevel::Debug),
            "debug,tokio=warn,bootlog::buffer=trace"
        );
    }

    #[test]
    fn test_concurrent_directive_modification() {
        let system = Arc::new(LoggingSystem::new());

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let system = Arc::clone(&system);
                thread::spawn(move || {
                    system.add_directive(&format!("target{i}=info")).unwrap();
                    system.build_filter_string(LogLevel::Info)
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().is_ok());
        }
        assert_eq!(system.directive_count(), 50);
    }

    #[test]
    fn test_setup_logging_safe_is_repeatable() {
        let first = setup_logging_safe(LogLevel::Info, &[]).is_ok();
        let second = setup_logging_safe(LogLevel::Debug, &[]).is_ok();
        assert_eq!(first, second);
    }
}
