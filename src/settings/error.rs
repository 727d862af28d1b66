use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Setting '{name}' has type {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}
