use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write log file: {0}")]
    Write(#[source] std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid log signature: {0:#010x}")]
    InvalidSignature(u32),
    #[error("Unsupported log format version: {0}")]
    UnsupportedVersion(u32),
    #[error("Unknown architecture tag: {0}")]
    UnknownArchitecture(u32),
    #[error("Truncated log: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("Invalid record length {len} at offset {offset}")]
    InvalidRecordLength { len: usize, offset: usize },
}

impl PersistenceError {
    /// Kind of the underlying I/O failure, if this error came from the filesystem.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            PersistenceError::Open { source, .. } => Some(source.kind()),
            PersistenceError::Write(source) | PersistenceError::Io(source) => Some(source.kind()),
            _ => None,
        }
    }
}
