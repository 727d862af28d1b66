use thiserror::Error;

use crate::persistence::PersistenceError;
use crate::settings::{SettingsError, WatchError};

/// Top-level error type for the boot logging engine.
#[derive(Error, Debug)]
pub enum BootLogError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Driver watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Failed to spawn persistence worker: {0}")]
    Spawn(String),

    #[error("Persistence worker already running")]
    AlreadyRunning,

    #[error("Persistence worker is still shutting down")]
    Stopping,

    #[error("Persistence worker terminated abnormally: {0}")]
    WorkerPanicked(String),

    #[error("Record too large: {len} bytes")]
    RecordTooLarge { len: usize },
}
