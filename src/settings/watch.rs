use super::monitor::DriverMonitorSettings;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Driver '{0}' rejected by watcher: {1}")]
    Rejected(String, String),
    #[error("File system monitoring unavailable: {0}")]
    FileSystems(String),
}

/// Component that watches named drivers for new devices.
pub trait DriverWatch: Send + Sync {
    fn register_driver(
        &self,
        name: &str,
        settings: &DriverMonitorSettings,
    ) -> Result<(), WatchError>;

    fn monitor_file_systems(&self, enable: bool) -> Result<(), WatchError>;
}

/// Records registrations without acting on them.
#[derive(Debug, Default)]
pub struct RecordingDriverWatch {
    drivers: Mutex<Vec<(String, DriverMonitorSettings)>>,
    file_systems: Mutex<Option<bool>>,
}

impl RecordingDriverWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drivers(&self) -> Vec<(String, DriverMonitorSettings)> {
        self.drivers.lock().clone()
    }

    /// Last value passed to `monitor_file_systems`, if any.
    pub fn file_systems(&self) -> Option<bool> {
        *self.file_systems.lock()
    }
}

impl DriverWatch for RecordingDriverWatch {
    fn register_driver(
        &self,
        name: &str,
        settings: &DriverMonitorSettings,
    ) -> Result<(), WatchError> {
        debug!(driver = name, "Registering watched driver");
        self.drivers.lock().push((name.to_string(), settings.clone()));
        Ok(())
    }

    fn monitor_file_systems(&self, enable: bool) -> Result<(), WatchError> {
        debug!(enable, "File system monitoring requested");
        *self.file_systems.lock() = Some(enable);
        Ok(())
    }
}
