//! Boot-logging settings: the enabled flag, the watched driver and its
//! monitor flags, read from a hierarchical key-value source.

pub mod error;
pub mod monitor;
pub mod source;
pub mod watch;

pub use error::SettingsError;
pub use monitor::{DriverMonitorSettings, FAST_IO_COUNT, IRP_MAJOR_COUNT};
pub use source::{SettingValue, SettingsSource, SettingsTree, WritableSettings};
pub use watch::{DriverWatch, RecordingDriverWatch, WatchError};

use crate::domain::BootLogError;
use tracing::info;

pub const LOG_BOOT_VALUE: &str = "LogBoot";
pub const BOOT_LOGGING_KEY: &str = "BootLogging";
pub const DRIVER_OBJECT_NAME_VALUE: &str = "DriverObjectName";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedDriver {
    pub name: String,
    pub monitor: DriverMonitorSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootSettings {
    pub log_boot: bool,
    pub watched_driver: Option<WatchedDriver>,
}

impl BootSettings {
    /// Absent values and keys fall back to defaults. Values of the wrong
    /// type are errors.
    pub fn load(source: &dyn SettingsSource) -> Result<Self, SettingsError> {
        let log_boot = source.read_u32(LOG_BOOT_VALUE)?.is_some_and(|v| v != 0);

        let watched_driver = match source.subkey(BOOT_LOGGING_KEY) {
            Some(key) => match key.read_string(DRIVER_OBJECT_NAME_VALUE)? {
                Some(name) => Some(WatchedDriver {
                    name,
                    monitor: DriverMonitorSettings::load(key)?,
                }),
                None => None,
            },
            None => None,
        };

        Ok(Self {
            log_boot,
            watched_driver,
        })
    }

    /// Hands the watched driver to the watcher and, when boot logging is on,
    /// asks it to follow file system drivers too.
    pub fn apply(&self, watch: &dyn DriverWatch) -> Result<(), BootLogError> {
        if let Some(driver) = &self.watched_driver {
            info!(driver = %driver.name, "Watching driver from boot settings");
            watch.register_driver(&driver.name, &driver.monitor)?;
        }
        if self.log_boot {
            watch.monitor_file_systems(true)?;
        }
        Ok(())
    }
}

/// Writes the monitor flags under the boot-logging subkey, creating it
/// when needed.
pub fn save_monitor_settings(
    target: &mut dyn WritableSettings,
    settings: &DriverMonitorSettings,
) -> Result<(), SettingsError> {
    let key = target.create_subkey(BOOT_LOGGING_KEY)?;
    settings.save(key)
}
