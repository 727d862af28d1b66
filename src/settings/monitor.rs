use super::error::SettingsError;
use super::source::{SettingValue, SettingsSource, WritableSettings};
use serde::Serialize;

/// Number of IRP major function codes.
pub const IRP_MAJOR_COUNT: usize = 28;
/// Number of fast I/O dispatch callbacks.
pub const FAST_IO_COUNT: usize = 27;

/// What the driver watcher monitors for a registered driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverMonitorSettings {
    pub new_devices: bool,
    pub irp: bool,
    pub fast_io: bool,
    pub irp_completion: bool,
    pub start_io: bool,
    pub add_device: bool,
    pub unload: bool,
    pub data: bool,
    pub irp_settings: [bool; IRP_MAJOR_COUNT],
    pub fast_io_settings: [bool; FAST_IO_COUNT],
}

impl Default for DriverMonitorSettings {
    fn default() -> Self {
        Self {
            new_devices: false,
            irp: false,
            fast_io: false,
            irp_completion: false,
            start_io: false,
            add_device: false,
            unload: false,
            data: false,
            irp_settings: [true; IRP_MAJOR_COUNT],
            fast_io_settings: [true; FAST_IO_COUNT],
        }
    }
}

impl DriverMonitorSettings {
    const FLAG_NAMES: [&'static str; 8] = [
        "NewDevices",
        "IRP",
        "FastIo",
        "IRPCompletion",
        "StartIo",
        "AddDevice",
        "Unload",
        "Data",
    ];

    fn flags_mut(&mut self) -> [&mut bool; 8] {
        [
            &mut self.new_devices,
            &mut self.irp,
            &mut self.fast_io,
            &mut self.irp_completion,
            &mut self.start_io,
            &mut self.add_device,
            &mut self.unload,
            &mut self.data,
        ]
    }

    fn flags(&self) -> [bool; 8] {
        [
            self.new_devices,
            self.irp,
            self.fast_io,
            self.irp_completion,
            self.start_io,
            self.add_device,
            self.unload,
            self.data,
        ]
    }

    /// Reads the eight monitor flags. Absent flags keep their default.
    pub fn load(key: &dyn SettingsSource) -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        for (name, flag) in Self::FLAG_NAMES.into_iter().zip(settings.flags_mut()) {
            if let Some(value) = key.read_u32(name)? {
                *flag = value != 0;
            }
        }
        Ok(settings)
    }

    /// Writes the eight monitor flags as u32 values. Stops at the first failure.
    pub fn save(&self, key: &mut dyn WritableSettings) -> Result<(), SettingsError> {
        for (name, flag) in Self::FLAG_NAMES.into_iter().zip(self.flags()) {
            key.set_value(name, SettingValue::U32(u32::from(flag)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsTree;

    #[test]
    fn test_defaults_disable_flags_and_enable_tables() {
        let settings = DriverMonitorSettings::default();
        assert!(!settings.irp);
        assert!(!settings.data);
        assert!(settings.irp_settings.iter().all(|&v| v));
        assert!(settings.fast_io_settings.iter().all(|&v| v));
    }

    #[test]
    fn test_load_reads_present_flags_only() {
        let key = SettingsTree::new()
            .with_u32("IRP", 1)
            .with_u32("Data", 7)
            .with_u32("Unload", 0);
        let settings = DriverMonitorSettings::load(&key).unwrap();

        assert!(settings.irp);
        assert!(settings.data);
        assert!(!settings.unload);
        assert!(!settings.new_devices);
    }

    #[test]
    fn test_load_rejects_string_flag() {
        let key = SettingsTree::new().with_string("FastIo", "1");
        assert!(matches!(
            DriverMonitorSettings::load(&key),
            Err(SettingsError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_save_then_load() {
        let settings = DriverMonitorSettings {
            irp_completion: true,
            start_io: true,
            ..Default::default()
        };
        let mut key = SettingsTree::new();
        settings.save(&mut key).unwrap();

        assert_eq!(key.read_u32("StartIo").unwrap(), Some(1));
        assert_eq!(key.read_u32("IRP").unwrap(), Some(0));
        assert_eq!(DriverMonitorSettings::load(&key).unwrap(), settings);
    }
}
