use super::error::SettingsError;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    U32(u32),
    String(String),
}

impl SettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::U32(_) => "u32",
            SettingValue::String(_) => "string",
        }
    }
}

/// Hierarchical key-value settings store. Names are case-insensitive.
pub trait SettingsSource: Send + Sync {
    fn value(&self, name: &str) -> Option<&SettingValue>;

    fn subkey(&self, name: &str) -> Option<&dyn SettingsSource>;

    /// Absent values are `Ok(None)`; a value of another type is an error.
    fn read_u32(&self, name: &str) -> Result<Option<u32>, SettingsError> {
        match self.value(name) {
            None => Ok(None),
            Some(SettingValue::U32(v)) => Ok(Some(*v)),
            Some(other) => Err(SettingsError::TypeMismatch {
                name: name.to_string(),
                expected: "u32",
                found: other.type_name(),
            }),
        }
    }

    /// Absent values are `Ok(None)`. A single trailing NUL is stripped.
    fn read_string(&self, name: &str) -> Result<Option<String>, SettingsError> {
        match self.value(name) {
            None => Ok(None),
            Some(SettingValue::String(s)) => Ok(Some(
                s.strip_suffix('\0').unwrap_or(s.as_str()).to_string(),
            )),
            Some(other) => Err(SettingsError::TypeMismatch {
                name: name.to_string(),
                expected: "string",
                found: other.type_name(),
            }),
        }
    }
}

pub trait WritableSettings: SettingsSource {
    fn set_value(&mut self, name: &str, value: SettingValue) -> Result<(), SettingsError>;

    /// Opens the named subkey, creating it when absent.
    fn create_subkey(&mut self, name: &str) -> Result<&mut dyn WritableSettings, SettingsError>;
}

/// In-memory settings tree, loadable from TOML where tables are subkeys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsTree {
    values: BTreeMap<String, SettingValue>,
    subkeys: BTreeMap<String, SettingsTree>,
}

impl SettingsTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_u32(mut self, name: &str, value: u32) -> Self {
        self.insert(name, SettingValue::U32(value));
        self
    }

    pub fn with_string(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, SettingValue::String(value.into()));
        self
    }

    pub fn with_subkey(mut self, name: &str, subkey: SettingsTree) -> Self {
        self.subkeys.insert(name.to_lowercase(), subkey);
        self
    }

    pub fn insert(&mut self, name: &str, value: SettingValue) {
        self.values.insert(name.to_lowercase(), value);
    }

    pub fn subkey_mut(&mut self, name: &str) -> &mut SettingsTree {
        self.subkeys.entry(name.to_lowercase()).or_default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let table: toml::Table = toml::from_str(content)?;
        Self::from_table(&table, "")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn from_table(table: &toml::Table, prefix: &str) -> Result<Self, SettingsError> {
        let mut tree = SettingsTree::new();
        for (name, value) in table {
            let qualified = format!("{prefix}{name}");
            match value {
                toml::Value::Integer(i) => {
                    let v = u32::try_from(*i).map_err(|_| SettingsError::InvalidValue {
                        name: qualified.clone(),
                        reason: format!("{i} does not fit in u32"),
                    })?;
                    tree.insert(name, SettingValue::U32(v));
                }
                toml::Value::Boolean(b) => tree.insert(name, SettingValue::U32(u32::from(*b))),
                toml::Value::String(s) => tree.insert(name, SettingValue::String(s.clone())),
                toml::Value::Table(sub) => {
                    let child = Self::from_table(sub, &format!("{qualified}\\"))?;
                    tree.subkeys.insert(name.to_lowercase(), child);
                }
                other => {
                    return Err(SettingsError::InvalidValue {
                        name: qualified,
                        reason: format!("unsupported value type {}", other.type_str()),
                    });
                }
            }
        }
        Ok(tree)
    }
}

impl SettingsSource for SettingsTree {
    fn value(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(&name.to_lowercase())
    }

    fn subkey(&self, name: &str) -> Option<&dyn SettingsSource> {
        self.subkeys
            .get(&name.to_lowercase())
            .map(|s| s as &dyn SettingsSource)
    }
}

impl WritableSettings for SettingsTree {
    fn set_value(&mut self, name: &str, value: SettingValue) -> Result<(), SettingsError> {
        self.insert(name, value);
        Ok(())
    }

    fn create_subkey(&mut self, name: &str) -> Result<&mut dyn WritableSettings, SettingsError> {
        Ok(self.subkey_mut(name))
    }
}
