//! Owned plugin metadata and setting values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata a plugin reports about itself.
///
/// # Example
///
/// ```
/// use plotline_plugin_abi::PluginInfo;
///
/// let info = PluginInfo::new("table", "1.2.0").with_description("data table editor");
/// assert_eq!(info.name(), "table");
/// assert_eq!(info.description(), "data table editor");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    name: String,
    version: String,
    #[serde(default)]
    description: String,
}

impl PluginInfo {
    /// Creates metadata with an empty description.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the plugin version string.
    #[must_use]
    pub const fn version(&self) -> &str {
        self.version.as_str()
    }

    /// Returns the description, empty when the plugin did not provide one.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }
}

/// Discriminant of a [`SettingValue`], as carried in
/// [`RawSettingValue::kind`](crate::RawSettingValue::kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Double,
    /// UTF-8 text.
    String,
}

impl SettingKind {
    /// Returns the wire code for this kind.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Integer => 0,
            Self::Double => 1,
            Self::String => 2,
        }
    }

    /// Decodes a wire code, returning `None` for unknown values.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Integer),
            1 => Some(Self::Double),
            2 => Some(Self::String),
            _ => None,
        }
    }

    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed value of a plugin setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SettingValue {
    /// Integer setting.
    Integer(i64),
    /// Floating-point setting.
    Double(f64),
    /// Text setting.
    String(String),
}

impl SettingValue {
    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(&self) -> SettingKind {
        match self {
            Self::Integer(_) => SettingKind::Integer,
            Self::Double(_) => SettingKind::Double,
            Self::String(_) => SettingKind::String,
        }
    }

    /// Parses `text` as a value of the given kind.
    ///
    /// Returns `None` when the text is not a valid literal for `kind`.
    ///
    /// ```
    /// use plotline_plugin_abi::{SettingKind, SettingValue};
    ///
    /// assert_eq!(
    ///     SettingValue::parse(SettingKind::Integer, "12"),
    ///     Some(SettingValue::Integer(12)),
    /// );
    /// assert_eq!(SettingValue::parse(SettingKind::Integer, "twelve"), None);
    /// ```
    #[must_use]
    pub fn parse(kind: SettingKind, text: &str) -> Option<Self> {
        match kind {
            SettingKind::Integer => text.trim().parse().ok().map(Self::Integer),
            SettingKind::Double => text.trim().parse().ok().map(Self::Double),
            SettingKind::String => Some(Self::String(text.to_owned())),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
        }
    }
}

/// A named, typed configuration value exposed by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingItem {
    name: String,
    value: SettingValue,
}

impl SettingItem {
    /// Creates a setting item.
    #[must_use]
    pub fn new(name: impl Into<String>, value: SettingValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Returns the setting name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the current value.
    #[must_use]
    pub const fn value(&self) -> &SettingValue {
        &self.value
    }

    /// Splits the item into its name and value.
    #[must_use]
    pub fn into_parts(self) -> (String, SettingValue) {
        (self.name, self.value)
    }
}
