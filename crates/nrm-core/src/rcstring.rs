use std::fmt;
use std::sync::Arc;

/// A cheaply-clonable, immutable string, mirroring the reference-counted
/// `nrm_string_t` used throughout the daemon for entity names: every clone
/// of an `Actuator`/`Scope`/`Sensor` name shares the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RcString(Arc<str>);

impl RcString {
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        RcString(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RcString {
    fn from(s: &str) -> Self {
        RcString(Arc::from(s))
    }
}

impl From<String> for RcString {
    fn from(s: String) -> Self {
        RcString(Arc::from(s.as_str()))
    }
}

impl fmt::Display for RcString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::ops::Deref for RcString {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for RcString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for RcString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(RcString::from(s))
    }
}
