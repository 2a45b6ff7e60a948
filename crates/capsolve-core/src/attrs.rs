use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use semver::Version;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::version::{VersionError, coerce_version, display_version};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttrError {
    #[error("unsupported attribute type `{0}`")]
    UnsupportedType(String),
    #[error("invalid {ty} value `{value}`")]
    InvalidValue { ty: &'static str, value: String },
    #[error(transparent)]
    Version(#[from] VersionError),
}

/// A typed attribute value, as declared in manifests and repository indexes.
#[derive(Debug, Clone)]
pub enum AttrValue {
    String(String),
    Long(i64),
    Double(f64),
    Version(Version),
    List(Vec<AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Version view of the value; strings are coerced, anything else is `None`.
    pub fn as_version(&self) -> Option<Version> {
        match self {
            Self::Version(version) => Some(version.clone()),
            Self::String(raw) => coerce_version(raw).ok(),
            _ => None,
        }
    }

    /// Build a value from its textual form and an explicit type such as
    /// `Version`, `Long` or `List<String>`.
    pub fn parse_typed(ty: &str, raw: &str) -> Result<Self, AttrError> {
        let ty = ty.trim();
        if let Some(inner) = ty
            .strip_prefix("List<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            let items = raw
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Self::parse_scalar(inner, item))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::List(items));
        }
        if ty == "List" {
            return Self::parse_typed("List<String>", raw);
        }
        Self::parse_scalar(ty, raw)
    }

    fn parse_scalar(ty: &str, raw: &str) -> Result<Self, AttrError> {
        match ty.trim() {
            "String" => Ok(Self::String(raw.to_string())),
            "Version" => Ok(Self::Version(coerce_version(raw)?)),
            "Long" => raw
                .trim()
                .parse::<i64>()
                .map(Self::Long)
                .map_err(|_| AttrError::InvalidValue {
                    ty: "Long",
                    value: raw.to_string(),
                }),
            "Double" => raw
                .trim()
                .parse::<f64>()
                .map(Self::Double)
                .map_err(|_| AttrError::InvalidValue {
                    ty: "Double",
                    value: raw.to_string(),
                }),
            other => Err(AttrError::UnsupportedType(other.to_string())),
        }
    }

    fn type_name(&self) -> Option<String> {
        match self {
            Self::String(_) => None,
            Self::Long(_) => Some("Long".to_string()),
            Self::Double(_) => Some("Double".to_string()),
            Self::Version(_) => Some("Version".to_string()),
            Self::List(items) => {
                let inner = items
                    .first()
                    .and_then(Self::type_name)
                    .unwrap_or_else(|| "String".to_string());
                Some(format!("List<{inner}>"))
            }
        }
    }

    fn from_json(ty: Option<&str>, value: &Value) -> Result<Self, AttrError> {
        if let Some(ty) = ty {
            return match value {
                Value::String(raw) => Self::parse_typed(ty, raw),
                Value::Array(items) => {
                    let inner = ty
                        .strip_prefix("List<")
                        .and_then(|rest| rest.strip_suffix('>'))
                        .unwrap_or("String");
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(raw) => Self::parse_scalar(inner, raw),
                            other => Self::parse_scalar(inner, &other.to_string()),
                        })
                        .collect::<Result<Vec<_>, _>>()
                        .map(Self::List)
                }
                other => Self::parse_typed(ty, &other.to_string()),
            };
        }
        match value {
            Value::String(raw) => Ok(Self::String(raw.clone())),
            Value::Number(number) => match number.as_i64() {
                Some(long) => Ok(Self::Long(long)),
                None => Ok(Self::Double(number.as_f64().unwrap_or_default())),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| Self::from_json(None, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Bool(flag) => Ok(Self::String(flag.to_string())),
            other => Err(AttrError::InvalidValue {
                ty: "String",
                value: other.to_string(),
            }),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::String(value) => Value::String(value.clone()),
            Self::Long(value) => Value::from(*value),
            Self::Double(value) => Value::from(*value),
            Self::Version(version) => Value::String(display_version(version)),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Version(a), Self::Version(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttrValue {}

impl Hash for AttrValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::String(value) => value.hash(state),
            Self::Long(value) => value.hash(state),
            Self::Double(value) => value.to_bits().hash(state),
            Self::Version(version) => version.hash(state),
            Self::List(items) => items.hash(state),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Long(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Version(version) => f.write_str(&display_version(version)),
            Self::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Version> for AttrValue {
    fn from(value: Version) -> Self {
        Self::Version(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

/// Combine per-entry hashes so that insertion order does not matter, in line
/// with map equality.
pub(crate) fn unordered_hash<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> u64
where
    K: Hash + 'a,
    V: Hash + 'a,
{
    entries.fold(0u64, |acc, (key, value)| {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        value.hash(&mut hasher);
        acc.wrapping_add(hasher.finish())
    })
}

/// Ordered attribute map. Equality and hashing ignore insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(IndexMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    /// Lookup that falls back to a case-insensitive match, as filters do.
    pub fn get_ignore_case(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert a JSON object whose keys may carry a `:Type` suffix.
    pub fn from_json_map(map: &IndexMap<String, Value>) -> Result<Self, AttrError> {
        let mut attributes = Self::new();
        for (key, value) in map {
            let (name, ty) = match key.split_once(':') {
                Some((name, ty)) => (name.trim(), Some(ty.trim())),
                None => (key.trim(), None),
            };
            attributes.insert(name, AttrValue::from_json(ty, value)?);
        }
        Ok(attributes)
    }
}

impl Hash for Attributes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(unordered_hash(self.0.iter()));
    }
}

impl FromIterator<(String, AttrValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, AttrValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        Self::from_json_map(&raw).map_err(D::Error::custom)
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: IndexMap<String, Value> = self
            .0
            .iter()
            .map(|(name, value)| {
                let key = match value.type_name() {
                    Some(ty) => format!("{name}:{ty}"),
                    None => name.clone(),
                };
                (key, value.to_json())
            })
            .collect();
        map.serialize(serializer)
    }
}

/// Ordered directive map (`filter:=`, `resolution:=`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directives(IndexMap<String, String>);

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Hash for Directives {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(unordered_hash(self.0.iter()));
    }
}

impl FromIterator<(String, String)> for Directives {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
