use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Version};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("empty version string")]
    Empty,
    #[error("invalid version `{value}`: {reason}")]
    Invalid { value: String, reason: String },
    #[error("invalid version range `{value}`: {reason}")]
    InvalidRange { value: String, reason: String },
}

/// `0.0.0`, the version of anything that does not declare one.
pub fn empty_version() -> Version {
    Version::new(0, 0, 0)
}

/// Parse an OSGi `major[.minor[.micro[.qualifier]]]` version into a semver
/// value. Missing components are zero; the qualifier becomes build metadata
/// with `_` mapped to `-`.
pub fn coerce_version(raw: &str) -> Result<Version, VersionError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(VersionError::Empty);
    }
    let mut parts = value.splitn(4, '.');
    let major = parse_component(value, parts.next().unwrap_or_default())?;
    let minor = match parts.next() {
        Some(part) => parse_component(value, part)?,
        None => 0,
    };
    let micro = match parts.next() {
        Some(part) => parse_component(value, part)?,
        None => 0,
    };
    let mut version = Version::new(major, minor, micro);
    if let Some(qualifier) = parts.next() {
        let valid = !qualifier.is_empty()
            && qualifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(VersionError::Invalid {
                value: value.to_string(),
                reason: format!("invalid qualifier `{qualifier}`"),
            });
        }
        version.build =
            BuildMetadata::new(&qualifier.replace('_', "-")).map_err(|err| {
                VersionError::Invalid {
                    value: value.to_string(),
                    reason: err.to_string(),
                }
            })?;
    }
    Ok(version)
}

fn parse_component(value: &str, part: &str) -> Result<u64, VersionError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::Invalid {
            value: value.to_string(),
            reason: format!("`{part}` is not a numeric component"),
        });
    }
    part.parse::<u64>().map_err(|err| VersionError::Invalid {
        value: value.to_string(),
        reason: err.to_string(),
    })
}

/// Render a version the way manifests spell it (`1.2.3.qualifier`).
pub fn display_version(version: &Version) -> String {
    if version.build.is_empty() {
        format!("{}.{}.{}", version.major, version.minor, version.patch)
    } else {
        format!(
            "{}.{}.{}.{}",
            version.major,
            version.minor,
            version.patch,
            version.build.as_str()
        )
    }
}

/// An interval of versions: `[1.0,2.0)`, `(1.0,2.0]`, or a bare `1.0`
/// meaning "1.0 or later".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    low: Version,
    low_inclusive: bool,
    high: Option<Version>,
    high_inclusive: bool,
}

impl VersionRange {
    pub fn at_least(low: Version) -> Self {
        Self {
            low,
            low_inclusive: true,
            high: None,
            high_inclusive: false,
        }
    }

    pub fn between(low: Version, low_inclusive: bool, high: Version, high_inclusive: bool) -> Self {
        Self {
            low,
            low_inclusive,
            high: Some(high),
            high_inclusive,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let value = raw.trim();
        let Some(first) = value.chars().next() else {
            return Err(VersionError::Empty);
        };
        if first != '[' && first != '(' {
            return Ok(Self::at_least(coerce_version(value)?));
        }
        let invalid = |reason: &str| VersionError::InvalidRange {
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let last = value.chars().last().unwrap_or(first);
        if value.len() < 2 || (last != ']' && last != ')') {
            return Err(invalid("missing closing `]` or `)`"));
        }
        let body = &value[1..value.len() - 1];
        let Some((low, high)) = body.split_once(',') else {
            return Err(invalid("expected `low,high`"));
        };
        let low = coerce_version(low)?;
        let high = coerce_version(high)?;
        if high < low {
            return Err(invalid("upper bound is below lower bound"));
        }
        Ok(Self::between(low, first == '[', high, last == ']'))
    }

    pub fn low(&self) -> &Version {
        &self.low
    }

    pub fn high(&self) -> Option<&Version> {
        self.high.as_ref()
    }

    pub fn includes(&self, version: &Version) -> bool {
        let above_low = if self.low_inclusive {
            version >= &self.low
        } else {
            version > &self.low
        };
        if !above_low {
            return false;
        }
        match &self.high {
            Some(high) if self.high_inclusive => version <= high,
            Some(high) => version < high,
            None => true,
        }
    }

    /// Express the range as a filter over `attribute`.
    pub fn to_filter(&self, attribute: &str) -> String {
        let low = display_version(&self.low);
        let low_part = if self.low_inclusive {
            format!("({attribute}>={low})")
        } else {
            format!("(!({attribute}<={low}))")
        };
        let Some(high) = &self.high else {
            return low_part;
        };
        let high = display_version(high);
        let high_part = if self.high_inclusive {
            format!("({attribute}<={high})")
        } else {
            format!("(!({attribute}>={high}))")
        };
        format!("(&{low_part}{high_part})")
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.high {
            None => write!(f, "{}", display_version(&self.low)),
            Some(high) => write!(
                f,
                "{}{},{}{}",
                if self.low_inclusive { '[' } else { '(' },
                display_version(&self.low),
                display_version(high),
                if self.high_inclusive { ']' } else { ')' }
            ),
        }
    }
}
