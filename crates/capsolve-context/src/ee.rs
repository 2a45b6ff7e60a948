//! Execution environments and the packages they imply.
//!
//! Each bundled `resources/ee/<name>.properties` lists under `jre.packages`
//! the non-`java.*` packages first shipped with that environment. The
//! packages of an environment are its own plus those of every environment
//! it is backward compatible with.

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::error::ResolveError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExecutionEnvironment {
    OsgiMinimum10,
    OsgiMinimum11,
    OsgiMinimum12,
    Jre11,
    J2se12,
    J2se13,
    J2se14,
    J2se15,
    #[default]
    JavaSe16,
    JavaSe17,
    JavaSe18,
}

impl ExecutionEnvironment {
    /// Oldest first.
    pub const ALL: [Self; 11] = [
        Self::OsgiMinimum10,
        Self::OsgiMinimum11,
        Self::OsgiMinimum12,
        Self::Jre11,
        Self::J2se12,
        Self::J2se13,
        Self::J2se14,
        Self::J2se15,
        Self::JavaSe16,
        Self::JavaSe17,
        Self::JavaSe18,
    ];

    /// Legacy name, as used in `Bundle-RequiredExecutionEnvironment`.
    pub fn name(self) -> &'static str {
        match self {
            Self::OsgiMinimum10 => "OSGi/Minimum-1.0",
            Self::OsgiMinimum11 => "OSGi/Minimum-1.1",
            Self::OsgiMinimum12 => "OSGi/Minimum-1.2",
            Self::Jre11 => "JRE-1.1",
            Self::J2se12 => "J2SE-1.2",
            Self::J2se13 => "J2SE-1.3",
            Self::J2se14 => "J2SE-1.4",
            Self::J2se15 => "J2SE-1.5",
            Self::JavaSe16 => "JavaSE-1.6",
            Self::JavaSe17 => "JavaSE-1.7",
            Self::JavaSe18 => "JavaSE-1.8",
        }
    }

    /// Name used by the versioned `osgi.ee` capability form.
    pub fn capability_name(self) -> &'static str {
        match self {
            Self::OsgiMinimum10 | Self::OsgiMinimum11 | Self::OsgiMinimum12 => "OSGi/Minimum",
            Self::Jre11 => "JRE",
            _ => "JavaSE",
        }
    }

    pub fn capability_version(self) -> Version {
        match self {
            Self::OsgiMinimum10 => Version::new(1, 0, 0),
            Self::OsgiMinimum11 | Self::Jre11 => Version::new(1, 1, 0),
            Self::OsgiMinimum12 | Self::J2se12 => Version::new(1, 2, 0),
            Self::J2se13 => Version::new(1, 3, 0),
            Self::J2se14 => Version::new(1, 4, 0),
            Self::J2se15 => Version::new(1, 5, 0),
            Self::JavaSe16 => Version::new(1, 6, 0),
            Self::JavaSe17 => Version::new(1, 7, 0),
            Self::JavaSe18 => Version::new(1, 8, 0),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|ee| ee.name() == name)
    }

    /// Environments this one can stand in for, newest first.
    pub fn compatible(self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().rev().filter(move |ee| *ee < self)
    }

    /// Packages provided by this environment, oldest additions first.
    pub fn packages(self) -> Vec<&'static str> {
        let mut packages: Vec<&'static str> = Vec::new();
        for ee in Self::ALL.into_iter().filter(|ee| *ee <= self) {
            for package in jre_packages(ee.properties()) {
                if !packages.contains(&package) {
                    packages.push(package);
                }
            }
        }
        packages
    }

    fn properties(self) -> &'static str {
        match self {
            Self::OsgiMinimum10 => include_str!("../resources/ee/OSGi-Minimum-1.0.properties"),
            Self::OsgiMinimum11 => include_str!("../resources/ee/OSGi-Minimum-1.1.properties"),
            Self::OsgiMinimum12 => include_str!("../resources/ee/OSGi-Minimum-1.2.properties"),
            Self::Jre11 => include_str!("../resources/ee/JRE-1.1.properties"),
            Self::J2se12 => include_str!("../resources/ee/J2SE-1.2.properties"),
            Self::J2se13 => include_str!("../resources/ee/J2SE-1.3.properties"),
            Self::J2se14 => include_str!("../resources/ee/J2SE-1.4.properties"),
            Self::J2se15 => include_str!("../resources/ee/J2SE-1.5.properties"),
            Self::JavaSe16 => include_str!("../resources/ee/JavaSE-1.6.properties"),
            Self::JavaSe17 => include_str!("../resources/ee/JavaSE-1.7.properties"),
            Self::JavaSe18 => include_str!("../resources/ee/JavaSE-1.8.properties"),
        }
    }
}

impl FromStr for ExecutionEnvironment {
    type Err = ResolveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| ResolveError::UnknownExecutionEnvironment(value.to_string()))
    }
}

impl fmt::Display for ExecutionEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read `jre.packages` out of a properties document, honouring `\`
/// line continuations and `#` comments.
fn jre_packages(properties: &str) -> Vec<&str> {
    let mut in_value = false;
    let mut packages = Vec::new();
    for line in properties.lines() {
        let trimmed = line.trim();
        if !in_value {
            if trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }
            let Some(rest) = trimmed.strip_prefix("jre.packages") else {
                continue;
            };
            let Some(value) = rest.trim_start().strip_prefix(['=', ':']) else {
                continue;
            };
            in_value = collect(value, &mut packages);
        } else {
            in_value = collect(trimmed, &mut packages);
        }
    }
    packages
}

/// Push the packages on one physical line; true when the line continues.
fn collect<'a>(line: &'a str, packages: &mut Vec<&'a str>) -> bool {
    let (body, continues) = match line.trim_end().strip_suffix('\\') {
        Some(body) => (body, true),
        None => (line, false),
    };
    packages.extend(body.split(',').map(str::trim).filter(|p| !p.is_empty()));
    continues
}
