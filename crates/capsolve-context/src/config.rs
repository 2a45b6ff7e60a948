use std::path::Path;

use anyhow::{Context, Result};
use capsolve_core::{
    Attributes, CapReqBuilder, Directives, HeaderError, Requirement, VersionRange, parse_header,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ee::ExecutionEnvironment;
use crate::error::ResolveError;

pub const ENV_RUN_EE: &str = "CAPSOLVE_RUN_EE";
pub const ENV_RESOLVE_DEBUG: &str = "CAPSOLVE_RESOLVE_DEBUG";

/// Description of one resolution run: target environment, framework,
/// top-level requirements and the knobs that shape candidate selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Execution environment name, `JavaSE-1.6` when unset or unknown.
    pub ee: Option<String>,
    /// Package clauses exported by the framework on top of the EE
    /// (`com.acme.boot;version=1.2`).
    pub system_packages: Vec<String>,
    /// Capability header provided by the framework.
    pub system_capabilities: Option<String>,
    /// Repository allowlist; order here overrides registration order.
    pub repositories: Option<Vec<String>>,
    pub framework: Option<FrameworkSpec>,
    /// Extra `effective` values honoured besides `resolve`.
    pub effective: Option<String>,
    pub requires: Vec<RequirementSpec>,
    pub blacklist: Vec<RequirementSpec>,
    /// Identities moved ahead of other repository candidates.
    pub preferences: Vec<String>,
    pub debug_level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkSpec {
    pub identity: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl FrameworkSpec {
    pub fn range(&self) -> Result<Option<VersionRange>, ResolveError> {
        self.version
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(VersionRange::parse)
            .transpose()
            .map_err(ResolveError::from)
    }
}

impl std::fmt::Display for FrameworkSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{};version='{version}'", self.identity),
            None => f.write_str(&self.identity),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementSpec {
    pub namespace: String,
    pub filter: Option<String>,
    pub attributes: Attributes,
    pub directives: Directives,
}

impl RequirementSpec {
    pub fn to_requirement(&self) -> Requirement {
        let mut builder = CapReqBuilder::new(self.namespace.as_str())
            .attributes(self.attributes.clone())
            .directives(self.directives.clone());
        if let Some(filter) = &self.filter {
            builder = builder.filter(filter.as_str());
        }
        builder.build_requirement()
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigFileFormat {
    Toml,
    Json,
}

impl RunConfig {
    /// Load a run descriptor; `.json` files are JSON, anything else TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFileFormat::Json,
            _ => ConfigFileFormat::Toml,
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read run config {}", path.display()))?;
        let config = match format {
            ConfigFileFormat::Toml => toml::from_str(&contents)
                .with_context(|| format!("invalid toml in {}", path.display()))?,
            ConfigFileFormat::Json => serde_json::from_str(&contents)
                .with_context(|| format!("invalid json in {}", path.display()))?,
        };
        Ok(config)
    }

    /// Apply `CAPSOLVE_RUN_EE` and `CAPSOLVE_RESOLVE_DEBUG`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ee) = env_value(ENV_RUN_EE) {
            self.ee = Some(ee);
        }
        if let Some(raw) = env_value(ENV_RESOLVE_DEBUG) {
            self.debug_level = match raw.parse::<u32>() {
                Ok(level) => level,
                Err(_) if env_flag_set(ENV_RESOLVE_DEBUG) => 1,
                Err(_) => self.debug_level,
            };
        }
        self
    }

    /// Configured environment; unknown names fall back to the default.
    pub fn execution_environment(&self) -> ExecutionEnvironment {
        let Some(name) = self.ee.as_deref() else {
            return ExecutionEnvironment::default();
        };
        match name.parse::<ExecutionEnvironment>() {
            Ok(ee) => ee,
            Err(err) => {
                tracing::warn!(error = %err, "falling back to {}", ExecutionEnvironment::default());
                ExecutionEnvironment::default()
            }
        }
    }

    pub fn input_requirements(&self) -> Vec<Requirement> {
        self.requires
            .iter()
            .map(RequirementSpec::to_requirement)
            .collect()
    }

    pub fn blacklist_requirements(&self) -> Vec<Requirement> {
        self.blacklist
            .iter()
            .map(RequirementSpec::to_requirement)
            .collect()
    }

    /// Extra effective values mapped to the namespaces they skip
    /// (`active;skip:="osgi.service"`).
    pub fn effective_set(&self) -> Result<IndexMap<String, Vec<String>>, HeaderError> {
        let Some(header) = self.effective.as_deref() else {
            return Ok(IndexMap::new());
        };
        let mut set = IndexMap::new();
        for clause in parse_header(header)? {
            let skip = clause
                .directives
                .get("skip")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|ns| !ns.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            set.insert(clause.name, skip);
        }
        Ok(set)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_flag_set(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}
