//! In-memory repository over a fixed list of resources.
//!
//! Indexes are JSON documents of the form
//!
//! ```json
//! {
//!   "name": "r1",
//!   "resources": [
//!     {
//!       "capabilities": [
//!         { "namespace": "osgi.identity",
//!           "attributes": { "osgi.identity": "demo", "version:Version": "1.0" } }
//!       ],
//!       "requirements": [
//!         { "namespace": "osgi.wiring.package",
//!           "directives": { "filter": "(osgi.wiring.package=org.y)" } }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::attrs::{Attributes, Directives};
use crate::resource::{CapReqBuilder, Capability, Requirement, Resource};
use crate::spi::Repository;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("malformed index: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("resource #{resource} has an entry without a namespace")]
    MissingNamespace { resource: usize },
}

#[derive(Debug, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    resources: Vec<IndexResource>,
}

#[derive(Debug, Deserialize)]
struct IndexResource {
    #[serde(default)]
    capabilities: Vec<IndexEntry>,
    #[serde(default)]
    requirements: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    namespace: String,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    directives: Directives,
}

impl IndexEntry {
    fn into_builder(self, resource: usize) -> Result<CapReqBuilder, IndexError> {
        if self.namespace.trim().is_empty() {
            return Err(IndexError::MissingNamespace { resource });
        }
        Ok(CapReqBuilder::new(self.namespace)
            .attributes(self.attributes)
            .directives(self.directives))
    }
}

#[derive(Debug)]
pub struct ResourcesRepository {
    name: String,
    resources: Vec<Resource>,
    queries: AtomicU64,
}

impl ResourcesRepository {
    pub fn new(name: impl Into<String>, resources: Vec<Resource>) -> Self {
        Self {
            name: name.into(),
            resources,
            queries: AtomicU64::new(0),
        }
    }

    /// Parse an index document; `fallback_name` applies when the document
    /// does not name itself.
    pub fn from_json_str(fallback_name: &str, json: &str) -> Result<Self, IndexError> {
        let document: IndexDocument = serde_json::from_str(json)?;
        let mut resources = Vec::with_capacity(document.resources.len());
        for (idx, entry) in document.resources.into_iter().enumerate() {
            let mut builder = Resource::builder();
            for capability in entry.capabilities {
                builder = builder.capability(capability.into_builder(idx)?);
            }
            for requirement in entry.requirements {
                builder = builder.requirement(requirement.into_builder(idx)?);
            }
            resources.push(builder.build());
        }
        let name = document.name.unwrap_or_else(|| fallback_name.to_string());
        Ok(Self::new(name, resources))
    }

    /// Load an index file; the file stem names the repository unless the
    /// document carries its own name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read index {}", path.display()))?;
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("index");
        Self::from_json_str(stem, &raw)
            .with_context(|| format!("failed to parse index {}", path.display()))
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Number of `find_providers` calls served so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

impl Repository for ResourcesRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_providers(
        &self,
        requirements: &[Requirement],
    ) -> Result<HashMap<Requirement, Vec<Capability>>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let mut result = HashMap::with_capacity(requirements.len());
        for requirement in requirements {
            let filter = requirement
                .parsed_filter()
                .with_context(|| format!("repository {}: bad requirement filter", self.name))?;
            let matches: Vec<Capability> = self
                .resources
                .iter()
                .flat_map(|resource| resource.capabilities(Some(requirement.namespace())))
                .filter(|capability| {
                    filter
                        .as_ref()
                        .is_none_or(|filter| filter.matches(capability.attributes()))
                })
                .collect();
            tracing::trace!(
                repository = %self.name,
                requirement = %requirement,
                matches = matches.len(),
                "repository lookup"
            );
            result.insert(requirement.clone(), matches);
        }
        Ok(result)
    }
}
