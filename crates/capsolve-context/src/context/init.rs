use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use capsolve_core::namespace::{CONTRACT, FRAMEWORK_CONTRACT, IDENTITY_INITIAL_RESOURCE};
use capsolve_core::{CapReqBuilder, Repository, Requirement, Resource, empty_version};
use indexmap::IndexMap;

use crate::comparator::CandidateComparator;
use crate::config::RunConfig;
use crate::ee::ExecutionEnvironment;
use crate::error::{ResolveError, Result};
use crate::framework::FrameworkCapabilityRepository;
use crate::registry::PluginRegistry;

/// State fixed by the first successful initialization.
pub(crate) struct Initialized {
    pub(crate) ee: ExecutionEnvironment,
    pub(crate) repositories: Vec<Arc<dyn Repository>>,
    pub(crate) effective: IndexMap<String, Vec<String>>,
    pub(crate) blacklist: HashSet<Resource>,
    pub(crate) framework: Option<FrameworkCapabilityRepository>,
    pub(crate) input: Option<Resource>,
    pub(crate) comparator: CandidateComparator,
}

impl Initialized {
    pub(crate) fn framework_resource(&self) -> Option<&Resource> {
        self.framework.as_ref().map(FrameworkCapabilityRepository::framework)
    }

    pub(crate) fn is_framework(&self, resource: &Resource) -> bool {
        self.framework_resource() == Some(resource)
    }
}

pub(crate) fn initialize(config: &RunConfig, registry: &PluginRegistry) -> Result<Initialized> {
    let ee = config.execution_environment();
    let repositories = registry.select_repositories(config.repositories.as_deref());

    let effective = config.effective_set().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring malformed effective header");
        IndexMap::new()
    });

    let blacklist = blacklisted_resources(&config.blacklist_requirements(), &repositories)?;

    let framework = match &config.framework {
        Some(spec) => {
            let range = spec.range()?;
            let requirement =
                CapReqBuilder::identity_requirement(&spec.identity, range.as_ref()).build_requirement();
            match find_framework(&requirement, &repositories)? {
                Some(resource) => {
                    tracing::info!(framework = %resource, ee = %ee, "selected framework");
                    Some(FrameworkCapabilityRepository::new(
                        resource,
                        ee,
                        &config.system_packages,
                        config.system_capabilities.as_deref(),
                    ))
                }
                None => {
                    tracing::error!(framework = %spec, "could not find framework in any repository");
                    None
                }
            }
        }
        None => {
            tracing::warn!("no framework configured");
            None
        }
    };

    let input = input_resource(&config.input_requirements());
    let comparator = CandidateComparator::new(
        framework
            .as_ref()
            .map(|fw| fw.framework().clone()),
        input.clone(),
        &HashMap::new(),
    );

    Ok(Initialized {
        ee,
        repositories,
        effective,
        blacklist,
        framework,
        input,
        comparator,
    })
}

/// Highest-versioned resource matching `requirement` that declares the
/// framework contract. The first one found wins a version tie.
fn find_framework(
    requirement: &Requirement,
    repositories: &[Arc<dyn Repository>],
) -> Result<Option<Resource>> {
    let mut best: Option<Resource> = None;
    for repository in repositories {
        let mut found = repository
            .find_providers(std::slice::from_ref(requirement))
            .map_err(ResolveError::Repository)?;
        for capability in found.remove(requirement).unwrap_or_default() {
            let resource = capability.resource();
            if !resource.declares(CONTRACT, CONTRACT, FRAMEWORK_CONTRACT) {
                continue;
            }
            let version = resource.version().unwrap_or_else(empty_version);
            let better = best.as_ref().is_none_or(|current| {
                version > current.version().unwrap_or_else(empty_version)
            });
            if better {
                best = Some(resource.clone());
            }
        }
    }
    Ok(best)
}

fn blacklisted_resources(
    requirements: &[Requirement],
    repositories: &[Arc<dyn Repository>],
) -> Result<HashSet<Resource>> {
    let mut blacklist = HashSet::new();
    if requirements.is_empty() {
        return Ok(blacklist);
    }
    for repository in repositories {
        let found = repository
            .find_providers(requirements)
            .map_err(ResolveError::Repository)?;
        for capability in found.into_values().flatten() {
            tracing::debug!(resource = %capability.resource(), "blacklisted");
            blacklist.insert(capability.resource().clone());
        }
    }
    Ok(blacklist)
}

/// Synthetic resource carrying the top-level requirements.
fn input_resource(requirements: &[Requirement]) -> Option<Resource> {
    if requirements.is_empty() {
        return None;
    }
    let builder = requirements.iter().fold(
        Resource::builder().identity(IDENTITY_INITIAL_RESOURCE, empty_version()),
        |builder, requirement| builder.adopt_requirement(requirement),
    );
    Some(builder.build())
}
