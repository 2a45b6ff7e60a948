#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use capsolve_context::{FrameworkSpec, PluginRegistry, RequirementSpec, ResolutionContext, RunConfig};
use capsolve_core::namespace::{CONTRACT, FRAMEWORK_CONTRACT, IDENTITY, PACKAGE};
use capsolve_core::{
    CapReqBuilder, Capability, Repository, Requirement, ResolverHook, Resource, ResourcesRepository,
};
use parking_lot::Mutex;
use semver::Version;

pub fn v(major: u64, minor: u64, patch: u64) -> Version {
    Version::new(major, minor, patch)
}

pub fn framework(name: &str, version: Version) -> Resource {
    Resource::builder()
        .identity(name, version.clone())
        .capability(CapReqBuilder::new(CONTRACT).attribute(CONTRACT, FRAMEWORK_CONTRACT))
        .capability(
            CapReqBuilder::new("osgi.wiring.bundle")
                .attribute("osgi.wiring.bundle", name)
                .attribute("bundle-version", version),
        )
        .export_package("org.osgi.framework", v(1, 7, 0))
        .build()
}

pub fn bundle(name: &str, version: Version, exports: &[(&str, Version)]) -> Resource {
    exports
        .iter()
        .fold(Resource::builder().identity(name, version), |builder, (package, version)| {
            builder.export_package(package, version.clone())
        })
        .build()
}

pub fn repo(name: &str, resources: Vec<Resource>) -> Arc<ResourcesRepository> {
    Arc::new(ResourcesRepository::new(name, resources))
}

pub fn package_req(package: &str) -> Requirement {
    CapReqBuilder::package_requirement(package).build_requirement()
}

pub fn optional_package_req(package: &str) -> Requirement {
    CapReqBuilder::package_requirement(package)
        .optional()
        .build_requirement()
}

pub fn identity_spec(filter: &str) -> RequirementSpec {
    RequirementSpec {
        namespace: IDENTITY.to_string(),
        filter: Some(filter.to_string()),
        ..RequirementSpec::default()
    }
}

pub fn package_spec(package: &str) -> RequirementSpec {
    RequirementSpec {
        namespace: PACKAGE.to_string(),
        filter: Some(format!("({PACKAGE}={package})")),
        ..RequirementSpec::default()
    }
}

pub fn config_with_framework(identity: &str, version: Option<&str>) -> RunConfig {
    RunConfig {
        framework: Some(FrameworkSpec {
            identity: identity.to_string(),
            version: version.map(str::to_string),
        }),
        ..RunConfig::default()
    }
}

pub fn context(config: RunConfig, repos: &[Arc<ResourcesRepository>]) -> ResolutionContext {
    let registry = repos.iter().fold(PluginRegistry::new(), |registry, repo| {
        registry.with_repository(repo.clone() as Arc<dyn Repository>)
    });
    ResolutionContext::new(config, registry)
}

pub fn resources_of(capabilities: &[Capability]) -> Vec<Resource> {
    capabilities.iter().map(|cap| cap.resource().clone()).collect()
}

/// Records every invocation and optionally drops candidates by identity.
#[derive(Default)]
pub struct RecordingHook {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Vec<Resource>>>,
    pub drop_identities: Vec<String>,
}

impl RecordingHook {
    pub fn dropping(identities: &[&str]) -> Self {
        Self {
            drop_identities: identities.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResolverHook for RecordingHook {
    fn filter_matches(
        &self,
        _requirement: &Requirement,
        candidates: &mut Vec<Capability>,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(resources_of(candidates));
        candidates.retain(|cap| {
            cap.resource()
                .identity()
                .is_none_or(|id| !self.drop_identities.iter().any(|drop| drop == id))
        });
        Ok(())
    }
}

pub struct FailingHook;

impl ResolverHook for FailingHook {
    fn filter_matches(&self, _requirement: &Requirement, _candidates: &mut Vec<Capability>) -> Result<()> {
        bail!("hook exploded")
    }
}

pub struct FailingRepository;

impl Repository for FailingRepository {
    fn name(&self) -> &str {
        "broken"
    }

    fn find_providers(&self, _requirements: &[Requirement]) -> Result<HashMap<Requirement, Vec<Capability>>> {
        bail!("repository offline")
    }
}
