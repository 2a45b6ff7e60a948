//! The resolution context handed to the external resolver.
//!
//! One context serves exactly one resolution attempt. Provider lookups are
//! memoized per [`CacheKey`], so a backtracking resolver asking the same
//! question many times gets the same ordered answer and the repositories and
//! hooks are consulted once.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use capsolve_core::namespace::{
    CONTRACT, EFFECTIVE_RESOLVE, FRAMEWORK_CONTRACT, IDENTITY_OSGI_CORE,
};
use capsolve_core::{
    Capability, HostedCapability, Repository, Requirement, Resource, ResolveContext, Wiring,
};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::cache::{CacheKey, ProviderCache, ProviderCacheStats};
use crate::config::RunConfig;
use crate::ee::ExecutionEnvironment;
use crate::error::{ResolveError, Result};
use crate::metrics::{ContextMetrics, ContextMetricsSnapshot};
use crate::registry::PluginRegistry;

mod init;
mod report;

use init::Initialized;
pub use report::InitReport;

pub struct ResolutionContext {
    config: RunConfig,
    registry: PluginRegistry,
    state: OnceCell<Initialized>,
    init_attempted: AtomicBool,
    cache: ProviderCache,
    priorities: Mutex<HashMap<Resource, usize>>,
    mandatory: Mutex<IndexMap<Requirement, Vec<Capability>>>,
    optional: Mutex<IndexMap<Requirement, Vec<Capability>>>,
    failed: Mutex<IndexSet<Requirement>>,
    metrics: ContextMetrics,
}

impl ResolutionContext {
    pub fn new(config: RunConfig, registry: PluginRegistry) -> Self {
        Self {
            config,
            registry,
            state: OnceCell::new(),
            init_attempted: AtomicBool::new(false),
            cache: ProviderCache::new(),
            priorities: Mutex::new(HashMap::new()),
            mandatory: Mutex::new(IndexMap::new()),
            optional: Mutex::new(IndexMap::new()),
            failed: Mutex::new(IndexSet::new()),
            metrics: ContextMetrics::default(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run initialization if it has not happened yet. Only the first call
    /// does any work; once it has failed every later call fails too.
    pub fn init(&self) -> Result<()> {
        self.initialized().map(|_| ())
    }

    fn initialized(&self) -> Result<&Initialized> {
        self.state.get_or_try_init(|| {
            if self.init_attempted.swap(true, Ordering::SeqCst) {
                return Err(ResolveError::InitAborted);
            }
            let state = init::initialize(&self.config, &self.registry)?;
            if self.config.debug_level > 0 {
                tracing::info!("resolution context initialized\n{}", InitReport::from_state(&state));
            }
            Ok(state)
        })
    }

    pub fn report(&self) -> Result<InitReport> {
        self.initialized().map(InitReport::from_state)
    }

    pub fn framework_resource(&self) -> Result<Option<Resource>> {
        Ok(self.initialized()?.framework_resource().cloned())
    }

    pub fn input_resource(&self) -> Result<Option<Resource>> {
        Ok(self.initialized()?.input.clone())
    }

    pub fn execution_environment(&self) -> Result<ExecutionEnvironment> {
        Ok(self.initialized()?.ee)
    }

    pub fn repositories(&self) -> Result<Vec<Arc<dyn Repository>>> {
        Ok(self.initialized()?.repositories.clone())
    }

    /// Last provider list computed for each mandatory requirement.
    pub fn mandatory_requirements(&self) -> IndexMap<Requirement, Vec<Capability>> {
        self.mandatory.lock().clone()
    }

    /// Full candidate list for optional requirements that the framework
    /// could not satisfy.
    pub fn optional_requirements(&self) -> IndexMap<Requirement, Vec<Capability>> {
        self.optional.lock().clone()
    }

    /// Requirements for which `find_providers` returned nothing.
    pub fn failed_requirements(&self) -> Vec<Requirement> {
        self.failed.lock().iter().cloned().collect()
    }

    pub fn resource_priority(&self, resource: &Resource) -> Option<usize> {
        self.priorities.lock().get(resource).copied()
    }

    pub fn metrics(&self) -> ContextMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn cache_stats(&self) -> ProviderCacheStats {
        self.cache.stats()
    }

    /// Framework candidates first, then each repository's permitted
    /// candidates in repository order, finally ranked as a whole.
    fn assemble(&self, state: &Initialized, requirement: &Requirement) -> Result<Vec<Capability>> {
        let mut candidates = Vec::new();
        if let Some(framework) = &state.framework {
            let mut provided = framework.providers(requirement)?;
            state.comparator.sort(&mut provided);
            candidates.extend(provided);
        }

        for (order, repository) in state.repositories.iter().enumerate() {
            ContextMetrics::bump(&self.metrics.repository_queries);
            let mut found = repository
                .find_providers(std::slice::from_ref(requirement))
                .map_err(ResolveError::Repository)?;
            let mut batch = Vec::new();
            for capability in found.remove(requirement).unwrap_or_default() {
                let resource = capability.resource();
                if !is_permitted(resource) || state.blacklist.contains(resource) {
                    ContextMetrics::bump(&self.metrics.rejected_candidates);
                    continue;
                }
                self.priorities
                    .lock()
                    .entry(resource.clone())
                    .or_insert(order);
                batch.push(capability);
            }
            state.comparator.sort(&mut batch);
            for capability in batch {
                if !candidates.contains(&capability) {
                    candidates.push(capability);
                }
            }
        }

        state.comparator.sort(&mut candidates);
        Ok(candidates)
    }

    /// Hooks see the whole list; preferences only reorder the
    /// non-framework tail.
    fn post_process(
        &self,
        state: &Initialized,
        requirement: &Requirement,
        mut candidates: Vec<Capability>,
    ) -> Result<Vec<Capability>> {
        if !candidates.is_empty() {
            for hook in self.registry.hooks() {
                ContextMetrics::bump(&self.metrics.hook_invocations);
                hook.filter_matches(requirement, &mut candidates)
                    .map_err(ResolveError::Hook)?;
            }
        }
        let (mut result, mut tail): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|capability| state.is_framework(capability.resource()));
        if !self.config.preferences.is_empty() {
            let (preferred, rest): (Vec<_>, Vec<_>) = tail.into_iter().partition(|capability| {
                capability
                    .resource()
                    .identity()
                    .is_some_and(|id| self.config.preferences.iter().any(|p| p == id))
            });
            tail = preferred;
            tail.extend(rest);
        }
        result.extend(tail);
        Ok(result)
    }

    fn record_failure(&self, requirement: &Requirement) {
        ContextMetrics::bump(&self.metrics.failed_lookups);
        self.failed.lock().insert(requirement.clone());
    }
}

/// Whether a repository resource may be offered as a candidate at all.
fn is_permitted(resource: &Resource) -> bool {
    if resource.declares(CONTRACT, CONTRACT, FRAMEWORK_CONTRACT) {
        return false;
    }
    let identities = resource.identity_count();
    if identities != 1 {
        tracing::warn!(
            resource = %resource,
            identities,
            "resource must declare exactly one identity; skipping"
        );
        return false;
    }
    resource
        .identity()
        .is_some_and(|id| id != IDENTITY_OSGI_CORE && !id.starts_with("ee."))
}

impl ResolveContext for ResolutionContext {
    type Error = ResolveError;

    fn mandatory_resources(&self) -> Result<Vec<Resource>> {
        let state = self.initialized()?;
        let Some(framework) = state.framework_resource() else {
            let spec = self
                .config
                .framework
                .as_ref()
                .map_or_else(|| "<none configured>".to_string(), ToString::to_string);
            return Err(ResolveError::FrameworkNotFound { spec });
        };
        let mut resources = vec![framework.clone()];
        if let Some(input) = &state.input {
            resources.push(input.clone());
        }
        Ok(resources)
    }

    fn find_providers(&self, requirement: &Requirement) -> Result<Vec<Capability>> {
        let state = self.initialized()?;
        ContextMetrics::bump(&self.metrics.provider_lookups);

        let key = CacheKey::from(requirement);
        let cached = self.cache.get(&key);
        let from_cache = cached.is_some();
        let candidates = match cached {
            Some(candidates) => candidates,
            None => self.assemble(state, requirement)?,
        };
        tracing::debug!(
            requirement = %requirement,
            candidates = candidates.len(),
            cached = from_cache,
            "find providers"
        );

        if requirement.is_optional() {
            let provided: Vec<Capability> = candidates
                .iter()
                .filter(|capability| state.is_framework(capability.resource()))
                .cloned()
                .collect();
            if !provided.is_empty() {
                // Not memoized: only the framework subset is answered here,
                // so repeated calls rerun the repository queries.
                return Ok(provided);
            }
            let candidates = if from_cache {
                candidates
            } else {
                let processed = self.post_process(state, requirement, candidates)?;
                self.cache.insert(key, processed.clone());
                processed
            };
            self.optional.lock().insert(requirement.clone(), candidates);
            self.record_failure(requirement);
            return Ok(Vec::new());
        }

        let candidates = if from_cache {
            candidates
        } else {
            let processed = self.post_process(state, requirement, candidates)?;
            self.cache.insert(key, processed.clone());
            processed
        };
        self.mandatory
            .lock()
            .insert(requirement.clone(), candidates.clone());
        if candidates.is_empty() {
            self.record_failure(requirement);
        }
        Ok(candidates)
    }

    fn insert_hosted_capability(
        &self,
        capabilities: &mut Vec<Capability>,
        hosted: &HostedCapability,
    ) -> usize {
        let priorities = self.priorities.lock();
        let hosted_priority = priorities
            .get(hosted.resource())
            .copied()
            .unwrap_or(usize::MAX);
        let index = capabilities
            .iter()
            .position(|capability| {
                priorities.get(capability.resource()).copied().unwrap_or(0) > hosted_priority
            })
            .unwrap_or(capabilities.len());
        capabilities.insert(index, hosted.clone().into_capability());
        index
    }

    fn is_effective(&self, requirement: &Requirement) -> Result<bool> {
        let state = self.initialized()?;
        let Some(effective) = requirement.effective() else {
            return Ok(true);
        };
        if effective == EFFECTIVE_RESOLVE {
            return Ok(true);
        }
        Ok(state
            .effective
            .get(effective)
            .is_some_and(|skip| !skip.iter().any(|ns| ns == requirement.namespace())))
    }

    fn wirings(&self) -> HashMap<Resource, Wiring> {
        HashMap::new()
    }
}
