//! Contracts between the resolution context and its collaborators.

use std::collections::HashMap;

use crate::resource::{Capability, HostedCapability, Requirement, Resource};

/// A source of resources. Results for each requested requirement are
/// returned in the repository's own order.
pub trait Repository: Send + Sync {
    fn name(&self) -> &str;

    fn find_providers(
        &self,
        requirements: &[Requirement],
    ) -> anyhow::Result<HashMap<Requirement, Vec<Capability>>>;
}

/// Gets to remove candidates before the resolver sees them.
pub trait ResolverHook: Send + Sync {
    fn filter_matches(
        &self,
        requirement: &Requirement,
        candidates: &mut Vec<Capability>,
    ) -> anyhow::Result<()>;
}

/// Wires already established for a resource by a running framework.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wiring {
    pub provided: Vec<Capability>,
    pub required: Vec<Requirement>,
}

/// What a backtracking resolver asks of its environment.
pub trait ResolveContext {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resources that must end up in the resolution.
    fn mandatory_resources(&self) -> Result<Vec<Resource>, Self::Error>;

    /// Resources the resolver may add when it can.
    fn optional_resources(&self) -> Result<Vec<Resource>, Self::Error> {
        Ok(Vec::new())
    }

    /// Candidates for `requirement`, most preferred first.
    fn find_providers(&self, requirement: &Requirement) -> Result<Vec<Capability>, Self::Error>;

    /// Insert `hosted` into `capabilities` at its preference position and
    /// return the index used.
    fn insert_hosted_capability(
        &self,
        capabilities: &mut Vec<Capability>,
        hosted: &HostedCapability,
    ) -> usize;

    fn is_effective(&self, requirement: &Requirement) -> Result<bool, Self::Error>;

    fn wirings(&self) -> HashMap<Resource, Wiring>;
}
