//! Probe a run descriptor against repository indexes and report what the
//! resolution context decides: the framework, the mandatory resources and
//! the ranked providers for each requirement.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use capsolve_context::{PluginRegistry, ResolutionContext, RunConfig};
use capsolve_core::{
    CapReqBuilder, Capability, Repository, Requirement, ResolveContext, ResourcesRepository,
    parse_header,
};
use serde::Serialize;

/// Everything the probe needs; assembled by the binary from its flags.
#[derive(Debug, Default)]
pub struct ProbeRequest {
    pub config: RunConfig,
    pub indexes: Vec<PathBuf>,
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub execution_environment: String,
    pub repositories: Vec<String>,
    pub framework: Option<String>,
    pub mandatory_resources: Result<Vec<String>, String>,
    pub lookups: Vec<LookupOutcome>,
    pub failed: Vec<String>,
    pub optional: Vec<LookupOutcome>,
    pub provider_lookups: u64,
    pub repository_queries: u64,
    pub cache_hits: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupOutcome {
    pub requirement: String,
    pub providers: Vec<String>,
}

impl LookupOutcome {
    fn new(requirement: &Requirement, providers: &[Capability]) -> Self {
        Self {
            requirement: requirement.to_string(),
            providers: providers.iter().map(describe_capability).collect(),
        }
    }
}

/// Load every index file as a repository, in the order given.
pub fn load_repositories(paths: &[PathBuf]) -> Result<Vec<Arc<ResourcesRepository>>> {
    paths
        .iter()
        .map(|path| ResourcesRepository::from_path(path).map(Arc::new))
        .collect()
}

/// Parse `--require` values. Each clause names a namespace and carries its
/// filter as a directive: `osgi.wiring.package;filter:="(osgi.wiring.package=com.x)"`.
pub fn parse_requirements(raw: &[String]) -> Result<Vec<Requirement>> {
    let mut requirements = Vec::new();
    for value in raw {
        let clauses =
            parse_header(value).with_context(|| format!("invalid requirement `{value}`"))?;
        if clauses.is_empty() {
            bail!("empty requirement `{value}`");
        }
        for clause in clauses {
            requirements.push(
                CapReqBuilder::new(clause.name.as_str())
                    .attributes(clause.attributes)
                    .directives(clause.directives)
                    .build_requirement(),
            );
        }
    }
    Ok(requirements)
}

pub fn build_context(config: RunConfig, repositories: &[Arc<ResourcesRepository>]) -> ResolutionContext {
    let registry = repositories
        .iter()
        .fold(PluginRegistry::new(), |registry, repository| {
            registry.with_repository(repository.clone() as Arc<dyn Repository>)
        });
    ResolutionContext::new(config, registry)
}

/// Run the probe. Requirements given on the command line are looked up in
/// order; without any, the descriptor's own `requires` are used.
pub fn probe(request: ProbeRequest) -> Result<ProbeOutcome> {
    let repositories = load_repositories(&request.indexes)?;
    let mut requirements = parse_requirements(&request.requirements)?;
    if requirements.is_empty() {
        requirements = request.config.input_requirements();
    }

    let context = build_context(request.config, &repositories);
    let report = context.report().context("failed to initialize resolution context")?;
    tracing::debug!(framework = ?report.framework, "context initialized");

    let mandatory_resources = context
        .mandatory_resources()
        .map(|resources| resources.iter().map(ToString::to_string).collect())
        .map_err(|err| err.to_string());

    let mut lookups = Vec::with_capacity(requirements.len());
    for requirement in &requirements {
        let providers = context
            .find_providers(requirement)
            .with_context(|| format!("lookup failed for {requirement}"))?;
        lookups.push(LookupOutcome::new(requirement, &providers));
    }

    let optional = context
        .optional_requirements()
        .iter()
        .map(|(requirement, providers)| LookupOutcome::new(requirement, providers))
        .collect();
    let metrics = context.metrics();

    Ok(ProbeOutcome {
        execution_environment: report.ee.to_string(),
        repositories: report.repositories,
        framework: report.framework,
        mandatory_resources,
        lookups,
        failed: context
            .failed_requirements()
            .iter()
            .map(ToString::to_string)
            .collect(),
        optional,
        provider_lookups: metrics.provider_lookups,
        repository_queries: metrics.repository_queries,
        cache_hits: context.cache_stats().hits,
    })
}

/// The initialization report alone, for `--explain`.
pub fn explain(request: ProbeRequest) -> Result<String> {
    let repositories = load_repositories(&request.indexes)?;
    let context = build_context(request.config, &repositories);
    let report = context.report().context("failed to initialize resolution context")?;
    Ok(report.to_string())
}

fn describe_capability(capability: &Capability) -> String {
    let mut out = format!("{} [{}", capability.resource(), capability.namespace());
    if let Some(value) = capability.attribute(capability.namespace()) {
        out.push_str(&format!(" {value}"));
    }
    if let Some(version) = capability.attribute(capsolve_core::namespace::VERSION_ATTRIBUTE) {
        out.push_str(&format!(" {version}"));
    }
    out.push(']');
    out
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "execution environment: {}", self.execution_environment)?;
        writeln!(f, "repositories: {}", self.repositories.join(", "))?;
        writeln!(
            f,
            "framework: {}",
            self.framework.as_deref().unwrap_or("<not found>")
        )?;
        match &self.mandatory_resources {
            Ok(resources) => writeln!(f, "mandatory: {}", resources.join(", "))?,
            Err(err) => writeln!(f, "mandatory: error: {err}")?,
        }
        for lookup in &self.lookups {
            writeln!(f, "{}", lookup.requirement)?;
            if lookup.providers.is_empty() {
                writeln!(f, "  <no providers>")?;
            }
            for (idx, provider) in lookup.providers.iter().enumerate() {
                writeln!(f, "  {}. {provider}", idx + 1)?;
            }
        }
        if !self.optional.is_empty() {
            writeln!(f, "optional requirements left to the resolver:")?;
            for lookup in &self.optional {
                writeln!(f, "  {} ({} candidates)", lookup.requirement, lookup.providers.len())?;
            }
        }
        if !self.failed.is_empty() {
            writeln!(f, "unsatisfied: {}", self.failed.join("; "))?;
        }
        write!(
            f,
            "lookups: {} (cache hits {}), repository queries: {}",
            self.provider_lookups, self.cache_hits, self.repository_queries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_take_namespace_from_clause_name() {
        let parsed = parse_requirements(&[
            r#"osgi.wiring.package;filter:="(osgi.wiring.package=com.x)""#.to_string(),
            r#"osgi.identity;filter:="(osgi.identity=demo)";resolution:=optional"#.to_string(),
        ])
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].namespace(), "osgi.wiring.package");
        assert_eq!(parsed[0].filter(), Some("(osgi.wiring.package=com.x)"));
        assert!(!parsed[0].is_optional());
        assert_eq!(parsed[1].namespace(), "osgi.identity");
        assert!(parsed[1].is_optional());
    }

    #[test]
    fn unterminated_requirement_is_rejected() {
        let err = parse_requirements(&[r#"osgi.identity;filter:="(x=1)"#.to_string()]).unwrap_err();
        assert!(err.to_string().contains("invalid requirement"));
    }
}
