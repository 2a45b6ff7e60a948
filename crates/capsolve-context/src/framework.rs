use std::collections::HashMap;

use anyhow::Context as _;
use capsolve_core::namespace::{
    BUNDLE, EXECUTION_ENVIRONMENT, HOST, PACKAGE, SYSTEM_BUNDLE_ALIAS, VERSION_ATTRIBUTE,
};
use capsolve_core::{
    AttrValue, CapReqBuilder, Capability, FilterError, Repository, Requirement, Resource,
    coerce_version, empty_version, parse_header,
};
use indexmap::IndexMap;

use crate::ee::ExecutionEnvironment;

/// Everything the chosen framework provides implicitly: its own
/// capabilities, the execution environments it runs on and their packages,
/// and the configured system packages and capabilities. Built once; lookups
/// are pure.
#[derive(Debug)]
pub struct FrameworkCapabilityRepository {
    framework: Resource,
    ee: ExecutionEnvironment,
    by_namespace: IndexMap<String, Vec<Capability>>,
}

impl FrameworkCapabilityRepository {
    pub fn new(
        framework: Resource,
        ee: ExecutionEnvironment,
        system_packages: &[String],
        system_capabilities: Option<&str>,
    ) -> Self {
        let mut repo = Self {
            framework,
            ee,
            by_namespace: IndexMap::new(),
        };
        repo.index_framework_capabilities();
        repo.index_execution_environments();
        repo.index_packages(system_packages);
        if let Some(header) = system_capabilities {
            repo.index_system_capabilities(header);
        }
        repo
    }

    pub fn framework(&self) -> &Resource {
        &self.framework
    }

    pub fn execution_environment(&self) -> ExecutionEnvironment {
        self.ee
    }

    pub fn capability_count(&self) -> usize {
        self.by_namespace.values().map(Vec::len).sum()
    }

    /// Framework capabilities matching `requirement`, in index order.
    pub fn providers(&self, requirement: &Requirement) -> Result<Vec<Capability>, FilterError> {
        let Some(candidates) = self.by_namespace.get(requirement.namespace()) else {
            return Ok(Vec::new());
        };
        let filter = requirement.parsed_filter()?;
        Ok(candidates
            .iter()
            .filter(|capability| {
                filter
                    .as_ref()
                    .is_none_or(|filter| filter.matches(capability.attributes()))
            })
            .cloned()
            .collect())
    }

    fn push(&mut self, capability: Capability) {
        self.by_namespace
            .entry(capability.namespace().to_string())
            .or_default()
            .push(capability);
    }

    fn index_framework_capabilities(&mut self) {
        for capability in self.framework.capabilities(None) {
            let namespace = capability.namespace().to_string();
            let alias = (namespace == BUNDLE || namespace == HOST).then(|| {
                let mut attributes = capability.attributes().clone();
                attributes.insert(namespace.as_str(), SYSTEM_BUNDLE_ALIAS);
                CapReqBuilder::new(namespace.as_str())
                    .attributes(attributes)
                    .directives(capability.directives().clone())
                    .build_capability(&self.framework)
            });
            self.push(capability);
            if let Some(alias) = alias {
                self.push(alias);
            }
        }
    }

    fn index_execution_environments(&mut self) {
        let ee = self.ee;
        for env in std::iter::once(ee).chain(ee.compatible()) {
            let versioned = CapReqBuilder::new(EXECUTION_ENVIRONMENT)
                .attribute(EXECUTION_ENVIRONMENT, env.capability_name())
                .attribute(VERSION_ATTRIBUTE, env.capability_version())
                .build_capability(&self.framework);
            let legacy = CapReqBuilder::new(EXECUTION_ENVIRONMENT)
                .attribute(EXECUTION_ENVIRONMENT, env.name())
                .build_capability(&self.framework);
            self.push(versioned);
            self.push(legacy);
        }
    }

    fn index_packages(&mut self, system_packages: &[String]) {
        let mut packages: IndexMap<String, CapReqBuilder> = self
            .ee
            .packages()
            .into_iter()
            .map(|package| {
                let builder = CapReqBuilder::new(PACKAGE)
                    .attribute(PACKAGE, package)
                    .attribute(VERSION_ATTRIBUTE, empty_version());
                (package.to_string(), builder)
            })
            .collect();

        let header = system_packages.join(",");
        match parse_header(&header) {
            Ok(clauses) => {
                for clause in clauses {
                    let mut builder = CapReqBuilder::from_clause(PACKAGE, &clause);
                    let version = match clause.attributes.get(VERSION_ATTRIBUTE) {
                        Some(AttrValue::String(raw)) => coerce_version(raw).unwrap_or_else(|err| {
                            tracing::warn!(
                                package = %clause.name,
                                error = %err,
                                "ignoring bad system package version"
                            );
                            empty_version()
                        }),
                        Some(value) => value.as_version().unwrap_or_else(empty_version),
                        None => empty_version(),
                    };
                    builder = builder.attribute(VERSION_ATTRIBUTE, version);
                    packages.insert(clause.name, builder);
                }
            }
            Err(err) => tracing::warn!(error = %err, "ignoring malformed system packages"),
        }

        for builder in packages.into_values() {
            let capability = builder.build_capability(&self.framework);
            self.push(capability);
        }
    }

    fn index_system_capabilities(&mut self, header: &str) {
        match parse_header(header) {
            Ok(clauses) => {
                for clause in clauses {
                    let capability = CapReqBuilder::new(clause.name.as_str())
                        .attributes(clause.attributes)
                        .directives(clause.directives)
                        .build_capability(&self.framework);
                    self.push(capability);
                }
            }
            Err(err) => tracing::warn!(error = %err, "ignoring malformed system capabilities"),
        }
    }
}

impl Repository for FrameworkCapabilityRepository {
    fn name(&self) -> &str {
        "framework"
    }

    fn find_providers(
        &self,
        requirements: &[Requirement],
    ) -> anyhow::Result<HashMap<Requirement, Vec<Capability>>> {
        requirements
            .iter()
            .map(|requirement| {
                let providers = self
                    .providers(requirement)
                    .with_context(|| format!("framework lookup for {requirement}"))?;
                Ok((requirement.clone(), providers))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use capsolve_core::namespace::{CONTRACT, FRAMEWORK_CONTRACT, IDENTITY};
    use semver::Version;

    use super::*;

    fn felix() -> Resource {
        Resource::builder()
            .identity("org.apache.felix.framework", Version::new(4, 0, 2))
            .capability(
                CapReqBuilder::new(CONTRACT).attribute(CONTRACT, FRAMEWORK_CONTRACT),
            )
            .capability(
                CapReqBuilder::new(BUNDLE)
                    .attribute(BUNDLE, "org.apache.felix.framework")
                    .attribute("bundle-version", Version::new(4, 0, 2)),
            )
            .export_package("org.osgi.framework", Version::new(1, 7, 0))
            .build()
    }

    fn requirement(namespace: &str, filter: &str) -> Requirement {
        CapReqBuilder::new(namespace).filter(filter).build_requirement()
    }

    #[test]
    fn provides_own_and_environment_capabilities() {
        let repo = FrameworkCapabilityRepository::new(felix(), ExecutionEnvironment::JavaSe16, &[], None);
        let own = repo
            .providers(&requirement(PACKAGE, "(osgi.wiring.package=org.osgi.framework)"))
            .unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].resource(), repo.framework());

        let legacy = repo.providers(&requirement(EXECUTION_ENVIRONMENT, "(osgi.ee=J2SE-1.5)")).unwrap();
        assert_eq!(legacy.len(), 1);
        let versioned = repo
            .providers(&requirement(
                EXECUTION_ENVIRONMENT,
                "(&(osgi.ee=JavaSE)(version=1.6))",
            ))
            .unwrap();
        assert_eq!(versioned.len(), 1);
        assert!(repo
            .providers(&requirement(EXECUTION_ENVIRONMENT, "(osgi.ee=JavaSE-1.7)"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn jre_packages_follow_the_environment() {
        let annotation = requirement(PACKAGE, "(osgi.wiring.package=javax.annotation)");
        let java6 = FrameworkCapabilityRepository::new(felix(), ExecutionEnvironment::JavaSe16, &[], None);
        let found = java6.providers(&annotation).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].attribute(VERSION_ATTRIBUTE),
            Some(&AttrValue::Version(Version::new(0, 0, 0)))
        );

        let java5 = FrameworkCapabilityRepository::new(felix(), ExecutionEnvironment::J2se15, &[], None);
        assert!(java5.providers(&annotation).unwrap().is_empty());
    }

    #[test]
    fn bundle_wiring_answers_to_system_bundle() {
        let repo = FrameworkCapabilityRepository::new(felix(), ExecutionEnvironment::JavaSe16, &[], None);
        let alias = repo
            .providers(&requirement(BUNDLE, "(osgi.wiring.bundle=system.bundle)"))
            .unwrap();
        assert_eq!(alias.len(), 1);
        let by_name = repo
            .providers(&requirement(BUNDLE, "(osgi.wiring.bundle=org.apache.felix.framework)"))
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert!(repo.providers(&requirement(HOST, "(osgi.wiring.host=*)")).unwrap().is_empty());
    }

    #[test]
    fn system_packages_and_capabilities_are_added() {
        let repo = FrameworkCapabilityRepository::new(
            felix(),
            ExecutionEnvironment::JavaSe16,
            &["com.acme.boot;version=1.2".to_string(), "javax.annotation;version=1.1".to_string()],
            Some("osgi.service;objectClass=com.acme.Boot, osgi.native;osgi.native.osname=Linux"),
        );
        let boot = repo
            .providers(&requirement(PACKAGE, "(&(osgi.wiring.package=com.acme.boot)(version>=1.2))"))
            .unwrap();
        assert_eq!(boot.len(), 1);
        let annotation = repo
            .providers(&requirement(PACKAGE, "(osgi.wiring.package=javax.annotation)"))
            .unwrap();
        assert_eq!(annotation.len(), 1);
        assert_eq!(
            annotation[0].attribute(VERSION_ATTRIBUTE),
            Some(&AttrValue::Version(Version::new(1, 1, 0)))
        );
        let service = repo
            .providers(&requirement("osgi.service", "(objectClass=com.acme.Boot)"))
            .unwrap();
        assert_eq!(service.len(), 1);
        assert_eq!(
            repo.providers(&CapReqBuilder::new("osgi.native").build_requirement())
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn malformed_system_headers_degrade_to_nothing() {
        let baseline =
            FrameworkCapabilityRepository::new(felix(), ExecutionEnvironment::JavaSe16, &[], None)
                .capability_count();
        let repo = FrameworkCapabilityRepository::new(
            felix(),
            ExecutionEnvironment::JavaSe16,
            &["broken;x=\"open".to_string()],
            Some("version=1"),
        );
        assert_eq!(repo.capability_count(), baseline);
        let identities = repo
            .providers(&CapReqBuilder::new(IDENTITY).build_requirement())
            .unwrap();
        assert_eq!(identities.len(), 1);
    }
}
