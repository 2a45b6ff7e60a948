//! Well-known namespace, attribute and directive names.
//!
//! Namespaces stay plain strings: repositories are free to introduce their
//! own, so nothing here is exhaustive.

pub const IDENTITY: &str = "osgi.identity";
pub const PACKAGE: &str = "osgi.wiring.package";
pub const BUNDLE: &str = "osgi.wiring.bundle";
pub const HOST: &str = "osgi.wiring.host";
pub const EXECUTION_ENVIRONMENT: &str = "osgi.ee";
pub const CONTRACT: &str = "osgi.contract";

pub const VERSION_ATTRIBUTE: &str = "version";
pub const BUNDLE_SYMBOLIC_NAME_ATTRIBUTE: &str = "bundle-symbolic-name";
pub const BUNDLE_VERSION_ATTRIBUTE: &str = "bundle-version";

pub const FILTER_DIRECTIVE: &str = "filter";
pub const EFFECTIVE_DIRECTIVE: &str = "effective";
pub const RESOLUTION_DIRECTIVE: &str = "resolution";

pub const RESOLUTION_OPTIONAL: &str = "optional";
pub const EFFECTIVE_RESOLVE: &str = "resolve";
pub const EFFECTIVE_ACTIVE: &str = "active";

/// Contract name that marks a resource as a runtime framework implementation.
pub const FRAMEWORK_CONTRACT: &str = "OSGiFramework";
/// Symbolic name every framework also answers to on bundle/host wiring.
pub const SYSTEM_BUNDLE_ALIAS: &str = "system.bundle";
/// Identity of the synthetic resource that carries the top-level requirements.
pub const IDENTITY_INITIAL_RESOURCE: &str = "<<INITIAL>>";
/// Identity of the core API jar, which can never stand in for a bundle.
pub const IDENTITY_OSGI_CORE: &str = "osgi.core";
