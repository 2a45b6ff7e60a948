use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use semver::Version;

use crate::attrs::{AttrValue, Attributes, Directives};
use crate::filter::{Filter, FilterError, escape_value};
use crate::header::Clause;
use crate::namespace;
use crate::version::{VersionRange, display_version};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CapabilityData {
    namespace: String,
    attributes: Attributes,
    directives: Directives,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RequirementData {
    namespace: String,
    attributes: Attributes,
    directives: Directives,
}

#[derive(Debug, Default)]
struct ResourceInner {
    capabilities: Vec<Arc<CapabilityData>>,
    requirements: Vec<Arc<RequirementData>>,
}

/// A unit of distribution. Cloning shares the handle; two handles are equal
/// only when they point at the same resource.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::default()
    }

    /// Declared capabilities, optionally restricted to one namespace.
    pub fn capabilities(&self, namespace: Option<&str>) -> Vec<Capability> {
        self.inner
            .capabilities
            .iter()
            .filter(|data| namespace.is_none_or(|ns| data.namespace == ns))
            .map(|data| Capability {
                resource: self.clone(),
                data: Arc::clone(data),
            })
            .collect()
    }

    pub fn requirements(&self, namespace: Option<&str>) -> Vec<Requirement> {
        self.inner
            .requirements
            .iter()
            .filter(|data| namespace.is_none_or(|ns| data.namespace == ns))
            .map(|data| Requirement {
                resource: Some(self.clone()),
                data: Arc::clone(data),
            })
            .collect()
    }

    pub fn capability_count(&self) -> usize {
        self.inner.capabilities.len()
    }

    pub fn identity_count(&self) -> usize {
        self.inner
            .capabilities
            .iter()
            .filter(|data| data.namespace == namespace::IDENTITY)
            .count()
    }

    /// Symbolic name from the first `osgi.identity` capability.
    pub fn identity(&self) -> Option<&str> {
        self.identity_data()
            .and_then(|data| data.attributes.get(namespace::IDENTITY))
            .and_then(AttrValue::as_str)
    }

    /// Version from the first `osgi.identity` capability.
    pub fn version(&self) -> Option<Version> {
        self.identity_data()
            .and_then(|data| data.attributes.get(namespace::VERSION_ATTRIBUTE))
            .and_then(AttrValue::as_version)
    }

    /// Whether any capability in `namespace` carries `attribute` equal to
    /// `value` (directly or as a list element).
    pub fn declares(&self, namespace: &str, attribute: &str, value: &str) -> bool {
        self.inner.capabilities.iter().any(|data| {
            data.namespace == namespace
                && match data.attributes.get(attribute) {
                    Some(AttrValue::List(items)) => {
                        items.iter().any(|item| item.as_str() == Some(value))
                    }
                    Some(other) => other.as_str() == Some(value),
                    None => false,
                }
        })
    }

    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn identity_data(&self) -> Option<&CapabilityData> {
        self.inner
            .capabilities
            .iter()
            .find(|data| data.namespace == namespace::IDENTITY)
            .map(Arc::as_ref)
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.identity(), self.version()) {
            (Some(name), Some(version)) => write!(f, "{name}@{}", display_version(&version)),
            (Some(name), None) => f.write_str(name),
            (None, _) => write!(f, "<anonymous {:p}>", Arc::as_ptr(&self.inner)),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResourceBuilder {
    capabilities: Vec<Arc<CapabilityData>>,
    requirements: Vec<Arc<RequirementData>>,
}

impl ResourceBuilder {
    pub fn capability(mut self, builder: CapReqBuilder) -> Self {
        self.capabilities.push(Arc::new(builder.into_capability_data()));
        self
    }

    pub fn requirement(mut self, builder: CapReqBuilder) -> Self {
        self.requirements.push(Arc::new(builder.into_requirement_data()));
        self
    }

    /// Re-home an existing requirement onto the resource being built.
    pub fn adopt_requirement(mut self, requirement: &Requirement) -> Self {
        self.requirements.push(Arc::clone(&requirement.data));
        self
    }

    /// Add the `osgi.identity` capability.
    pub fn identity(self, name: &str, version: Version) -> Self {
        self.capability(
            CapReqBuilder::new(namespace::IDENTITY)
                .attribute(namespace::IDENTITY, name)
                .attribute(namespace::VERSION_ATTRIBUTE, version),
        )
    }

    /// Add an `osgi.wiring.package` export.
    pub fn export_package(self, package: &str, version: Version) -> Self {
        self.capability(
            CapReqBuilder::new(namespace::PACKAGE)
                .attribute(namespace::PACKAGE, package)
                .attribute(namespace::VERSION_ATTRIBUTE, version),
        )
    }

    pub fn build(self) -> Resource {
        Resource {
            inner: Arc::new(ResourceInner {
                capabilities: self.capabilities,
                requirements: self.requirements,
            }),
        }
    }
}

/// A fact offered by a resource. The owning resource need not declare it:
/// synthesized and hosted capabilities are attributed to another resource.
#[derive(Clone)]
pub struct Capability {
    resource: Resource,
    data: Arc<CapabilityData>,
}

impl Capability {
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn namespace(&self) -> &str {
        &self.data.namespace
    }

    pub fn attributes(&self) -> &Attributes {
        &self.data.attributes
    }

    pub fn directives(&self) -> &Directives {
        &self.data.directives
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.data.attributes.get(name)
    }

    /// Same capability data, attributed to `resource`.
    pub fn rehome(&self, resource: &Resource) -> Capability {
        Capability {
            resource: resource.clone(),
            data: Arc::clone(&self.data),
        }
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource
            && (Arc::ptr_eq(&self.data, &other.data) || self.data == other.data)
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.data.hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("namespace", &self.data.namespace)
            .field("attributes", &self.data.attributes)
            .field("resource", &self.resource)
            .finish()
    }
}

/// A need declared by a resource or by the top-level request. Compared
/// structurally, including the identity of the owning resource.
#[derive(Clone)]
pub struct Requirement {
    resource: Option<Resource>,
    data: Arc<RequirementData>,
}

impl Requirement {
    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    pub fn namespace(&self) -> &str {
        &self.data.namespace
    }

    pub fn attributes(&self) -> &Attributes {
        &self.data.attributes
    }

    pub fn directives(&self) -> &Directives {
        &self.data.directives
    }

    /// Raw `filter:=` directive text.
    pub fn filter(&self) -> Option<&str> {
        self.data.directives.get(namespace::FILTER_DIRECTIVE)
    }

    pub fn parsed_filter(&self) -> Result<Option<Filter>, FilterError> {
        self.filter().map(Filter::parse).transpose()
    }

    pub fn effective(&self) -> Option<&str> {
        self.data.directives.get(namespace::EFFECTIVE_DIRECTIVE)
    }

    pub fn is_optional(&self) -> bool {
        self.data.directives.get(namespace::RESOLUTION_DIRECTIVE)
            == Some(namespace::RESOLUTION_OPTIONAL)
    }

    /// Namespace equality plus filter match; no filter matches everything.
    pub fn matches(&self, capability: &Capability) -> Result<bool, FilterError> {
        if capability.namespace() != self.namespace() {
            return Ok(false);
        }
        Ok(self
            .parsed_filter()?
            .is_none_or(|filter| filter.matches(capability.attributes())))
    }
}

impl PartialEq for Requirement {
    fn eq(&self, other: &Self) -> bool {
        let same_owner = match (&self.resource, &other.resource) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        };
        same_owner && (Arc::ptr_eq(&self.data, &other.data) || self.data == other.data)
    }
}

impl Eq for Requirement {}

impl Hash for Requirement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
        self.resource.hash(state);
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data.namespace)?;
        if let Some(filter) = self.filter() {
            write!(f, ": {filter}")?;
        }
        if self.is_optional() {
            f.write_str(" (optional)")?;
        }
        Ok(())
    }
}

/// A capability the resolver bound to a host other than its declarer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostedCapability {
    resource: Resource,
    declared: Capability,
}

impl HostedCapability {
    pub fn new(host: Resource, declared: Capability) -> Self {
        Self {
            resource: host,
            declared,
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn declared(&self) -> &Capability {
        &self.declared
    }

    pub fn into_capability(self) -> Capability {
        self.declared.rehome(&self.resource)
    }
}

/// Builder shared by capabilities and requirements.
#[derive(Debug, Clone)]
pub struct CapReqBuilder {
    namespace: String,
    attributes: Attributes,
    directives: Directives,
}

impl CapReqBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            attributes: Attributes::new(),
            directives: Directives::new(),
        }
    }

    /// Capability or requirement from a header clause; the clause name
    /// becomes the namespace attribute unless one is given.
    pub fn from_clause(namespace: &str, clause: &Clause) -> Self {
        let mut builder = Self::new(namespace);
        builder.attributes = clause.attributes.clone();
        builder.directives = clause.directives.clone();
        if !builder.attributes.contains_key(namespace) {
            builder.attributes.insert(namespace, clause.name.as_str());
        }
        builder
    }

    /// Requirement for a resource by symbolic name, optionally restricted to
    /// a version range.
    pub fn identity_requirement(name: &str, range: Option<&VersionRange>) -> Self {
        let base = format!("({}={})", namespace::IDENTITY, escape_value(name));
        let filter = match range {
            Some(range) => format!(
                "(&{base}{})",
                range.to_filter(namespace::VERSION_ATTRIBUTE)
            ),
            None => base,
        };
        Self::new(namespace::IDENTITY).filter(filter)
    }

    pub fn package_requirement(package: &str) -> Self {
        Self::new(namespace::PACKAGE).filter(format!(
            "({}={})",
            namespace::PACKAGE,
            escape_value(package)
        ))
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name, value);
        self
    }

    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn directive(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.insert(name, value);
        self
    }

    pub fn directives(mut self, directives: Directives) -> Self {
        self.directives = directives;
        self
    }

    pub fn filter(self, filter: impl Into<String>) -> Self {
        self.directive(namespace::FILTER_DIRECTIVE, filter)
    }

    pub fn optional(self) -> Self {
        self.directive(namespace::RESOLUTION_DIRECTIVE, namespace::RESOLUTION_OPTIONAL)
    }

    pub fn build_capability(self, resource: &Resource) -> Capability {
        Capability {
            resource: resource.clone(),
            data: Arc::new(self.into_capability_data()),
        }
    }

    /// Requirement without an owning resource.
    pub fn build_requirement(self) -> Requirement {
        Requirement {
            resource: None,
            data: Arc::new(self.into_requirement_data()),
        }
    }

    fn into_capability_data(self) -> CapabilityData {
        CapabilityData {
            namespace: self.namespace,
            attributes: self.attributes,
            directives: self.directives,
        }
    }

    fn into_requirement_data(self) -> RequirementData {
        RequirementData {
            namespace: self.namespace,
            attributes: self.attributes,
            directives: self.directives,
        }
    }
}
