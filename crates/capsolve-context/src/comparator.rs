use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use capsolve_core::namespace::{
    BUNDLE, BUNDLE_SYMBOLIC_NAME_ATTRIBUTE, BUNDLE_VERSION_ATTRIBUTE, IDENTITY, PACKAGE,
    VERSION_ATTRIBUTE,
};
use capsolve_core::{AttrValue, Capability, Resource, Wiring, empty_version};
use semver::Version;

/// Preference order for candidate capabilities, most preferred first.
///
/// Rules, each consulted only when all earlier ones tie:
/// 1. capabilities of the framework resource
/// 2. capabilities of wired resources
/// 3. capabilities of the input-requirements resource
/// 4. two packages: higher `version`
/// 5. two bundles or two identities: higher resource version
/// 6. two packages: grouped by `bundle-symbolic-name`, higher
///    `bundle-version` within a group
/// 7. resources with more capabilities
///
/// A provider list only ever holds one namespace; capabilities of different
/// namespaces are ordered by namespace name after rule 3 so the order stays
/// total.
#[derive(Debug, Clone, Default)]
pub struct CandidateComparator {
    framework: Option<Resource>,
    input: Option<Resource>,
    wired: HashSet<Resource>,
}

impl CandidateComparator {
    pub fn new(
        framework: Option<Resource>,
        input: Option<Resource>,
        wirings: &HashMap<Resource, Wiring>,
    ) -> Self {
        Self {
            framework,
            input,
            wired: wirings.keys().cloned().collect(),
        }
    }

    pub fn compare(&self, a: &Capability, b: &Capability) -> Ordering {
        let (ra, rb) = (a.resource(), b.resource());
        prefer(self.is_framework(ra), self.is_framework(rb))
            .then_with(|| prefer(self.wired.contains(ra), self.wired.contains(rb)))
            .then_with(|| prefer(self.is_input(ra), self.is_input(rb)))
            .then_with(|| a.namespace().cmp(b.namespace()))
            .then_with(|| package_version(a, b))
            .then_with(|| resource_version(a, b))
            .then_with(|| bundle_of_package(a, b))
            .then_with(|| rb.capability_count().cmp(&ra.capability_count()))
    }

    /// Stable sort, so equally ranked candidates keep their arrival order.
    pub fn sort(&self, capabilities: &mut [Capability]) {
        capabilities.sort_by(|a, b| self.compare(a, b));
    }

    fn is_framework(&self, resource: &Resource) -> bool {
        self.framework.as_ref() == Some(resource)
    }

    fn is_input(&self, resource: &Resource) -> bool {
        self.input.as_ref() == Some(resource)
    }
}

/// `true` sorts first.
fn prefer(a: bool, b: bool) -> Ordering {
    b.cmp(&a)
}

fn version_attribute(capability: &Capability, name: &str) -> Version {
    capability
        .attribute(name)
        .and_then(AttrValue::as_version)
        .unwrap_or_else(empty_version)
}

fn package_version(a: &Capability, b: &Capability) -> Ordering {
    if a.namespace() != PACKAGE || b.namespace() != PACKAGE {
        return Ordering::Equal;
    }
    version_attribute(b, VERSION_ATTRIBUTE).cmp(&version_attribute(a, VERSION_ATTRIBUTE))
}

fn resource_version(a: &Capability, b: &Capability) -> Ordering {
    if a.namespace() != b.namespace() || (a.namespace() != BUNDLE && a.namespace() != IDENTITY) {
        return Ordering::Equal;
    }
    let va = a.resource().version().unwrap_or_else(empty_version);
    let vb = b.resource().version().unwrap_or_else(empty_version);
    vb.cmp(&va)
}

/// Packages exported by same-named bundles rank by bundle version. Packages
/// of differently named bundles are kept apart by name (unnamed last) so the
/// overall order stays consistent.
///
/// The name split comes before the capability count, so the count only
/// decides between packages of unnamed or same-named bundles.
fn bundle_of_package(a: &Capability, b: &Capability) -> Ordering {
    if a.namespace() != PACKAGE || b.namespace() != PACKAGE {
        return Ordering::Equal;
    }
    let bsn = |capability: &Capability| {
        capability
            .attribute(BUNDLE_SYMBOLIC_NAME_ATTRIBUTE)
            .and_then(AttrValue::as_str)
            .map(str::to_string)
    };
    match (bsn(a), bsn(b)) {
        (Some(name_a), Some(name_b)) if name_a == name_b => version_attribute(b, BUNDLE_VERSION_ATTRIBUTE)
            .cmp(&version_attribute(a, BUNDLE_VERSION_ATTRIBUTE)),
        (Some(name_a), Some(name_b)) => name_a.cmp(&name_b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
