use std::hash::{DefaultHasher, Hash, Hasher};

use capsolve_core::{Attributes, Requirement};

/// Memo key for provider lookups: namespace, filter text and attributes.
/// Requirements that differ only in owner or in other directives share an
/// entry. The hash is computed once.
#[derive(Clone, Debug, Eq)]
pub struct CacheKey {
    namespace: String,
    filter: Option<String>,
    attributes: Attributes,
    hash: u64,
}

impl CacheKey {
    pub fn new(namespace: String, filter: Option<String>, attributes: Attributes) -> Self {
        let mut hasher = DefaultHasher::new();
        namespace.hash(&mut hasher);
        filter.hash(&mut hasher);
        attributes.hash(&mut hasher);
        Self {
            namespace,
            filter,
            attributes,
            hash: hasher.finish(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}

impl From<&Requirement> for CacheKey {
    fn from(requirement: &Requirement) -> Self {
        Self::new(
            requirement.namespace().to_string(),
            requirement.filter().map(str::to_string),
            requirement.attributes().clone(),
        )
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.namespace == other.namespace
            && self.filter == other.filter
            && self.attributes == other.attributes
    }
}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}
