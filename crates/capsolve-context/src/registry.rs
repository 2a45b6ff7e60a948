use std::fmt;
use std::sync::Arc;

use capsolve_core::{Repository, ResolverHook};

/// Repositories and resolver hooks available to a resolution, in
/// registration order. Read-only once handed to a context.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    repositories: Vec<Arc<dyn Repository>>,
    hooks: Vec<Arc<dyn ResolverHook>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repositories.push(repository);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ResolverHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn repositories(&self) -> &[Arc<dyn Repository>] {
        &self.repositories
    }

    pub fn hooks(&self) -> &[Arc<dyn ResolverHook>] {
        &self.hooks
    }

    /// Repositories to query. Without an allowlist that is every registered
    /// repository; with one, the named repositories in allowlist order.
    /// Names that match nothing are skipped.
    pub fn select_repositories(&self, allowlist: Option<&[String]>) -> Vec<Arc<dyn Repository>> {
        let Some(names) = allowlist else {
            return self.repositories.clone();
        };
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            match self
                .repositories
                .iter()
                .find(|repository| repository.name() == name)
            {
                Some(repository) => {
                    if !selected
                        .iter()
                        .any(|existing: &Arc<dyn Repository>| Arc::ptr_eq(existing, repository))
                    {
                        selected.push(Arc::clone(repository));
                    }
                }
                None => tracing::warn!(repository = %name, "allowlisted repository is not registered"),
            }
        }
        selected
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.repositories.iter().map(|repo| repo.name()).collect();
        f.debug_struct("PluginRegistry")
            .field("repositories", &names)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use capsolve_core::ResourcesRepository;

    use super::*;

    fn registry() -> PluginRegistry {
        PluginRegistry::new()
            .with_repository(Arc::new(ResourcesRepository::new("a", Vec::new())))
            .with_repository(Arc::new(ResourcesRepository::new("b", Vec::new())))
            .with_repository(Arc::new(ResourcesRepository::new("c", Vec::new())))
    }

    fn names(repos: &[Arc<dyn Repository>]) -> Vec<&str> {
        repos.iter().map(|repo| repo.name()).collect()
    }

    #[test]
    fn no_allowlist_keeps_registration_order() {
        let registry = registry();
        assert_eq!(names(&registry.select_repositories(None)), ["a", "b", "c"]);
    }

    #[test]
    fn allowlist_reorders_and_filters() {
        let registry = registry();
        let allow = vec!["c".to_string(), "missing".to_string(), "a".to_string()];
        assert_eq!(names(&registry.select_repositories(Some(&allow))), ["c", "a"]);
    }
}
