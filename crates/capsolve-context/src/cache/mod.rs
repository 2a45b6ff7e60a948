use std::collections::HashMap;
use std::sync::Arc;

use capsolve_core::Capability;
use parking_lot::Mutex;

pub mod keys;

pub use keys::CacheKey;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

/// Memoized provider lists, kept for the lifetime of one resolution attempt.
/// Entries are never evicted or replaced.
#[derive(Debug, Clone, Default)]
pub struct ProviderCache {
    state: Arc<Mutex<ProviderCacheState>>,
}

#[derive(Debug, Default)]
struct ProviderCacheState {
    entries: HashMap<CacheKey, Vec<Capability>>,
    hits: u64,
    misses: u64,
}

impl ProviderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the cached list; callers may mutate it freely.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<Capability>> {
        let mut state = self.state.lock();
        match state.entries.get(key).cloned() {
            Some(capabilities) => {
                state.hits = state.hits.saturating_add(1);
                Some(capabilities)
            }
            None => {
                state.misses = state.misses.saturating_add(1);
                None
            }
        }
    }

    /// Store `capabilities` unless the key already has an entry; the first
    /// stored list wins.
    pub fn insert(&self, key: CacheKey, capabilities: Vec<Capability>) {
        let mut state = self.state.lock();
        state.entries.entry(key).or_insert(capabilities);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    pub fn stats(&self) -> ProviderCacheStats {
        let state = self.state.lock();
        ProviderCacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.entries.len() as u64,
        }
    }
}
