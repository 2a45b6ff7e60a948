use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct ContextMetrics {
    pub provider_lookups: AtomicU64,
    pub repository_queries: AtomicU64,
    pub hook_invocations: AtomicU64,
    pub rejected_candidates: AtomicU64,
    pub failed_lookups: AtomicU64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextMetricsSnapshot {
    pub provider_lookups: u64,
    pub repository_queries: u64,
    pub hook_invocations: u64,
    pub rejected_candidates: u64,
    pub failed_lookups: u64,
}

impl Default for ContextMetrics {
    fn default() -> Self {
        Self {
            provider_lookups: AtomicU64::new(0),
            repository_queries: AtomicU64::new(0),
            hook_invocations: AtomicU64::new(0),
            rejected_candidates: AtomicU64::new(0),
            failed_lookups: AtomicU64::new(0),
        }
    }
}

impl ContextMetrics {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ContextMetricsSnapshot {
        ContextMetricsSnapshot {
            provider_lookups: self.provider_lookups.load(Ordering::Relaxed),
            repository_queries: self.repository_queries.load(Ordering::Relaxed),
            hook_invocations: self.hook_invocations.load(Ordering::Relaxed),
            rejected_candidates: self.rejected_candidates.load(Ordering::Relaxed),
            failed_lookups: self.failed_lookups.load(Ordering::Relaxed),
        }
    }
}
