//! Resolution context for capsolve.
//!
//! [`ResolutionContext`] implements [`capsolve_core::ResolveContext`] on top
//! of a [`RunConfig`] and an injected [`PluginRegistry`]. It picks the
//! framework, synthesizes the capabilities the framework and its execution
//! environment provide, merges candidates from every repository in
//! preference order and memoizes the answers for a backtracking resolver.

pub mod cache;
pub mod comparator;
pub mod config;
pub mod context;
pub mod ee;
pub mod error;
pub mod framework;
pub mod metrics;
pub mod registry;

pub use cache::{CacheKey, ProviderCache, ProviderCacheStats};
pub use comparator::CandidateComparator;
pub use config::{FrameworkSpec, RequirementSpec, RunConfig};
pub use context::{InitReport, ResolutionContext};
pub use ee::ExecutionEnvironment;
pub use error::ResolveError;
pub use framework::FrameworkCapabilityRepository;
pub use metrics::{ContextMetrics, ContextMetricsSnapshot};
pub use registry::PluginRegistry;
