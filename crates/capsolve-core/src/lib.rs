//! Resource model for capsolve.
//!
//! This crate provides the building blocks shared by the resolution context
//! and its collaborators: resources with their capabilities and requirements,
//! typed attributes, OSGi style versions and version ranges, LDAP style
//! filters, the manifest header clause grammar, and the SPI traits that
//! repositories, resolver hooks and the external resolver algorithm speak.
//! It does not rank or cache anything; `capsolve-context` does that on top of
//! these types.

pub mod attrs;
pub mod filter;
pub mod header;
pub mod namespace;
pub mod repository;
pub mod resource;
pub mod spi;
pub mod version;

pub use attrs::{AttrError, AttrValue, Attributes, Directives};
pub use filter::{Filter, FilterError};
pub use header::{Clause, HeaderError, parse_header};
pub use repository::{IndexError, ResourcesRepository};
pub use resource::{CapReqBuilder, Capability, HostedCapability, Requirement, Resource, ResourceBuilder};
pub use spi::{Repository, ResolveContext, ResolverHook, Wiring};
pub use version::{VersionError, VersionRange, coerce_version, display_version, empty_version};
