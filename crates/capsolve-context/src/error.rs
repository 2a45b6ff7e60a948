use capsolve_core::{FilterError, HeaderError, VersionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not find framework {spec}")]
    FrameworkNotFound { spec: String },
    #[error("unknown execution environment `{0}`")]
    UnknownExecutionEnvironment(String),
    #[error(transparent)]
    InvalidVersion(#[from] VersionError),
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),
    #[error(transparent)]
    InvalidHeader(#[from] HeaderError),
    #[error(transparent)]
    Repository(anyhow::Error),
    #[error(transparent)]
    Hook(anyhow::Error),
    #[error("resolution context initialization failed earlier; create a new context")]
    InitAborted,
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
