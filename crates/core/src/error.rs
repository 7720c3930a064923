//! Error taxonomy for reconciliation passes.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the orchestration API adapters and the engine.
///
/// `NotFound` and `AlreadyExists` are expected at several call sites and are
/// usually absorbed by the caller. `Conflict` and `Unavailable` are transient
/// and retried. Everything else is permanent for the current pass.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Stale write: the object's version token changed under us.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Throttling, server-side or transport failure.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Permanent API failure (rejected request, forbidden, invalid object).
    #[error("api: {0}")]
    Api(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Contextual wrapper added at the reconciler boundary.
    #[error("{resource} {op}: {source}")]
    Resource {
        resource: &'static str,
        op: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Wrap with the resource kind and operation that produced the error.
    pub fn within(self, resource: &'static str, op: &'static str) -> Self {
        Self::Resource { resource, op, source: Box::new(self) }
    }

    /// The innermost error, looking through `Resource` wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Self::Resource { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self.root(), Self::AlreadyExists(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), Self::Conflict(_))
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self.root(), Self::Conflict(_) | Self::Unavailable(_))
    }
}
