//! Error types for cluster access and check evaluation.

use thiserror::Error;

/// Errors surfaced by a [`ResourceAccessor`](crate::resource::ResourceAccessor).
///
/// `NotFound` is kept apart from transport failures so that "resource absent"
/// can be reported precisely instead of as a generic API error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The targeted object, namespace or custom resource kind does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// The API call failed below the resource-existence level
    /// (auth, network, serialization).
    #[error("API request failed: {0}")]
    Transport(String),

    /// The query itself is malformed (ambiguous scope, bad selector).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl AccessError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Whether this error means the target is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Classify a kube client error. HTTP 404 becomes `NotFound`.
    pub fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(response) if response.code == 404 => Self::not_found(kind, name),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Everything a check can run into while evaluating.
///
/// Each variant maps onto exactly one outcome status through
/// [`CheckError::status`]; errors never leave the check that produced them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckError {
    /// Cluster lookup failed.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// An HTTP probe could not complete.
    #[error("{host} not reachable: {reason}")]
    Unreachable { host: String, reason: String },

    /// Two values expected to be equal diverge.
    #[error("{what} mismatch")]
    Mismatch { what: String },
}

/// How much a check matters to overall platform health.
///
/// Transport errors in critical checks fail the run; in advisory checks they
/// only warn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Criticality {
    #[default]
    Critical,
    Advisory,
}

impl CheckError {
    /// Outcome status this error maps to.
    #[must_use]
    pub fn status(&self, criticality: Criticality) -> crate::check::Status {
        use crate::check::Status;

        match self {
            Self::Access(AccessError::NotFound { .. }) | Self::Mismatch { .. } => Status::Fail,
            Self::Access(_) => match criticality {
                Criticality::Critical => Status::Fail,
                Criticality::Advisory => Status::Warning,
            },
            Self::Unreachable { .. } => Status::Warning,
        }
    }
}
