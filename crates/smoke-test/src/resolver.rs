//! API-version fallback for custom resource lookups.
//!
//! Custom resource APIs move between versions (`v1beta1` → `v1`) and a cluster
//! in the middle of an upgrade may serve either. The resolver tries each
//! candidate version in caller order and stops at the first success.

use std::future::Future;

use tracing::debug;

use crate::error::AccessError;
use crate::resource::{ResourceAccessor, ResourceQuery, ResourceRecord};

/// A lookup result plus the version that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub version: String,
    pub value: T,
}

/// Try `attempt` for each version in order.
///
/// Returns the first success. If every version fails, the error from the
/// last attempted version is returned. An empty candidate list is an invalid
/// query.
pub async fn resolve<T, F, Fut>(
    versions: &[&str],
    mut attempt: F,
) -> Result<Resolved<T>, AccessError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, AccessError>>,
{
    let mut last_error = None;

    for version in versions {
        match attempt((*version).to_string()).await {
            Ok(value) => {
                return Ok(Resolved {
                    version: (*version).to_string(),
                    value,
                })
            }
            Err(err) => {
                debug!(version, error = %err, "Version attempt failed, falling through");
                last_error = Some(err);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| AccessError::InvalidQuery("no candidate API versions given".into())))
}

/// Version-agnostic `get` and `list` over a [`ResourceAccessor`].
pub struct VersionResolver<'a> {
    accessor: &'a dyn ResourceAccessor,
}

impl<'a> VersionResolver<'a> {
    pub fn new(accessor: &'a dyn ResourceAccessor) -> Self {
        Self { accessor }
    }

    /// Fetch a named custom resource, trying `versions` in order.
    pub async fn get(
        &self,
        query: &ResourceQuery,
        name: &str,
        versions: &[&str],
    ) -> Result<Resolved<ResourceRecord>, AccessError> {
        resolve(versions, |version| {
            let versioned = query.at_version(&version);
            async move { self.accessor.get(&versioned, name).await }
        })
        .await
    }

    /// List custom resources, trying `versions` in order.
    pub async fn list(
        &self,
        query: &ResourceQuery,
        versions: &[&str],
    ) -> Result<Resolved<Vec<ResourceRecord>>, AccessError> {
        resolve(versions, |version| {
            let versioned = query.at_version(&version);
            async move { self.accessor.list(&versioned).await }
        })
        .await
    }
}
