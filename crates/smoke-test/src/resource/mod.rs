//! Read-only resource access.
//!
//! [`ResourceAccessor`] is the single seam between checks and the cluster:
//! typed built-in kinds and custom resources are both queried through a
//! [`ResourceQuery`] and come back as [`ResourceRecord`]s. The live
//! implementation is [`KubeAccessor`]; tests inject an in-memory fake.

mod client;
mod record;
mod selector;

use std::fmt;

use async_trait::async_trait;

use crate::error::AccessError;

pub use client::KubeAccessor;
pub use record::{Lookup, ResourceRecord};
pub use selector::LabelSelector;

/// Coordinates of a custom resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomKind {
    pub group: String,
    pub version: String,
    /// Plural resource name used in API paths (e.g. `applications`).
    pub resource: String,
    /// Kind name (e.g. `Application`).
    pub kind: String,
    pub namespaced: bool,
}

impl CustomKind {
    /// A namespaced custom kind.
    pub fn namespaced(group: &str, version: &str, resource: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
            kind: kind.to_string(),
            namespaced: true,
        }
    }

    /// A cluster-scoped custom kind.
    pub fn cluster(group: &str, version: &str, resource: &str, kind: &str) -> Self {
        Self {
            namespaced: false,
            ..Self::namespaced(group, version, resource, kind)
        }
    }

    /// The `apiextensions.k8s.io/v1` CustomResourceDefinition kind.
    pub fn crd() -> Self {
        Self::cluster(
            "apiextensions.k8s.io",
            "v1",
            "customresourcedefinitions",
            "CustomResourceDefinition",
        )
    }

    /// Same kind at another API version.
    #[must_use]
    pub fn at_version(&self, version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..self.clone()
        }
    }

    /// `group/version`, or just `version` for the core group.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// Resource kinds the accessor knows how to query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Namespace,
    Node,
    Pod,
    Deployment,
    StatefulSet,
    Secret,
    ConfigMap,
    ServiceAccount,
    Ingress,
    Custom(CustomKind),
}

impl ResourceKind {
    /// Whether objects of this kind live inside a namespace.
    #[must_use]
    pub fn is_namespaced(&self) -> bool {
        match self {
            Self::Namespace | Self::Node => false,
            Self::Custom(custom) => custom.namespaced,
            _ => true,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace => write!(f, "Namespace"),
            Self::Node => write!(f, "Node"),
            Self::Pod => write!(f, "Pod"),
            Self::Deployment => write!(f, "Deployment"),
            Self::StatefulSet => write!(f, "StatefulSet"),
            Self::Secret => write!(f, "Secret"),
            Self::ConfigMap => write!(f, "ConfigMap"),
            Self::ServiceAccount => write!(f, "ServiceAccount"),
            Self::Ingress => write!(f, "Ingress"),
            Self::Custom(custom) => write!(f, "{}.{}", custom.resource, custom.group),
        }
    }
}

/// Where a query looks.
///
/// There is deliberately no empty-string namespace: "every namespace" is
/// spelled [`Scope::AllNamespaces`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Cluster-scoped kinds only.
    Cluster,
    Namespace(String),
    AllNamespaces,
}

impl Scope {
    pub fn namespace(name: impl Into<String>) -> Self {
        Self::Namespace(name.into())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster => write!(f, "cluster"),
            Self::Namespace(ns) => write!(f, "namespace/{ns}"),
            Self::AllNamespaces => write!(f, "all-namespaces"),
        }
    }
}

/// A query target: kind, scope and label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub kind: ResourceKind,
    pub scope: Scope,
    pub selector: LabelSelector,
}

impl ResourceQuery {
    /// Query a namespaced kind within one namespace.
    pub fn namespaced(kind: ResourceKind, namespace: &str) -> Self {
        Self {
            kind,
            scope: Scope::namespace(namespace),
            selector: LabelSelector::everything(),
        }
    }

    /// Query a namespaced kind across every namespace.
    pub fn all_namespaces(kind: ResourceKind) -> Self {
        Self {
            kind,
            scope: Scope::AllNamespaces,
            selector: LabelSelector::everything(),
        }
    }

    /// Query a cluster-scoped kind.
    pub fn cluster(kind: ResourceKind) -> Self {
        Self {
            kind,
            scope: Scope::Cluster,
            selector: LabelSelector::everything(),
        }
    }

    /// Narrow the query with an already parsed selector.
    #[must_use]
    pub fn with_selector(mut self, selector: LabelSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Narrow the query with a selector string.
    pub fn with_labels(self, selector: &str) -> Result<Self, AccessError> {
        Ok(self.with_selector(selector.parse()?))
    }

    /// Same query against a custom kind at another version.
    ///
    /// Typed kinds are returned unchanged.
    #[must_use]
    pub fn at_version(&self, version: &str) -> Self {
        let kind = match &self.kind {
            ResourceKind::Custom(custom) => ResourceKind::Custom(custom.at_version(version)),
            other => other.clone(),
        };
        Self {
            kind,
            ..self.clone()
        }
    }

    /// Reject scopes that do not fit the kind.
    pub fn validate(&self) -> Result<(), AccessError> {
        match (&self.scope, self.kind.is_namespaced()) {
            (Scope::Namespace(ns), _) if ns.is_empty() => Err(AccessError::InvalidQuery(format!(
                "{} query has an empty namespace; use all-namespaces explicitly",
                self.kind
            ))),
            (Scope::Namespace(_), false) => Err(AccessError::InvalidQuery(format!(
                "{} is cluster-scoped and cannot be queried in a namespace",
                self.kind
            ))),
            (Scope::Cluster, true) => Err(AccessError::InvalidQuery(format!(
                "{} is namespaced; specify a namespace or all-namespaces",
                self.kind
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ResourceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.kind, self.scope)?;
        if !self.selector.is_empty() {
            write!(f, " [{}]", self.selector)?;
        }
        Ok(())
    }
}

/// Uniform read-only access to cluster state.
///
/// Implementations never retry: one failed call surfaces immediately.
#[async_trait]
pub trait ResourceAccessor: Send + Sync {
    /// List objects matching the query.
    async fn list(&self, query: &ResourceQuery) -> Result<Vec<ResourceRecord>, AccessError>;

    /// Fetch one object by name. A missing object is `AccessError::NotFound`.
    async fn get(&self, query: &ResourceQuery, name: &str) -> Result<ResourceRecord, AccessError>;

    /// API server version string.
    async fn server_version(&self) -> Result<String, AccessError>;

    /// Confirm a `group/version` is served (e.g. `metrics.k8s.io/v1beta1`).
    async fn api_group_version(&self, group_version: &str) -> Result<(), AccessError>;
}
