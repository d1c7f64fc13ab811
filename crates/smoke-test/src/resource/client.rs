//! Live [`ResourceAccessor`] backed by a kube client.

use std::fmt::Debug;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Node, Pod, Secret, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ApiResource, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{CustomKind, ResourceAccessor, ResourceKind, ResourceQuery, ResourceRecord, Scope};
use crate::error::AccessError;

fn api_resource(custom: &CustomKind) -> ApiResource {
    ApiResource {
        group: custom.group.clone(),
        version: custom.version.clone(),
        api_version: custom.api_version(),
        kind: custom.kind.clone(),
        plural: custom.resource.clone(),
    }
}

/// Cluster access through the Kubernetes API.
///
/// The client is cheap to clone and pools connections, so one accessor is
/// shared by every check in a run.
#[derive(Clone)]
pub struct KubeAccessor {
    client: Client,
}

impl KubeAccessor {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build an accessor from an explicit kubeconfig file.
    ///
    /// # Errors
    ///
    /// Returns an error if the kubeconfig cannot be read or the client cannot be created.
    pub async fn from_kubeconfig(path: &Path, context: Option<&str>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("Failed to read kubeconfig from {}", path.display()))?;

        let options = KubeConfigOptions {
            context: context.map(ToString::to_string),
            ..KubeConfigOptions::default()
        };

        let config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .context("Failed to create Kubernetes config from kubeconfig")?;

        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }

    /// Build an accessor from the environment: in-cluster config, or the
    /// default kubeconfig (optionally with a named context).
    ///
    /// # Errors
    ///
    /// Returns an error if no usable configuration is found.
    pub async fn infer(context: Option<&str>) -> Result<Self> {
        let config = match context {
            Some(name) => {
                let options = KubeConfigOptions {
                    context: Some(name.to_string()),
                    ..KubeConfigOptions::default()
                };
                Config::from_kubeconfig(&options)
                    .await
                    .with_context(|| format!("Failed to load kubeconfig context '{name}'"))?
            }
            None => Config::infer()
                .await
                .context("Failed to infer Kubernetes configuration")?,
        };

        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }

    fn namespaced_api<K>(&self, scope: &Scope) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        match scope {
            Scope::Namespace(ns) => Api::namespaced(self.client.clone(), ns),
            Scope::AllNamespaces | Scope::Cluster => Api::all(self.client.clone()),
        }
    }

    fn cluster_api<K>(&self) -> Api<K>
    where
        K: Resource<DynamicType = ()>,
    {
        Api::all(self.client.clone())
    }

    fn dynamic_api(&self, custom: &CustomKind, scope: &Scope) -> Api<DynamicObject> {
        let resource = api_resource(custom);
        match scope {
            Scope::Namespace(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            Scope::AllNamespaces | Scope::Cluster => Api::all_with(self.client.clone(), &resource),
        }
    }

    async fn list_with<K>(
        api: Api<K>,
        query: &ResourceQuery,
    ) -> Result<Vec<ResourceRecord>, AccessError>
    where
        K: Resource + Clone + DeserializeOwned + Serialize + Debug,
    {
        let mut params = ListParams::default();
        if !query.selector.is_empty() {
            params = params.labels(&query.selector.to_string());
        }

        let list = api
            .list(&params)
            .await
            .map_err(|e| AccessError::from_kube(e, &query.kind.to_string(), "*"))?;

        list.items.iter().map(ResourceRecord::from_resource).collect()
    }

    async fn get_with<K>(
        api: Api<K>,
        query: &ResourceQuery,
        name: &str,
    ) -> Result<ResourceRecord, AccessError>
    where
        K: Resource + Clone + DeserializeOwned + Serialize + Debug,
    {
        let object = api
            .get(name)
            .await
            .map_err(|e| AccessError::from_kube(e, &query.kind.to_string(), name))?;

        ResourceRecord::from_resource(&object)
    }
}

#[async_trait]
impl ResourceAccessor for KubeAccessor {
    async fn list(&self, query: &ResourceQuery) -> Result<Vec<ResourceRecord>, AccessError> {
        query.validate()?;
        debug!(query = %query, "Listing resources");

        let scope = &query.scope;
        match &query.kind {
            ResourceKind::Namespace => {
                Self::list_with(self.cluster_api::<Namespace>(), query).await
            }
            ResourceKind::Node => Self::list_with(self.cluster_api::<Node>(), query).await,
            ResourceKind::Pod => Self::list_with(self.namespaced_api::<Pod>(scope), query).await,
            ResourceKind::Deployment => {
                Self::list_with(self.namespaced_api::<Deployment>(scope), query).await
            }
            ResourceKind::StatefulSet => {
                Self::list_with(self.namespaced_api::<StatefulSet>(scope), query).await
            }
            ResourceKind::Secret => {
                Self::list_with(self.namespaced_api::<Secret>(scope), query).await
            }
            ResourceKind::ConfigMap => {
                Self::list_with(self.namespaced_api::<ConfigMap>(scope), query).await
            }
            ResourceKind::ServiceAccount => {
                Self::list_with(self.namespaced_api::<ServiceAccount>(scope), query).await
            }
            ResourceKind::Ingress => {
                Self::list_with(self.namespaced_api::<Ingress>(scope), query).await
            }
            ResourceKind::Custom(custom) => {
                Self::list_with(self.dynamic_api(custom, scope), query).await
            }
        }
    }

    async fn get(&self, query: &ResourceQuery, name: &str) -> Result<ResourceRecord, AccessError> {
        query.validate()?;
        if matches!(query.scope, Scope::AllNamespaces) && query.kind.is_namespaced() {
            return Err(AccessError::InvalidQuery(format!(
                "get of {} '{name}' needs a namespace",
                query.kind
            )));
        }
        debug!(query = %query, name, "Fetching resource");

        let scope = &query.scope;
        match &query.kind {
            ResourceKind::Namespace => {
                Self::get_with(self.cluster_api::<Namespace>(), query, name).await
            }
            ResourceKind::Node => Self::get_with(self.cluster_api::<Node>(), query, name).await,
            ResourceKind::Pod => {
                Self::get_with(self.namespaced_api::<Pod>(scope), query, name).await
            }
            ResourceKind::Deployment => {
                Self::get_with(self.namespaced_api::<Deployment>(scope), query, name).await
            }
            ResourceKind::StatefulSet => {
                Self::get_with(self.namespaced_api::<StatefulSet>(scope), query, name).await
            }
            ResourceKind::Secret => {
                Self::get_with(self.namespaced_api::<Secret>(scope), query, name).await
            }
            ResourceKind::ConfigMap => {
                Self::get_with(self.namespaced_api::<ConfigMap>(scope), query, name).await
            }
            ResourceKind::ServiceAccount => {
                Self::get_with(self.namespaced_api::<ServiceAccount>(scope), query, name).await
            }
            ResourceKind::Ingress => {
                Self::get_with(self.namespaced_api::<Ingress>(scope), query, name).await
            }
            ResourceKind::Custom(custom) => {
                Self::get_with(self.dynamic_api(custom, scope), query, name).await
            }
        }
    }

    async fn server_version(&self) -> Result<String, AccessError> {
        let info = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| AccessError::Transport(e.to_string()))?;
        Ok(info.git_version)
    }

    async fn api_group_version(&self, group_version: &str) -> Result<(), AccessError> {
        debug!(group_version, "Discovering API group version");
        self.client
            .list_api_group_resources(group_version)
            .await
            .map(|_| ())
            .map_err(|e| AccessError::from_kube(e, "APIGroupVersion", group_version))
    }
}
