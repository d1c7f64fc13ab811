//! In-memory cluster and prober for scenario tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

use smoke_test::resource::{CustomKind, ResourceKind, ResourceQuery, ResourceRecord, Scope};
use smoke_test::{AccessError, Reachability, ReachabilityProbe, ResourceAccessor};

// =============================================================================
// Fake cluster
// =============================================================================

/// A read-only cluster held in memory.
///
/// Typed kinds are always served. Custom kinds are served only once an object
/// of that exact group/version has been added or [`FakeCluster::serve`] was
/// called; otherwise every request for them is `NotFound`, as a cluster
/// without the CRD answers.
#[derive(Default)]
pub struct FakeCluster {
    objects: HashMap<ResourceKind, Vec<ResourceRecord>>,
    served: HashSet<ResourceKind>,
    failures: HashMap<ResourceKind, AccessError>,
    groups: HashSet<String>,
    version: Option<String>,
    calls: Mutex<Vec<String>>,
}

fn kind_key(kind: &ResourceKind) -> String {
    match kind {
        ResourceKind::Custom(custom) => format!("{}/{}", custom.api_version(), custom.resource),
        other => other.to_string(),
    }
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            version: Some("v1.31.2".to_string()),
            ..Self::default()
        }
    }

    /// Add an object of `kind`.
    pub fn with(mut self, kind: ResourceKind, object: Value) -> Self {
        self.served.insert(kind.clone());
        self.objects
            .entry(kind)
            .or_default()
            .push(ResourceRecord::from_json(object));
        self
    }

    /// Register a custom kind with no objects.
    pub fn serve(mut self, kind: CustomKind) -> Self {
        self.served.insert(ResourceKind::Custom(kind));
        self
    }

    /// Make every request for `kind` fail with `err`.
    pub fn failing(mut self, kind: ResourceKind, err: AccessError) -> Self {
        self.failures.insert(kind, err);
        self
    }

    pub fn with_api_group(mut self, group_version: &str) -> Self {
        self.groups.insert(group_version.to_string());
        self
    }

    pub fn unreachable_api_server(mut self) -> Self {
        self.version = None;
        self
    }

    /// Every request made so far, e.g. `get external-secrets.io/v1/clustersecretstores`.
    ///
    /// Unserved custom kinds fail with `NotFound` naming the same group/version key.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn log(&self, entry: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(entry);
        }
    }

    fn check_served(&self, kind: &ResourceKind, name: &str) -> Result<(), AccessError> {
        if let Some(err) = self.failures.get(kind) {
            return Err(err.clone());
        }
        match kind {
            ResourceKind::Custom(_) if !self.served.contains(kind) => {
                Err(AccessError::not_found(kind_key(kind), name))
            }
            _ => Ok(()),
        }
    }

    fn in_scope<'a>(
        &'a self,
        query: &'a ResourceQuery,
    ) -> impl Iterator<Item = &'a ResourceRecord> + 'a {
        self.objects
            .get(&query.kind)
            .into_iter()
            .flatten()
            .filter(move |record| match &query.scope {
                Scope::Namespace(ns) => record.namespace() == Some(ns.as_str()),
                Scope::AllNamespaces | Scope::Cluster => true,
            })
    }
}

#[async_trait]
impl ResourceAccessor for FakeCluster {
    async fn list(&self, query: &ResourceQuery) -> Result<Vec<ResourceRecord>, AccessError> {
        self.log(format!("list {}", kind_key(&query.kind)));
        query.validate()?;
        self.check_served(&query.kind, "*")?;

        Ok(self
            .in_scope(query)
            .filter(|record| query.selector.matches(record.labels()))
            .cloned()
            .collect())
    }

    async fn get(&self, query: &ResourceQuery, name: &str) -> Result<ResourceRecord, AccessError> {
        self.log(format!("get {}", kind_key(&query.kind)));
        query.validate()?;
        if matches!(query.scope, Scope::AllNamespaces) && query.kind.is_namespaced() {
            return Err(AccessError::InvalidQuery("get needs a namespace".into()));
        }
        self.check_served(&query.kind, name)?;

        self.in_scope(query)
            .find(|record| record.name() == name)
            .cloned()
            .ok_or_else(|| AccessError::not_found(query.kind.to_string(), name))
    }

    async fn server_version(&self) -> Result<String, AccessError> {
        self.log("version".to_string());
        self.version
            .clone()
            .ok_or_else(|| AccessError::Transport("connection refused".into()))
    }

    async fn api_group_version(&self, group_version: &str) -> Result<(), AccessError> {
        self.log(format!("discover {group_version}"));
        if self.groups.contains(group_version) {
            Ok(())
        } else {
            Err(AccessError::not_found("APIGroup", group_version))
        }
    }
}

// =============================================================================
// Fake prober
// =============================================================================

/// Answers from a fixed table; unknown hosts are unreachable.
#[derive(Default)]
pub struct FakeProbe {
    answers: HashMap<String, u16>,
    probed: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(mut self, host: &str, status: u16) -> Self {
        self.answers.insert(host.to_string(), status);
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn probe(&self, hostname: &str) -> Reachability {
        if let Ok(mut probed) = self.probed.lock() {
            probed.push(hostname.to_string());
        }
        match self.answers.get(hostname) {
            Some(status) => Reachability::Reachable(*status),
            None => Reachability::Unreachable("no such host".to_string()),
        }
    }
}

// =============================================================================
// Object builders
// =============================================================================

pub fn namespace(name: &str) -> Value {
    json!({"metadata": {"name": name}})
}

pub fn node(name: &str, ready: bool) -> Value {
    let status = if ready { "True" } else { "False" };
    json!({
        "metadata": {"name": name},
        "status": {"conditions": [{"type": "Ready", "status": status}]}
    })
}

pub fn pod(namespace: &str, name: &str, labels: &[(&str, &str)], phase: &str) -> Value {
    let labels: HashMap<_, _> = labels.iter().copied().collect();
    json!({
        "metadata": {"name": name, "namespace": namespace, "labels": labels},
        "status": {"phase": phase}
    })
}

pub fn deployment(namespace: &str, name: &str, replicas: i64, ready: i64) -> Value {
    json!({
        "metadata": {"name": name, "namespace": namespace},
        "spec": {"replicas": replicas},
        "status": {"readyReplicas": ready}
    })
}

pub fn secret(namespace: &str, name: &str, data: &[(&str, &str)]) -> Value {
    let data: HashMap<_, _> = data
        .iter()
        .map(|(k, v)| (*k, base64::engine::general_purpose::STANDARD.encode(v)))
        .collect();
    json!({"metadata": {"name": name, "namespace": namespace}, "data": data})
}

pub fn config_map(namespace: &str, name: &str, data: &[(&str, &str)]) -> Value {
    let data: HashMap<_, _> = data.iter().copied().collect();
    json!({"metadata": {"name": name, "namespace": namespace}, "data": data})
}

pub fn service_account(namespace: &str, name: &str, annotations: &[(&str, &str)]) -> Value {
    let annotations: HashMap<_, _> = annotations.iter().copied().collect();
    json!({"metadata": {"name": name, "namespace": namespace, "annotations": annotations}})
}

pub fn ingress(namespace: &str, name: &str, host: Option<&str>) -> Value {
    let rules = host.map_or_else(|| json!([]), |h| json!([{"host": h}]));
    json!({"metadata": {"name": name, "namespace": namespace}, "spec": {"rules": rules}})
}

pub fn crd(name: &str) -> Value {
    json!({"metadata": {"name": name}})
}

pub fn custom(namespace: Option<&str>, name: &str, status: Value) -> Value {
    let mut metadata = json!({"name": name});
    if let Some(ns) = namespace {
        metadata["namespace"] = json!(ns);
    }
    json!({"metadata": metadata, "status": status})
}

pub fn crd_kind() -> ResourceKind {
    ResourceKind::Custom(CustomKind::crd())
}
