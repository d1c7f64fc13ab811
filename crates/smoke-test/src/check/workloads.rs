//! Cluster and workload health checks.

use async_trait::async_trait;
use tracing::warn;

use super::{Check, CheckContext, CheckOutcome};
use crate::error::{AccessError, CheckError, Criticality};
use crate::resource::{ResourceKind, ResourceQuery, ResourceRecord};

/// `name: ready/desired ready`, passing only when every replica is ready.
fn replica_outcome(label: &str, record: &ResourceRecord, require_replicas: bool) -> CheckOutcome {
    let ready = record.ready_replicas();
    let desired = record.desired_replicas();
    let text = format!("{label}: {ready}/{desired} ready");

    if ready == desired && (!require_replicas || desired > 0) {
        CheckOutcome::pass(text)
    } else {
        CheckOutcome::fail(text)
    }
}

fn running_pods(pods: &[ResourceRecord]) -> usize {
    pods.iter().filter(|p| p.phase() == Some("Running")).count()
}

/// The API server answers discovery requests.
#[derive(Debug, Clone, Default)]
pub struct ClusterConnectivity;

#[async_trait]
impl Check for ClusterConnectivity {
    fn name(&self) -> String {
        "cluster-connectivity".to_string()
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        match ctx.accessor.server_version().await {
            Ok(version) => vec![CheckOutcome::pass("Cluster connectivity").with_detail(version)],
            Err(err) => vec![CheckOutcome::from_error(
                "Cluster connectivity",
                &err.into(),
                Criticality::Critical,
            )],
        }
    }
}

/// Count nodes by their `Ready` condition.
///
/// Passes with the ready count; adds a warning when any node is not ready.
#[derive(Debug, Clone, Default)]
pub struct NodesReady;

#[async_trait]
impl Check for NodesReady {
    fn name(&self) -> String {
        "nodes-ready".to_string()
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let nodes = match ctx.accessor.list(&ResourceQuery::cluster(ResourceKind::Node)).await {
            Ok(nodes) => nodes,
            Err(err) => {
                return vec![CheckOutcome::from_error(
                    "List nodes",
                    &err.into(),
                    Criticality::Critical,
                )]
            }
        };

        let mut ready = 0;
        let mut not_ready = 0;
        for node in &nodes {
            match node.condition_status("Ready") {
                Some("True") => ready += 1,
                Some(_) => not_ready += 1,
                None => {}
            }
        }

        let mut outcomes = vec![CheckOutcome::pass(format!("Nodes ready: {ready}"))];
        if not_ready > 0 {
            outcomes.push(CheckOutcome::warn(format!("Nodes not ready: {not_ready}")));
        }
        outcomes
    }
}

/// At least one pod matching a selector is in phase `Running`.
///
/// Critical variant: no running pods is a failure. Advisory variant (optional
/// components): absence and idleness only warn.
#[derive(Debug, Clone)]
pub struct PodsRunning {
    pub namespace: String,
    pub selector: String,
    pub display: String,
    pub criticality: Criticality,
}

impl PodsRunning {
    pub fn new(namespace: &str, selector: &str, display: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
            display: display.to_string(),
            criticality: Criticality::Critical,
        }
    }

    pub fn optional(namespace: &str, selector: &str, display: &str) -> Self {
        Self {
            criticality: Criticality::Advisory,
            ..Self::new(namespace, selector, display)
        }
    }

    async fn list(&self, ctx: &CheckContext<'_>) -> Result<Vec<ResourceRecord>, AccessError> {
        let query = ResourceQuery::namespaced(ResourceKind::Pod, &self.namespace)
            .with_labels(&self.selector)?;
        ctx.accessor.list(&query).await
    }
}

#[async_trait]
impl Check for PodsRunning {
    fn name(&self) -> String {
        format!("pods-running/{}/{}", self.namespace, self.selector)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let name = &self.display;
        let outcome = match (self.list(ctx).await, self.criticality) {
            (Err(err), Criticality::Critical) => {
                CheckOutcome::fail(format!("{name} (error listing)")).with_detail(err.to_string())
            }
            (Err(err), Criticality::Advisory) => {
                warn!(check = %self.name(), error = %err, "Optional component lookup failed");
                CheckOutcome::warn(format!("{name}: not found")).with_detail(err.to_string())
            }
            (Ok(pods), Criticality::Advisory) if pods.is_empty() => {
                CheckOutcome::warn(format!("{name}: not found"))
            }
            (Ok(pods), criticality) => match running_pods(&pods) {
                0 if criticality == Criticality::Critical => {
                    CheckOutcome::fail(format!("{name}: no pods running"))
                }
                0 => CheckOutcome::warn(format!("{name}: none running")),
                running => CheckOutcome::pass(format!("{name}: {running} running")),
            },
        };
        vec![outcome]
    }
}

/// A named deployment has all desired replicas ready.
#[derive(Debug, Clone)]
pub struct DeploymentReady {
    pub namespace: String,
    pub name: String,
}

impl DeploymentReady {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Check for DeploymentReady {
    fn name(&self) -> String {
        format!("deployment-ready/{}/{}", self.namespace, self.name)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::namespaced(ResourceKind::Deployment, &self.namespace);
        match ctx.accessor.get(&query, &self.name).await {
            Ok(deployment) => vec![replica_outcome(&self.name, &deployment, false)],
            Err(err) => vec![CheckOutcome::from_error(
                format!("{} deployment", self.name),
                &err.into(),
                Criticality::Critical,
            )],
        }
    }
}

/// Every deployment in a namespace is fully ready; one outcome per deployment.
#[derive(Debug, Clone)]
pub struct DeploymentsReady {
    pub namespace: String,
}

impl DeploymentsReady {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl Check for DeploymentsReady {
    fn name(&self) -> String {
        format!("deployments-ready/{}", self.namespace)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::namespaced(ResourceKind::Deployment, &self.namespace);
        match ctx.accessor.list(&query).await {
            Ok(deployments) if deployments.is_empty() => vec![CheckOutcome::warn(format!(
                "No deployments found in '{}'",
                self.namespace
            ))],
            Ok(deployments) => deployments
                .iter()
                .map(|d| replica_outcome(d.name(), d, false))
                .collect(),
            Err(err) => vec![CheckOutcome::from_error(
                format!("Deployments in '{}'", self.namespace),
                &err.into(),
                Criticality::Critical,
            )],
        }
    }
}

/// The first deployment in a namespace is ready with at least one replica.
///
/// For charts whose deployment name carries a release prefix.
#[derive(Debug, Clone)]
pub struct PrimaryDeploymentReady {
    pub namespace: String,
    pub display: String,
}

impl PrimaryDeploymentReady {
    pub fn new(namespace: &str, display: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            display: display.to_string(),
        }
    }
}

#[async_trait]
impl Check for PrimaryDeploymentReady {
    fn name(&self) -> String {
        format!("primary-deployment-ready/{}", self.namespace)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::namespaced(ResourceKind::Deployment, &self.namespace);
        let not_found = format!("{} deployment not found", self.display);

        match ctx.accessor.list(&query).await {
            Ok(deployments) => match deployments.first() {
                Some(deployment) => {
                    let label = format!("{} ({})", self.display, deployment.name());
                    vec![replica_outcome(&label, deployment, true)]
                }
                None => vec![CheckOutcome::fail(not_found)],
            },
            Err(err) => vec![CheckOutcome::fail(not_found).with_detail(err.to_string())],
        }
    }
}

/// A named statefulset has all desired replicas ready.
#[derive(Debug, Clone)]
pub struct StatefulSetReady {
    pub namespace: String,
    pub name: String,
}

impl StatefulSetReady {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Check for StatefulSetReady {
    fn name(&self) -> String {
        format!("statefulset-ready/{}/{}", self.namespace, self.name)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::namespaced(ResourceKind::StatefulSet, &self.namespace);
        match ctx.accessor.get(&query, &self.name).await {
            Ok(statefulset) => vec![replica_outcome(&self.name, &statefulset, false)],
            Err(err) => vec![CheckOutcome::from_error(
                format!("{} statefulset", self.name),
                &err.into(),
                Criticality::Critical,
            )],
        }
    }
}

/// A namespace exists.
#[derive(Debug, Clone)]
pub struct NamespaceExists {
    pub name: String,
}

impl NamespaceExists {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Check for NamespaceExists {
    fn name(&self) -> String {
        format!("namespace-exists/{}", self.name)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let label = format!("Namespace '{}' exists", self.name);
        let query = ResourceQuery::cluster(ResourceKind::Namespace);

        match ctx.accessor.get(&query, &self.name).await {
            Ok(_) => vec![CheckOutcome::pass(label)],
            Err(err) => {
                let err = CheckError::from(err);
                vec![CheckOutcome::from_error(label, &err, Criticality::Critical)]
            }
        }
    }
}
