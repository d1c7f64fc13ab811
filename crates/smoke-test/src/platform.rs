//! The audited platform: namespaces, selectors, CRDs and secrets, as check groups.
//!
//! Groups run in the order returned by [`groups`].

use crate::check::config::{
    ConfigMapContains, SecretExists, SecretNameMatch, SecretRef, SecretsMatch, ServiceAccountIrsa,
    SsoRbacMode, SsoSecretConfigured,
};
use crate::check::custom::{
    ApiGroupAvailable, CrdExists, CustomResourceInventory, CustomResourcePhases,
    CustomResourcePresent, ExternalSecretsSynced, HealthRule,
};
use crate::check::ingress::IngressReachable;
use crate::check::workloads::{
    ClusterConnectivity, DeploymentReady, DeploymentsReady, NamespaceExists, NodesReady,
    PodsRunning, PrimaryDeploymentReady, StatefulSetReady,
};
use crate::check::CheckGroup;
use crate::error::Criticality;
use crate::resource::{CustomKind, Scope};

/// Candidate versions for external-secrets.io kinds, most stable first.
pub const EXTERNAL_SECRETS_VERSIONS: &[&str] = &["v1", "v1beta1"];

const ARGO_GROUP: &str = "argoproj.io";
const ARGO_VERSION: &str = "v1alpha1";
const SSO_SECRET: &str = "argo-workflows-sso";
const SSO_SECRET_FIELD: &str = "client-secret";

/// CRDs that must be registered, with display names.
pub const REQUIRED_CRDS: &[(&str, &str)] = &[
    ("applications.argoproj.io", "ArgoCD Applications"),
    ("workflows.argoproj.io", "Argo Workflows"),
    ("eventsources.argoproj.io", "Argo Events EventSources"),
    ("sensors.argoproj.io", "Argo Events Sensors"),
    ("eventbus.argoproj.io", "Argo Events EventBus"),
    ("rollouts.argoproj.io", "Argo Rollouts"),
    ("analysistemplates.argoproj.io", "Argo Rollouts AnalysisTemplates"),
    ("externalsecrets.external-secrets.io", "External Secrets"),
    ("certificates.cert-manager.io", "Cert Manager"),
    ("clusterpolicies.kyverno.io", "Kyverno Policies"),
];

/// Controllers expected in their own namespaces: (namespace, selector, display).
pub const PLATFORM_CONTROLLERS: &[(&str, &str, &str)] = &[
    ("argocd", "app.kubernetes.io/name=argocd-server", "ArgoCD Server"),
    ("argo", "app.kubernetes.io/name=argo-workflows-server", "Argo Workflows Server"),
    (
        "argo-events",
        "app.kubernetes.io/name=argo-events-controller-manager",
        "Argo Events Controller",
    ),
    ("argo-rollouts", "app.kubernetes.io/name=argo-rollouts", "Argo Rollouts Controller"),
    ("external-secrets", "app.kubernetes.io/name=external-secrets", "External Secrets"),
    ("cert-manager", "app.kubernetes.io/name=cert-manager", "Cert Manager"),
    ("kyverno", "app.kubernetes.io/part-of=kyverno", "Kyverno"),
    (
        "aws-load-balancer",
        "app.kubernetes.io/name=aws-load-balancer-controller",
        "AWS LB Controller",
    ),
    ("external-dns", "app.kubernetes.io/name=external-dns", "External DNS"),
    ("reloader", "app.kubernetes.io/name=reloader", "Reloader"),
];

fn argo_kind(resource: &str, kind: &str) -> CustomKind {
    CustomKind::namespaced(ARGO_GROUP, ARGO_VERSION, resource, kind)
}

/// Every check group, in run order.
pub fn groups() -> Vec<CheckGroup> {
    vec![
        cluster(),
        helm_releases(),
        security(),
        backstage(),
        argocd(),
        argo_workflows(),
        argo_events(),
        argo_rollouts(),
        observability(),
    ]
}

fn cluster() -> CheckGroup {
    CheckGroup::new("EKS CLUSTER HEALTH")
        .section("Cluster Connectivity")
        .check(ClusterConnectivity)
        .section("Node Health")
        .check(NodesReady)
        .section("System Pods")
        .check(PodsRunning::new("kube-system", "k8s-app=kube-dns", "CoreDNS"))
        .check(PodsRunning::new("kube-system", "k8s-app=kube-proxy", "kube-proxy"))
        .section("Karpenter")
        .check(PodsRunning::new(
            "kube-system",
            "app.kubernetes.io/name=karpenter",
            "Karpenter controller",
        ))
        .check(CrdExists::new("nodepools.karpenter.sh", "NodePool CRD"))
        .check(CrdExists::new("ec2nodeclasses.karpenter.k8s.aws", "EC2NodeClass CRD"))
}

fn helm_releases() -> CheckGroup {
    let mut group = CheckGroup::new("HELM RELEASES & CRDs").section("CRDs Installed");
    for (name, display) in REQUIRED_CRDS {
        group = group.check(CrdExists::new(name, display));
    }

    group = group.section("Namespace Deployments");
    for (namespace, selector, display) in PLATFORM_CONTROLLERS {
        group = group.check(PodsRunning::new(namespace, selector, display));
    }
    group
}

fn security() -> CheckGroup {
    let secret_store = CustomKind::cluster(
        "external-secrets.io",
        "v1",
        "clustersecretstores",
        "ClusterSecretStore",
    );
    let cluster_policy =
        CustomKind::cluster("kyverno.io", "v1", "clusterpolicies", "ClusterPolicy");

    CheckGroup::new("SECURITY CONFIGURATION")
        .section("Secrets Management")
        .check(CustomResourcePresent::new(
            secret_store,
            Scope::Cluster,
            "aws-secrets-manager",
            EXTERNAL_SECRETS_VERSIONS,
            "ClusterSecretStore 'aws-secrets-manager'",
        ))
        .check(ExternalSecretsSynced::new(EXTERNAL_SECRETS_VERSIONS))
        .section("Kyverno Policies")
        .check(CustomResourceInventory::new(
            cluster_policy,
            Scope::Cluster,
            "Kyverno policies",
        ))
        .section("TLS/Certificates")
        .check(PodsRunning::new(
            "cert-manager",
            "app.kubernetes.io/name=cert-manager",
            "Cert Manager",
        ))
}

fn backstage() -> CheckGroup {
    CheckGroup::new("BACKSTAGE")
        .section("Deployment Status")
        .check(NamespaceExists::new("backstage"))
        .check(PrimaryDeploymentReady::new("backstage", "Backstage"))
        .section("Database")
        .check(SecretNameMatch::new(
            "backstage",
            &["db", "database", "postgres"],
            "Database credentials secret",
        ))
        .section("Ingress & Connectivity")
        .check(IngressReachable::new("backstage", "Backstage"))
}

fn argocd() -> CheckGroup {
    let mut group = CheckGroup::new("ARGOCD")
        .section("Deployment Status")
        .check(NamespaceExists::new("argocd"));
    for name in [
        "argocd-server",
        "argocd-repo-server",
        "argocd-dex-server",
        "argocd-redis",
    ] {
        group = group.check(DeploymentReady::new("argocd", name));
    }

    group
        .check(StatefulSetReady::new("argocd", "argocd-application-controller"))
        .section("SSO Configuration")
        .check(
            ConfigMapContains::new("argocd", "argocd-cm", "dex.config", "github")
                .labelled("GitHub SSO configured in Dex", "GitHub SSO not configured"),
        )
        .check(SsoSecretConfigured::new(
            "argocd",
            "app.kubernetes.io/name=argocd-dex-server",
            SSO_SECRET,
            SSO_SECRET_FIELD,
        ))
        .section("Ingress & Health")
        .check(IngressReachable::new("argocd", "ArgoCD"))
        .section("Applications")
        .check(
            CustomResourceInventory::new(
                argo_kind("applications", "Application"),
                Scope::namespace("argocd"),
                "Applications",
            )
            .with_health(HealthRule::field_equals(
                &["status", "health", "status"],
                "Healthy",
                "healthy",
            )),
        )
}

fn argo_workflows() -> CheckGroup {
    let controller_config = "argo-workflows-workflow-controller-configmap";

    CheckGroup::new("ARGO WORKFLOWS")
        .section("Deployment Status")
        .check(NamespaceExists::new("argo"))
        .check(DeploymentReady::new("argo", "argo-workflows-server"))
        .check(DeploymentReady::new("argo", "argo-workflows-workflow-controller"))
        .section("SSO Configuration")
        .check(
            ConfigMapContains::new("argo", controller_config, "config", "issuer")
                .labelled("SSO configured", "SSO not configured"),
        )
        .check(SsoRbacMode::new("argo", controller_config, "config"))
        .check(SecretsMatch::new(
            SSO_SECRET_FIELD,
            SecretRef::new("argo", SSO_SECRET),
            SecretRef::new("argocd", SSO_SECRET),
            "SSO secrets",
        ))
        .section("Database")
        .check(SecretExists::new(
            "argo",
            "argo-workflows-db-credentials",
            "Database credentials secret",
        ))
        .section("Ingress & Connectivity")
        .check(IngressReachable::new("argo", "Argo Workflows"))
}

fn argo_events() -> CheckGroup {
    CheckGroup::new("ARGO EVENTS")
        .section("Deployment Status")
        .check(NamespaceExists::new("argo-events"))
        .check(DeploymentsReady::new("argo-events"))
        .section("Event Bus")
        .check(CustomResourcePhases::new(
            argo_kind("eventbus", "EventBus"),
            Scope::namespace("argo-events"),
            "EventBus",
            "Running",
        ))
        .section("Event Sources")
        .check(
            CustomResourceInventory::new(
                argo_kind("eventsources", "EventSource"),
                Scope::AllNamespaces,
                "EventSources",
            )
            .with_health(HealthRule::field_present(&["status"], "with status")),
        )
        .section("Sensors")
        .check(
            CustomResourceInventory::new(
                argo_kind("sensors", "Sensor"),
                Scope::AllNamespaces,
                "Sensors",
            )
            .with_health(HealthRule::field_present(&["status"], "with status")),
        )
        .section("Service Account")
        .check(ServiceAccountIrsa::new(
            "argo-events",
            "argo-events-controller",
            "Controller service account",
            Criticality::Critical,
        ))
}

fn argo_rollouts() -> CheckGroup {
    let mut group = CheckGroup::new("ARGO ROLLOUTS")
        .section("Deployment Status")
        .check(NamespaceExists::new("argo-rollouts"))
        .check(DeploymentsReady::new("argo-rollouts"))
        .section("Rollouts")
        .check(
            CustomResourceInventory::new(
                argo_kind("rollouts", "Rollout"),
                Scope::AllNamespaces,
                "Rollouts",
            )
            .with_health(HealthRule::field_equals(
                &["status", "phase"],
                "Healthy",
                "healthy",
            )),
        )
        .section("Analysis Templates")
        .check(CustomResourceInventory::new(
            argo_kind("analysistemplates", "AnalysisTemplate"),
            Scope::AllNamespaces,
            "AnalysisTemplates",
        ))
        .section("Service Accounts");

    for name in ["argo-rollouts-controller", "argo-rollouts-dashboard"] {
        group = group.check(ServiceAccountIrsa::new(
            "argo-rollouts",
            name,
            name,
            Criticality::Advisory,
        ));
    }

    group
        .section("Ingress & Connectivity")
        .check(IngressReachable::new("argo-rollouts", "Argo Rollouts Dashboard"))
}

fn observability() -> CheckGroup {
    let mut group = CheckGroup::new("OBSERVABILITY").section("Grafana k8s-monitoring Stack");
    for (selector, display) in [
        ("app.kubernetes.io/name=alloy-logs", "Alloy Logs"),
        ("app.kubernetes.io/name=alloy-metrics", "Alloy Metrics"),
        ("app.kubernetes.io/name=alloy-singleton", "Alloy Singleton"),
        ("app.kubernetes.io/name=beyla", "Beyla (eBPF)"),
    ] {
        group = group.check(PodsRunning::optional("monitoring", selector, display));
    }

    group
        .section("Metrics Server")
        .check(PodsRunning::new(
            "kube-system",
            "app.kubernetes.io/name=metrics-server",
            "Metrics Server",
        ))
        .check(ApiGroupAvailable::new("metrics.k8s.io/v1beta1", "Metrics API"))
}
