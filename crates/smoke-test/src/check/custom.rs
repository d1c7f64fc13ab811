//! Checks over custom resources and API discovery.

use async_trait::async_trait;

use super::{Check, CheckContext, CheckOutcome};
use crate::error::Criticality;
use crate::resolver::VersionResolver;
use crate::resource::{
    CustomKind, LabelSelector, Lookup, ResourceKind, ResourceQuery, ResourceRecord, Scope,
};

/// A CustomResourceDefinition is registered.
#[derive(Debug, Clone)]
pub struct CrdExists {
    pub name: String,
    pub display: String,
}

impl CrdExists {
    pub fn new(name: &str, display: &str) -> Self {
        Self {
            name: name.to_string(),
            display: display.to_string(),
        }
    }
}

#[async_trait]
impl Check for CrdExists {
    fn name(&self) -> String {
        format!("crd-exists/{}", self.name)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::cluster(ResourceKind::Custom(CustomKind::crd()));
        match ctx.accessor.get(&query, &self.name).await {
            Ok(_) => vec![CheckOutcome::pass(&self.display)],
            Err(err) => vec![CheckOutcome::from_error(
                &self.display,
                &err.into(),
                Criticality::Critical,
            )],
        }
    }
}

/// A named custom resource exists under any of the candidate API versions.
#[derive(Debug, Clone)]
pub struct CustomResourcePresent {
    pub kind: CustomKind,
    pub scope: Scope,
    pub name: String,
    pub versions: Vec<String>,
    pub display: String,
}

impl CustomResourcePresent {
    /// `kind.version` is ignored; `versions` are tried in order.
    pub fn new(
        kind: CustomKind,
        scope: Scope,
        name: &str,
        versions: &[&str],
        display: &str,
    ) -> Self {
        Self {
            kind,
            scope,
            name: name.to_string(),
            versions: versions.iter().map(ToString::to_string).collect(),
            display: display.to_string(),
        }
    }
}

#[async_trait]
impl Check for CustomResourcePresent {
    fn name(&self) -> String {
        format!("custom-resource-present/{}/{}", self.kind.resource, self.name)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery {
            kind: ResourceKind::Custom(self.kind.clone()),
            scope: self.scope.clone(),
            selector: LabelSelector::everything(),
        };
        let versions: Vec<&str> = self.versions.iter().map(String::as_str).collect();

        match VersionResolver::new(ctx.accessor)
            .get(&query, &self.name, &versions)
            .await
        {
            Ok(resolved) => vec![CheckOutcome::pass(&self.display)
                .with_detail(format!("served at {}", resolved.version))],
            Err(err) => vec![CheckOutcome::from_error(
                &self.display,
                &err.into(),
                Criticality::Critical,
            )],
        }
    }
}

/// How an inventory decides which items count as healthy.
#[derive(Debug, Clone)]
pub enum HealthRule {
    /// String field at `path` equals `expected`.
    FieldEquals {
        path: Vec<String>,
        expected: String,
        noun: String,
    },
    /// Object field at `path` is present.
    FieldPresent { path: Vec<String>, noun: String },
}

impl HealthRule {
    pub fn field_equals(path: &[&str], expected: &str, noun: &str) -> Self {
        Self::FieldEquals {
            path: path.iter().map(ToString::to_string).collect(),
            expected: expected.to_string(),
            noun: noun.to_string(),
        }
    }

    pub fn field_present(path: &[&str], noun: &str) -> Self {
        Self::FieldPresent {
            path: path.iter().map(ToString::to_string).collect(),
            noun: noun.to_string(),
        }
    }

    fn noun(&self) -> &str {
        match self {
            Self::FieldEquals { noun, .. } | Self::FieldPresent { noun, .. } => noun,
        }
    }

    fn is_healthy(&self, record: &ResourceRecord) -> bool {
        match self {
            Self::FieldEquals { path, expected, .. } => {
                let path: Vec<&str> = path.iter().map(String::as_str).collect();
                record.str_at(&path) == Lookup::Found(expected.as_str())
            }
            Self::FieldPresent { path, .. } => {
                let path: Vec<&str> = path.iter().map(String::as_str).collect();
                matches!(record.map_at(&path), Lookup::Found(_))
            }
        }
    }
}

/// Count custom resources of a kind, optionally with a health breakdown.
///
/// An empty inventory still passes: these kinds are allowed to have no
/// instances yet. Any lookup error, including an unregistered kind, only
/// warns unless the inventory is marked critical.
#[derive(Debug, Clone)]
pub struct CustomResourceInventory {
    pub kind: CustomKind,
    pub scope: Scope,
    pub versions: Vec<String>,
    pub display: String,
    pub health: Option<HealthRule>,
    pub criticality: Criticality,
}

impl CustomResourceInventory {
    pub fn new(kind: CustomKind, scope: Scope, display: &str) -> Self {
        let versions = vec![kind.version.clone()];
        Self {
            kind,
            scope,
            versions,
            display: display.to_string(),
            health: None,
            criticality: Criticality::Advisory,
        }
    }

    #[must_use]
    pub fn with_versions(mut self, versions: &[&str]) -> Self {
        self.versions = versions.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn with_health(mut self, rule: HealthRule) -> Self {
        self.health = Some(rule);
        self
    }

    #[must_use]
    pub fn critical(mut self) -> Self {
        self.criticality = Criticality::Critical;
        self
    }
}

#[async_trait]
impl Check for CustomResourceInventory {
    fn name(&self) -> String {
        format!("custom-resource-inventory/{}.{}", self.kind.resource, self.kind.group)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery {
            kind: ResourceKind::Custom(self.kind.clone()),
            scope: self.scope.clone(),
            selector: LabelSelector::everything(),
        };
        let versions: Vec<&str> = self.versions.iter().map(String::as_str).collect();

        let items = match VersionResolver::new(ctx.accessor).list(&query, &versions).await {
            Ok(resolved) => resolved.value,
            Err(err) => {
                let label = format!("Could not list {}", self.display);
                let outcome = match self.criticality {
                    Criticality::Critical => {
                        CheckOutcome::from_error(label, &err.into(), Criticality::Critical)
                    }
                    Criticality::Advisory => CheckOutcome::warn(label).with_detail(err.to_string()),
                };
                return vec![outcome];
            }
        };

        let label = match &self.health {
            Some(rule) => {
                let healthy = items.iter().filter(|i| rule.is_healthy(i)).count();
                format!(
                    "{}: {} total, {} {}",
                    self.display,
                    items.len(),
                    healthy,
                    rule.noun()
                )
            }
            None => format!("{}: {}", self.display, items.len()),
        };
        vec![CheckOutcome::pass(label)]
    }
}

/// Share of ExternalSecrets whose `Ready` condition is `True`.
///
/// All synced passes; partial sync or an empty list warns.
#[derive(Debug, Clone)]
pub struct ExternalSecretsSynced {
    pub versions: Vec<String>,
}

impl ExternalSecretsSynced {
    pub fn new(versions: &[&str]) -> Self {
        Self {
            versions: versions.iter().map(ToString::to_string).collect(),
        }
    }
}

#[async_trait]
impl Check for ExternalSecretsSynced {
    fn name(&self) -> String {
        "external-secrets-synced".to_string()
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let kind = CustomKind::namespaced(
            "external-secrets.io",
            "v1",
            "externalsecrets",
            "ExternalSecret",
        );
        let query = ResourceQuery::all_namespaces(ResourceKind::Custom(kind));
        let versions: Vec<&str> = self.versions.iter().map(String::as_str).collect();

        let secrets = match VersionResolver::new(ctx.accessor).list(&query, &versions).await {
            Ok(resolved) => resolved.value,
            Err(err) => {
                return vec![CheckOutcome::warn("Could not list ExternalSecrets")
                    .with_detail(err.to_string())]
            }
        };

        let total = secrets.len();
        let synced = secrets
            .iter()
            .filter(|s| s.condition_status("Ready") == Some("True"))
            .count();
        let label = format!("ExternalSecrets synced: {synced}/{total}");

        let outcome = if total == 0 {
            CheckOutcome::warn("ExternalSecrets: none found")
        } else if synced == total {
            CheckOutcome::pass(label)
        } else {
            CheckOutcome::warn(label)
        };
        vec![outcome]
    }
}

/// Every custom resource of a kind reports the expected `status.phase`.
///
/// One outcome per item; phase mismatches and an empty list warn.
#[derive(Debug, Clone)]
pub struct CustomResourcePhases {
    pub kind: CustomKind,
    pub scope: Scope,
    pub display: String,
    pub expected: String,
}

impl CustomResourcePhases {
    pub fn new(kind: CustomKind, scope: Scope, display: &str, expected: &str) -> Self {
        Self {
            kind,
            scope,
            display: display.to_string(),
            expected: expected.to_string(),
        }
    }
}

#[async_trait]
impl Check for CustomResourcePhases {
    fn name(&self) -> String {
        format!("custom-resource-phases/{}.{}", self.kind.resource, self.kind.group)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery {
            kind: ResourceKind::Custom(self.kind.clone()),
            scope: self.scope.clone(),
            selector: LabelSelector::everything(),
        };
        let none_found = format!("No {} resources found", self.display);

        match ctx.accessor.list(&query).await {
            Ok(items) if items.is_empty() => vec![CheckOutcome::warn(none_found)],
            Ok(items) => items
                .iter()
                .map(|item| {
                    let phase = item.phase().unwrap_or_default();
                    let label = format!("{} '{}': {}", self.display, item.name(), phase);
                    if phase == self.expected {
                        CheckOutcome::pass(label)
                    } else {
                        CheckOutcome::warn(label)
                    }
                })
                .collect(),
            Err(err) => vec![CheckOutcome::warn(none_found).with_detail(err.to_string())],
        }
    }
}

/// An aggregated API group-version is served (e.g. the metrics API).
#[derive(Debug, Clone)]
pub struct ApiGroupAvailable {
    pub group_version: String,
    pub display: String,
}

impl ApiGroupAvailable {
    pub fn new(group_version: &str, display: &str) -> Self {
        Self {
            group_version: group_version.to_string(),
            display: display.to_string(),
        }
    }
}

#[async_trait]
impl Check for ApiGroupAvailable {
    fn name(&self) -> String {
        format!("api-group-available/{}", self.group_version)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        match ctx.accessor.api_group_version(&self.group_version).await {
            Ok(()) => vec![CheckOutcome::pass(format!("{} available", self.display))],
            Err(err) => vec![CheckOutcome::warn(format!("{} not available", self.display))
                .with_detail(err.to_string())],
        }
    }
}
