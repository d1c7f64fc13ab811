//! Configuration and security posture checks: config maps, secrets,
//! service account annotations.

use async_trait::async_trait;

use super::{Check, CheckContext, CheckOutcome};
use crate::error::{AccessError, CheckError, Criticality};
use crate::resource::{Lookup, ResourceKind, ResourceQuery, ResourceRecord};

/// Annotation that binds a service account to a cloud IAM role.
pub const IRSA_ANNOTATION: &str = "eks.amazonaws.com/role-arn";

async fn get_secret(
    ctx: &CheckContext<'_>,
    namespace: &str,
    name: &str,
) -> Result<ResourceRecord, AccessError> {
    let query = ResourceQuery::namespaced(ResourceKind::Secret, namespace);
    ctx.accessor.get(&query, name).await
}

/// A config map entry contains a marker string.
///
/// Missing config map or key and a missing marker all warn.
#[derive(Debug, Clone)]
pub struct ConfigMapContains {
    pub namespace: String,
    pub config_map: String,
    pub key: String,
    pub needle: String,
    pub present: String,
    pub missing: String,
}

impl ConfigMapContains {
    pub fn new(namespace: &str, config_map: &str, key: &str, needle: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            config_map: config_map.to_string(),
            key: key.to_string(),
            needle: needle.to_string(),
            present: format!("'{needle}' configured"),
            missing: format!("'{needle}' not configured"),
        }
    }

    /// Labels for the found and not-found cases.
    #[must_use]
    pub fn labelled(mut self, present: &str, missing: &str) -> Self {
        self.present = present.to_string();
        self.missing = missing.to_string();
        self
    }
}

#[async_trait]
impl Check for ConfigMapContains {
    fn name(&self) -> String {
        format!(
            "config-map-contains/{}/{}/{}",
            self.namespace, self.config_map, self.key
        )
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::namespaced(ResourceKind::ConfigMap, &self.namespace);
        let config_map = match ctx.accessor.get(&query, &self.config_map).await {
            Ok(config_map) => config_map,
            Err(err) => {
                return vec![CheckOutcome::warn(&self.missing).with_detail(err.to_string())]
            }
        };

        match config_map.config_value(&self.key) {
            Lookup::Found(value) if value.contains(&self.needle) => {
                vec![CheckOutcome::pass(&self.present)]
            }
            Lookup::Found(_) => vec![CheckOutcome::warn(&self.missing)],
            Lookup::WrongType | Lookup::Absent => vec![CheckOutcome::warn(&self.missing)
                .with_detail(format!("key '{}' not set in {}", self.key, self.config_map))],
        }
    }
}

/// RBAC mode of the Argo Workflows SSO configuration.
#[derive(Debug, Clone)]
pub struct SsoRbacMode {
    pub namespace: String,
    pub config_map: String,
    pub key: String,
}

impl SsoRbacMode {
    pub fn new(namespace: &str, config_map: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            config_map: config_map.to_string(),
            key: key.to_string(),
        }
    }
}

#[async_trait]
impl Check for SsoRbacMode {
    fn name(&self) -> String {
        format!("sso-rbac-mode/{}/{}", self.namespace, self.config_map)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::namespaced(ResourceKind::ConfigMap, &self.namespace);
        let config = match ctx.accessor.get(&query, &self.config_map).await {
            Ok(config_map) => config_map.config_value(&self.key).found().map(ToString::to_string),
            Err(err) => {
                return vec![CheckOutcome::warn("SSO RBAC: configuration not found")
                    .with_detail(err.to_string())]
            }
        };

        let outcome = match config {
            Some(config) if config.contains("rbac") => {
                if config.contains("enabled: false") {
                    CheckOutcome::pass("SSO RBAC: disabled (all authenticated users allowed)")
                } else {
                    CheckOutcome::pass("SSO RBAC: enabled")
                }
            }
            _ => CheckOutcome::warn("SSO RBAC: not configured"),
        };
        vec![outcome]
    }
}

/// Location of one side of a secret comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

impl SecretRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

/// Result of comparing one field across two secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretComparison {
    Equal,
    Differ,
    /// One side is missing the secret, or its field is absent or undecodable.
    Incomplete(String),
}

impl SecretComparison {
    /// Compare `field` across two already fetched secrets.
    pub fn compare(
        field: &str,
        left: Result<&ResourceRecord, &AccessError>,
        right: Result<&ResourceRecord, &AccessError>,
    ) -> Self {
        let (left, right) = match (left, right) {
            (Ok(left), Ok(right)) => (left, right),
            (Err(err), _) | (_, Err(err)) => return Self::Incomplete(err.to_string()),
        };

        match (left.secret_value(field), right.secret_value(field)) {
            (Lookup::Found(a), Lookup::Found(b)) if a == b => Self::Equal,
            (Lookup::Found(_), Lookup::Found(_)) => Self::Differ,
            (Lookup::Found(_), _) => Self::Incomplete(missing_field(field, right)),
            _ => Self::Incomplete(missing_field(field, left)),
        }
    }
}

fn missing_field(field: &str, record: &ResourceRecord) -> String {
    match record.namespace() {
        Some(ns) => format!("field '{field}' missing in {ns}/{}", record.name()),
        None => format!("field '{field}' missing in {}", record.name()),
    }
}

/// A secret field holds the same value in two namespaces.
///
/// Equal passes, divergence fails, an unreadable side warns.
#[derive(Debug, Clone)]
pub struct SecretsMatch {
    pub field: String,
    pub left: SecretRef,
    pub right: SecretRef,
    pub display: String,
}

impl SecretsMatch {
    pub fn new(field: &str, left: SecretRef, right: SecretRef, display: &str) -> Self {
        Self {
            field: field.to_string(),
            left,
            right,
            display: display.to_string(),
        }
    }
}

#[async_trait]
impl Check for SecretsMatch {
    fn name(&self) -> String {
        format!(
            "secrets-match/{}/{}<->{}/{}",
            self.left.namespace, self.left.name, self.right.namespace, self.right.name
        )
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let left = get_secret(ctx, &self.left.namespace, &self.left.name).await;
        let right = get_secret(ctx, &self.right.namespace, &self.right.name).await;
        let sides = format!("({} ↔ {})", self.left.namespace, self.right.namespace);

        let outcome = match SecretComparison::compare(&self.field, left.as_ref(), right.as_ref()) {
            SecretComparison::Equal => {
                CheckOutcome::pass(format!("{} match {sides}", self.display))
            }
            SecretComparison::Differ => {
                let err = CheckError::Mismatch {
                    what: format!("{}.{}", self.left.name, self.field),
                };
                CheckOutcome::from_error(
                    format!("{} MISMATCH {sides}", self.display),
                    &err,
                    Criticality::Critical,
                )
            }
            SecretComparison::Incomplete(reason) => {
                CheckOutcome::warn(format!("{} could not be compared {sides}", self.display))
                    .with_detail(reason)
            }
        };
        vec![outcome]
    }
}

/// A named secret exists.
#[derive(Debug, Clone)]
pub struct SecretExists {
    pub namespace: String,
    pub name: String,
    pub display: String,
    pub criticality: Criticality,
}

impl SecretExists {
    /// Absence warns; use [`SecretExists::critical`] to fail instead.
    pub fn new(namespace: &str, name: &str, display: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            display: display.to_string(),
            criticality: Criticality::Advisory,
        }
    }

    #[must_use]
    pub fn critical(mut self) -> Self {
        self.criticality = Criticality::Critical;
        self
    }
}

#[async_trait]
impl Check for SecretExists {
    fn name(&self) -> String {
        format!("secret-exists/{}/{}", self.namespace, self.name)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let outcome = match get_secret(ctx, &self.namespace, &self.name).await {
            Ok(_) => CheckOutcome::pass(format!("{} exists", self.display)),
            Err(err) => {
                let status = match self.criticality {
                    Criticality::Critical => super::Status::Fail,
                    Criticality::Advisory => super::Status::Warning,
                };
                CheckOutcome::new(status, format!("{} not found", self.display))
                    .with_detail(err.to_string())
            }
        };
        vec![outcome]
    }
}

/// Some secret in a namespace has a name containing one of the fragments.
///
/// Used where the secret name depends on the chart release.
#[derive(Debug, Clone)]
pub struct SecretNameMatch {
    pub namespace: String,
    pub fragments: Vec<String>,
    pub display: String,
}

impl SecretNameMatch {
    pub fn new(namespace: &str, fragments: &[&str], display: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            fragments: fragments.iter().map(ToString::to_string).collect(),
            display: display.to_string(),
        }
    }
}

#[async_trait]
impl Check for SecretNameMatch {
    fn name(&self) -> String {
        format!("secret-name-match/{}", self.namespace)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::namespaced(ResourceKind::Secret, &self.namespace);
        let not_found = format!("{} not found", self.display);

        let secrets = match ctx.accessor.list(&query).await {
            Ok(secrets) => secrets,
            Err(err) => return vec![CheckOutcome::warn(not_found).with_detail(err.to_string())],
        };

        let matched = secrets.iter().find(|s| {
            self.fragments
                .iter()
                .any(|fragment| s.name().contains(fragment.as_str()))
        });

        match matched {
            Some(secret) => vec![CheckOutcome::pass(format!("{} exists", self.display))
                .with_detail(secret.name().to_string())],
            None => vec![CheckOutcome::warn(not_found)],
        }
    }
}

/// The SSO client secret consumed by Dex is populated.
///
/// Pods are checked first so a missing Dex deployment is reported as such
/// rather than as a secret problem.
#[derive(Debug, Clone)]
pub struct SsoSecretConfigured {
    pub namespace: String,
    pub dex_selector: String,
    pub secret: String,
    pub field: String,
}

impl SsoSecretConfigured {
    pub fn new(namespace: &str, dex_selector: &str, secret: &str, field: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            dex_selector: dex_selector.to_string(),
            secret: secret.to_string(),
            field: field.to_string(),
        }
    }
}

#[async_trait]
impl Check for SsoSecretConfigured {
    fn name(&self) -> String {
        format!("sso-secret-configured/{}/{}", self.namespace, self.secret)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let pods = match ResourceQuery::namespaced(ResourceKind::Pod, &self.namespace)
            .with_labels(&self.dex_selector)
        {
            Ok(query) => ctx.accessor.list(&query).await,
            Err(err) => Err(err),
        };
        match pods {
            Ok(pods) if !pods.is_empty() => {}
            Ok(_) => return vec![CheckOutcome::warn("Could not check Dex SSO secret")],
            Err(err) => {
                return vec![CheckOutcome::warn("Could not check Dex SSO secret")
                    .with_detail(err.to_string())]
            }
        }

        let secret = match get_secret(ctx, &self.namespace, &self.secret).await {
            Ok(secret) => secret,
            Err(err) => {
                return vec![CheckOutcome::warn(format!(
                    "{} secret not found in {} namespace",
                    self.secret, self.namespace
                ))
                .with_detail(err.to_string())]
            }
        };

        let outcome = match secret.secret_value(&self.field) {
            Lookup::Found(value) if !value.is_empty() => {
                CheckOutcome::pass(format!("SSO secret configured (len={})", value.len()))
            }
            Lookup::Found(_) => CheckOutcome::warn("SSO secret is empty"),
            Lookup::WrongType | Lookup::Absent => CheckOutcome::warn(format!(
                "SSO secret has no '{}' field",
                self.field
            )),
        };
        vec![outcome]
    }
}

/// A service account carries a non-empty IRSA role annotation.
///
/// A missing annotation warns; a missing service account follows `missing`.
#[derive(Debug, Clone)]
pub struct ServiceAccountIrsa {
    pub namespace: String,
    pub name: String,
    pub display: String,
    pub missing: Criticality,
}

impl ServiceAccountIrsa {
    pub fn new(namespace: &str, name: &str, display: &str, missing: Criticality) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            display: display.to_string(),
            missing,
        }
    }
}

#[async_trait]
impl Check for ServiceAccountIrsa {
    fn name(&self) -> String {
        format!("service-account-irsa/{}/{}", self.namespace, self.name)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::namespaced(ResourceKind::ServiceAccount, &self.namespace);
        let account = match ctx.accessor.get(&query, &self.name).await {
            Ok(account) => account,
            Err(err) => {
                let label = format!("{} not found", self.display);
                let outcome = match self.missing {
                    Criticality::Critical => CheckOutcome::fail(label),
                    Criticality::Advisory => CheckOutcome::warn(label),
                };
                return vec![outcome.with_detail(err.to_string())];
            }
        };

        let outcome = if account.annotations().is_empty() {
            CheckOutcome::warn(format!("{} has no annotations", self.display))
        } else {
            match account.annotations().get(IRSA_ANNOTATION) {
                Some(role) if !role.is_empty() => {
                    CheckOutcome::pass(format!("{} has IRSA", self.display))
                        .with_detail(role.clone())
                }
                _ => CheckOutcome::warn(format!("{} missing IRSA annotation", self.display)),
            }
        };
        vec![outcome]
    }
}
