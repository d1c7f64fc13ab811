//! Uniform view over typed and dynamic cluster objects.

use std::collections::BTreeMap;

use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::error::AccessError;

/// Result of reading a nested field.
///
/// Absence and type mismatch are distinct from an empty value, so callers can
/// tell "field missing" apart from "field present but empty".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    WrongType,
    Absent,
}

impl<T> Lookup<T> {
    /// The value, if found with the right type.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::WrongType | Self::Absent => None,
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::WrongType => Lookup::WrongType,
            Self::Absent => Lookup::Absent,
        }
    }
}

/// A single object returned by the cluster, typed or dynamic.
///
/// The full object body is kept as JSON; metadata is lifted out for cheap
/// access and typed accessors read the well-known paths of built-in kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    name: String,
    namespace: Option<String>,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    object: Value,
}

impl ResourceRecord {
    /// Build a record from a serialized object body.
    #[must_use]
    pub fn from_json(object: Value) -> Self {
        let metadata = object.get("metadata");
        let text = |key: &str| {
            metadata
                .and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .map(ToString::to_string)
        };

        let name = text("name").or_else(|| text("generateName")).unwrap_or_default();
        let namespace = text("namespace");
        let labels = string_map(metadata.and_then(|m| m.get("labels")));
        let annotations = string_map(metadata.and_then(|m| m.get("annotations")));

        Self {
            name,
            namespace,
            labels,
            annotations,
            object,
        }
    }

    /// Build a record from any serializable API object.
    pub fn from_resource<K: Serialize>(resource: &K) -> Result<Self, AccessError> {
        let object = serde_json::to_value(resource)
            .map_err(|e| AccessError::Transport(format!("failed to serialize object: {e}")))?;
        Ok(Self::from_json(object))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    #[must_use]
    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    /// The raw object body.
    #[must_use]
    pub fn object(&self) -> &Value {
        &self.object
    }

    /// Walk a segmented path (e.g. `["status", "health", "status"]`).
    #[must_use]
    pub fn field(&self, path: &[&str]) -> Lookup<&Value> {
        let mut current = &self.object;
        for segment in path {
            match current {
                Value::Object(map) => match map.get(*segment) {
                    Some(next) => current = next,
                    None => return Lookup::Absent,
                },
                _ => return Lookup::WrongType,
            }
        }
        match current {
            Value::Null => Lookup::Absent,
            value => Lookup::Found(value),
        }
    }

    #[must_use]
    pub fn str_at(&self, path: &[&str]) -> Lookup<&str> {
        match self.field(path) {
            Lookup::Found(value) => value.as_str().map_or(Lookup::WrongType, Lookup::Found),
            Lookup::WrongType => Lookup::WrongType,
            Lookup::Absent => Lookup::Absent,
        }
    }

    #[must_use]
    pub fn i64_at(&self, path: &[&str]) -> Lookup<i64> {
        match self.field(path) {
            Lookup::Found(value) => value.as_i64().map_or(Lookup::WrongType, Lookup::Found),
            Lookup::WrongType => Lookup::WrongType,
            Lookup::Absent => Lookup::Absent,
        }
    }

    #[must_use]
    pub fn array_at(&self, path: &[&str]) -> Lookup<&Vec<Value>> {
        match self.field(path) {
            Lookup::Found(value) => value.as_array().map_or(Lookup::WrongType, Lookup::Found),
            Lookup::WrongType => Lookup::WrongType,
            Lookup::Absent => Lookup::Absent,
        }
    }

    #[must_use]
    pub fn map_at(&self, path: &[&str]) -> Lookup<&serde_json::Map<String, Value>> {
        match self.field(path) {
            Lookup::Found(value) => value.as_object().map_or(Lookup::WrongType, Lookup::Found),
            Lookup::WrongType => Lookup::WrongType,
            Lookup::Absent => Lookup::Absent,
        }
    }

    // Workload accessors

    /// `spec.replicas`, defaulting to 1 as the API server does.
    #[must_use]
    pub fn desired_replicas(&self) -> i64 {
        self.i64_at(&["spec", "replicas"]).found().unwrap_or(1)
    }

    /// `status.readyReplicas`; the API omits the field when it is zero.
    #[must_use]
    pub fn ready_replicas(&self) -> i64 {
        self.i64_at(&["status", "readyReplicas"]).found().unwrap_or(0)
    }

    /// `status.phase` (pods, and many custom resources).
    #[must_use]
    pub fn phase(&self) -> Option<&str> {
        self.str_at(&["status", "phase"]).found()
    }

    /// Status of the `status.conditions` entry with the given type.
    #[must_use]
    pub fn condition_status(&self, condition_type: &str) -> Option<&str> {
        self.array_at(&["status", "conditions"])
            .found()?
            .iter()
            .find(|c| c.get("type").and_then(Value::as_str) == Some(condition_type))
            .and_then(|c| c.get("status"))
            .and_then(Value::as_str)
    }

    /// Hosts declared by an ingress, in rule order, skipping empty ones.
    #[must_use]
    pub fn ingress_hosts(&self) -> Vec<&str> {
        self.array_at(&["spec", "rules"])
            .found()
            .map(|rules| {
                rules
                    .iter()
                    .filter_map(|r| r.get("host").and_then(Value::as_str))
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    // Configuration accessors

    /// A decoded secret value from `data`, falling back to `stringData`.
    ///
    /// Values that are not valid base64 or UTF-8 report `WrongType`.
    #[must_use]
    pub fn secret_value(&self, key: &str) -> Lookup<String> {
        match self.str_at(&["data", key]) {
            Lookup::Found(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .map_or(Lookup::WrongType, Lookup::Found),
            Lookup::WrongType => Lookup::WrongType,
            Lookup::Absent => self
                .str_at(&["stringData", key])
                .map(ToString::to_string),
        }
    }

    /// A config map `data` entry.
    #[must_use]
    pub fn config_value(&self, key: &str) -> Lookup<&str> {
        self.str_at(&["data", key])
    }
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;
    use serde_json::json;

    #[test]
    fn test_metadata_is_lifted() {
        let record = ResourceRecord::from_json(json!({
            "metadata": {
                "name": "argo-events-controller",
                "namespace": "argo-events",
                "labels": {"app": "controller"},
                "annotations": {"eks.amazonaws.com/role-arn": "arn:aws:iam::1:role/x"}
            }
        }));

        assert_eq!(record.name(), "argo-events-controller");
        assert_eq!(record.namespace(), Some("argo-events"));
        assert_eq!(record.labels().get("app").map(String::as_str), Some("controller"));
        assert!(record.annotations().contains_key("eks.amazonaws.com/role-arn"));
    }

    #[test]
    fn test_field_tri_state() {
        let record = ResourceRecord::from_json(json!({
            "status": {"phase": "", "replicas": 3, "health": {"status": "Healthy"}}
        }));

        assert_eq!(record.str_at(&["status", "phase"]), Lookup::Found(""));
        assert_eq!(record.str_at(&["status", "missing"]), Lookup::Absent);
        assert_eq!(record.str_at(&["status", "replicas"]), Lookup::WrongType);
        assert_eq!(record.str_at(&["status", "phase", "deeper"]), Lookup::WrongType);
        assert_eq!(
            record.str_at(&["status", "health", "status"]),
            Lookup::Found("Healthy")
        );
        assert!(record.map_at(&["spec"]).is_absent());
    }

    #[test]
    fn test_typed_deployment_accessors() {
        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some("argocd-server".into()),
                namespace: Some("argocd".into()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(3),
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                ready_replicas: Some(2),
                ..Default::default()
            }),
        };

        let record = ResourceRecord::from_resource(&deployment).unwrap();
        assert_eq!(record.name(), "argocd-server");
        assert_eq!(record.desired_replicas(), 3);
        assert_eq!(record.ready_replicas(), 2);
    }

    #[test]
    fn test_replica_defaults() {
        let record = ResourceRecord::from_json(json!({"metadata": {"name": "x"}}));
        assert_eq!(record.desired_replicas(), 1);
        assert_eq!(record.ready_replicas(), 0);
    }

    #[test]
    fn test_secret_values_are_decoded() {
        let mut secret = Secret {
            metadata: ObjectMeta {
                name: Some("argo-workflows-sso".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        secret.data = Some(
            [
                ("client-secret".to_string(), ByteString(b"s3cr3t".to_vec())),
                ("empty".to_string(), ByteString(Vec::new())),
            ]
            .into_iter()
            .collect(),
        );

        let record = ResourceRecord::from_resource(&secret).unwrap();
        assert_eq!(
            record.secret_value("client-secret"),
            Lookup::Found("s3cr3t".to_string())
        );
        assert_eq!(record.secret_value("empty"), Lookup::Found(String::new()));
        assert_eq!(record.secret_value("client-id"), Lookup::Absent);
    }

    #[test]
    fn test_condition_and_ingress_accessors() {
        let record = ResourceRecord::from_json(json!({
            "spec": {"rules": [{"http": {}}, {"host": "argocd.example.com"}]},
            "status": {"conditions": [
                {"type": "Progressing", "status": "True"},
                {"type": "Ready", "status": "False"}
            ]}
        }));

        assert_eq!(record.condition_status("Ready"), Some("False"));
        assert_eq!(record.condition_status("Available"), None);
        assert_eq!(record.ingress_hosts(), vec!["argocd.example.com"]);
    }
}
