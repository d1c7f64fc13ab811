//! Ingress host discovery and external reachability.

use async_trait::async_trait;

use super::{Check, CheckContext, CheckOutcome};
use crate::error::{CheckError, Criticality};
use crate::probe::Reachability;
use crate::resource::{ResourceKind, ResourceQuery};

/// The first host declared by an ingress in a namespace answers HTTPS.
///
/// Emits the host as a pass, then a second outcome for the probe. Any HTTP
/// status counts as reachable; only transport failures warn.
#[derive(Debug, Clone)]
pub struct IngressReachable {
    pub namespace: String,
    pub display: String,
}

impl IngressReachable {
    pub fn new(namespace: &str, display: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            display: display.to_string(),
        }
    }
}

#[async_trait]
impl Check for IngressReachable {
    fn name(&self) -> String {
        format!("ingress-reachable/{}", self.namespace)
    }

    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
        let query = ResourceQuery::namespaced(ResourceKind::Ingress, &self.namespace);
        let no_ingress = format!("{}: no ingress found", self.display);

        let ingresses = match ctx.accessor.list(&query).await {
            Ok(ingresses) => ingresses,
            Err(err) => return vec![CheckOutcome::warn(no_ingress).with_detail(err.to_string())],
        };
        if ingresses.is_empty() {
            return vec![CheckOutcome::warn(no_ingress)];
        }
        let host = ingresses
            .iter()
            .find_map(|ingress| ingress.ingress_hosts().first().map(ToString::to_string));
        let Some(host) = host else {
            return vec![CheckOutcome::warn(format!(
                "{}: no host configured",
                self.display
            ))];
        };

        let mut outcomes = vec![CheckOutcome::pass(format!(
            "{} ingress: {host}",
            self.display
        ))];

        outcomes.push(match ctx.probe.probe(&host).await {
            Reachability::Reachable(status) => {
                CheckOutcome::pass(format!("{}: reachable (HTTP {status})", self.display))
            }
            Reachability::Unreachable(reason) => {
                let err = CheckError::Unreachable { host, reason };
                CheckOutcome::from_error(
                    format!("{}: not reachable (DNS/network)", self.display),
                    &err,
                    Criticality::Advisory,
                )
            }
        });
        outcomes
    }
}
