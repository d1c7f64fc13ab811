//! Check model: outcomes, the [`Check`] trait and check groups.
//!
//! A check is a read-only unit of work that pulls data through the
//! [`CheckContext`] and turns whatever it finds, including its own lookup
//! errors, into one or more [`CheckOutcome`]s.

pub mod config;
pub mod custom;
pub mod ingress;
pub mod workloads;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{CheckError, Criticality};
use crate::probe::ReachabilityProbe;
use crate::resource::ResourceAccessor;

/// Verdict of a single outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
    Warning,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Warning => write!(f, "WARN"),
        }
    }
}

/// One immutable verdict with a human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    status: Status,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl CheckOutcome {
    pub fn new(status: Status, label: impl Into<String>) -> Self {
        Self {
            status,
            label: label.into(),
            detail: None,
        }
    }

    pub fn pass(label: impl Into<String>) -> Self {
        Self::new(Status::Pass, label)
    }

    pub fn fail(label: impl Into<String>) -> Self {
        Self::new(Status::Fail, label)
    }

    pub fn warn(label: impl Into<String>) -> Self {
        Self::new(Status::Warning, label)
    }

    /// Outcome for an error raised while evaluating a check.
    pub fn from_error(
        label: impl Into<String>,
        err: &CheckError,
        criticality: Criticality,
    ) -> Self {
        Self::new(err.status(criticality), label).with_detail(err.to_string())
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

/// Collaborators a check may read from.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub accessor: &'a dyn ResourceAccessor,
    pub probe: &'a dyn ReachabilityProbe,
}

impl<'a> CheckContext<'a> {
    pub fn new(accessor: &'a dyn ResourceAccessor, probe: &'a dyn ReachabilityProbe) -> Self {
        Self { accessor, probe }
    }
}

/// A named, read-only verification.
#[async_trait]
pub trait Check: Send + Sync {
    /// Stable name used in logs and in fallback outcomes.
    fn name(&self) -> String;

    /// Evaluate against the cluster. Must not fail: errors become outcomes.
    async fn evaluate(&self, ctx: &CheckContext<'_>) -> Vec<CheckOutcome>;
}

/// A check filed under a section of its group.
pub struct CheckDefinition {
    pub section: String,
    pub check: Box<dyn Check>,
}

impl fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("section", &self.section)
            .field("check", &self.check.name())
            .finish()
    }
}

/// Ordered checks under a display title.
#[derive(Debug)]
pub struct CheckGroup {
    title: String,
    definitions: Vec<CheckDefinition>,
    current_section: String,
}

impl CheckGroup {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            definitions: Vec::new(),
            current_section: String::new(),
        }
    }

    /// Start a new section; subsequent checks are filed under it.
    #[must_use]
    pub fn section(mut self, title: impl Into<String>) -> Self {
        self.current_section = title.into();
        self
    }

    /// Append a check to the current section.
    #[must_use]
    pub fn check(mut self, check: impl Check + 'static) -> Self {
        self.definitions.push(CheckDefinition {
            section: self.current_section.clone(),
            check: Box::new(check),
        });
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn definitions(&self) -> &[CheckDefinition] {
        &self.definitions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;

    struct Named(&'static str);

    #[async_trait]
    impl Check for Named {
        fn name(&self) -> String {
            self.0.to_string()
        }

        async fn evaluate(&self, _ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
            vec![CheckOutcome::pass(self.0)]
        }
    }

    #[test]
    fn test_group_builder_tracks_sections() {
        let group = CheckGroup::new("ARGOCD")
            .section("Deployment Status")
            .check(Named("namespace"))
            .check(Named("server"))
            .section("Applications")
            .check(Named("apps"));

        assert_eq!(group.title(), "ARGOCD");
        assert_eq!(group.len(), 3);

        let sections: Vec<_> = group
            .definitions()
            .iter()
            .map(|d| (d.section.as_str(), d.check.name()))
            .collect();
        assert_eq!(
            sections,
            vec![
                ("Deployment Status", "namespace".to_string()),
                ("Deployment Status", "server".to_string()),
                ("Applications", "apps".to_string()),
            ]
        );
    }

    #[test]
    fn test_outcome_from_error() {
        let err = CheckError::from(AccessError::Transport("timeout".into()));
        let outcome = CheckOutcome::from_error("Kyverno policies", &err, Criticality::Advisory);

        assert_eq!(outcome.status(), Status::Warning);
        assert_eq!(outcome.label(), "Kyverno policies");
        assert_eq!(outcome.detail(), Some("API request failed: timeout"));
    }
}
