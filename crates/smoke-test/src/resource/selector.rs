//! Equality-based label selectors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AccessError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals { key: String, value: String },
    NotEquals { key: String, value: String },
}

/// A parsed equality-based label selector (`key=value`, `key==value`,
/// `key!=value`, comma-separated and ANDed).
///
/// The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    /// Selector matching every object.
    #[must_use]
    pub fn everything() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Whether a label set satisfies every requirement.
    ///
    /// `key!=value` also matches objects without the key, as the API server does.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|req| match req {
            Requirement::Equals { key, value } => labels.get(key) == Some(value),
            Requirement::NotEquals { key, value } => labels.get(key) != Some(value),
        })
    }
}

impl FromStr for LabelSelector {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut requirements = Vec::new();

        for term in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let req = if let Some((key, value)) = term.split_once("!=") {
                Requirement::NotEquals {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                }
            } else if let Some((key, value)) = term
                .split_once("==")
                .or_else(|| term.split_once('='))
            {
                Requirement::Equals {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                }
            } else {
                return Err(AccessError::InvalidQuery(format!(
                    "label selector term '{term}' is not an equality requirement"
                )));
            };

            let key = match &req {
                Requirement::Equals { key, .. } | Requirement::NotEquals { key, .. } => key,
            };
            if key.is_empty() {
                return Err(AccessError::InvalidQuery(format!(
                    "label selector term '{term}' has an empty key"
                )));
            }

            requirements.push(req);
        }

        Ok(Self { requirements })
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .requirements
            .iter()
            .map(|req| match req {
                Requirement::Equals { key, value } => format!("{key}={value}"),
                Requirement::NotEquals { key, value } => format!("{key}!={value}"),
            })
            .collect();
        write!(f, "{}", terms.join(","))
    }
}
