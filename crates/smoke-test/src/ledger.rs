//! Accumulated results of an audit run.

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::check::{CheckOutcome, Status};

/// An outcome together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedOutcome {
    pub group: String,
    pub section: String,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

/// Whether the process should report success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitSignal {
    Success,
    Failure,
}

impl From<ExitSignal> for ExitCode {
    fn from(signal: ExitSignal) -> Self {
        match signal {
            ExitSignal::Success => Self::SUCCESS,
            ExitSignal::Failure => Self::FAILURE,
        }
    }
}

/// Ordered record of every outcome in a run.
///
/// Only the runner appends; everyone else sees it through [`ResultLedger::summary`].
#[derive(Debug, Clone, Default)]
pub struct ResultLedger {
    outcomes: Vec<RecordedOutcome>,
    checks_run: usize,
}

impl ResultLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, group: &str, section: &str, outcome: CheckOutcome) {
        self.outcomes.push(RecordedOutcome {
            group: group.to_string(),
            section: section.to_string(),
            outcome,
        });
    }

    /// Count one check invocation, independent of how many outcomes it emitted.
    pub(crate) fn count_check(&mut self) {
        self.checks_run += 1;
    }

    /// Move everything from `other` onto the end of this ledger.
    pub(crate) fn append(&mut self, other: Self) {
        self.outcomes.extend(other.outcomes);
        self.checks_run += other.checks_run;
    }

    fn count(&self, status: Status) -> usize {
        self.outcomes
            .iter()
            .filter(|r| r.outcome.status() == status)
            .count()
    }

    #[must_use]
    pub fn outcomes(&self) -> &[RecordedOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn checks_run(&self) -> usize {
        self.checks_run
    }

    /// Totals plus the full ordered log.
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            passed: self.count(Status::Pass),
            failed: self.count(Status::Fail),
            warnings: self.count(Status::Warning),
            total: self.outcomes.len(),
            checks_run: self.checks_run,
            timestamp: Utc::now(),
            outcomes: self.outcomes.clone(),
        }
    }

    /// Failure iff at least one outcome failed.
    #[must_use]
    pub fn exit_signal(&self) -> ExitSignal {
        if self.count(Status::Fail) > 0 {
            ExitSignal::Failure
        } else {
            ExitSignal::Success
        }
    }
}

/// Sections of one group, each with its outcomes, in insertion order.
pub type GroupSections<'a> = Vec<(&'a str, Vec<&'a CheckOutcome>)>;

/// Snapshot of a completed ledger, suitable for rendering or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub total: usize,
    pub checks_run: usize,
    pub timestamp: DateTime<Utc>,
    pub outcomes: Vec<RecordedOutcome>,
}

impl Summary {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Outcomes grouped by group title, then section, in insertion order.
    #[must_use]
    pub fn by_group(&self) -> Vec<(&str, GroupSections<'_>)> {
        let mut groups: Vec<(&str, GroupSections<'_>)> = Vec::new();

        for recorded in &self.outcomes {
            if groups.last().map(|(g, _)| *g) != Some(recorded.group.as_str()) {
                groups.push((recorded.group.as_str(), Vec::new()));
            }
            let Some((_, sections)) = groups.last_mut() else {
                continue;
            };
            if sections.last().map(|(s, _)| *s) != Some(recorded.section.as_str()) {
                sections.push((recorded.section.as_str(), Vec::new()));
            }
            if let Some((_, outcomes)) = sections.last_mut() {
                outcomes.push(&recorded.outcome);
            }
        }

        groups
    }
}
