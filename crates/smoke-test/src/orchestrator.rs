//! Top-level audit run over a list of check groups.

use futures::future::join_all;
use tracing::info;

use crate::check::{CheckContext, CheckGroup};
use crate::ledger::{ExitSignal, ResultLedger, Summary};
use crate::runner::CheckRunner;

/// How groups are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// Groups evaluated concurrently on the current task. Results are still
    /// recorded in group order.
    Concurrent,
}

/// An audit that has not run yet.
///
/// [`Orchestrator::run`] consumes it, so a run happens at most once.
#[derive(Debug, Default)]
pub struct Orchestrator {
    groups: Vec<CheckGroup>,
    mode: ExecutionMode,
}

impl Orchestrator {
    pub fn new(groups: Vec<CheckGroup>) -> Self {
        Self {
            groups,
            mode: ExecutionMode::Sequential,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn groups(&self) -> &[CheckGroup] {
        &self.groups
    }

    /// Run every group top to bottom. Never stops early.
    pub async fn run(self, ctx: CheckContext<'_>) -> CompletedAudit {
        info!(groups = self.groups.len(), mode = ?self.mode, "Starting audit");

        let runner = CheckRunner::new(ctx);
        let mut ledger = ResultLedger::new();

        match self.mode {
            ExecutionMode::Sequential => {
                for group in &self.groups {
                    ledger.append(runner.run(group).await);
                }
            }
            ExecutionMode::Concurrent => {
                let results = join_all(self.groups.iter().map(|group| runner.run(group))).await;
                for result in results {
                    ledger.append(result);
                }
            }
        }

        let audit = CompletedAudit { ledger };
        info!(
            checks = audit.ledger.checks_run(),
            outcomes = audit.ledger.outcomes().len(),
            "Audit complete"
        );
        audit
    }
}

/// A finished audit. Read-only.
#[derive(Debug)]
pub struct CompletedAudit {
    ledger: ResultLedger,
}

impl CompletedAudit {
    #[must_use]
    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        self.ledger.summary()
    }

    #[must_use]
    pub fn exit_signal(&self) -> ExitSignal {
        self.ledger.exit_signal()
    }
}
