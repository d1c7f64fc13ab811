//! Sequential execution of a check group.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::check::{CheckContext, CheckDefinition, CheckGroup, CheckOutcome, Status};
use crate::ledger::ResultLedger;

/// Runs check groups against one context, one check at a time.
pub struct CheckRunner<'a> {
    ctx: CheckContext<'a>,
}

impl<'a> CheckRunner<'a> {
    pub fn new(ctx: CheckContext<'a>) -> Self {
        Self { ctx }
    }

    /// Run every definition of `group` in order and return its outcomes.
    ///
    /// Never fails: a check that returns nothing becomes a warning and a
    /// check that panics becomes a failure.
    pub async fn run(&self, group: &CheckGroup) -> ResultLedger {
        info!(group = group.title(), checks = group.len(), "Running check group");

        let mut ledger = ResultLedger::new();
        for definition in group.definitions() {
            ledger.count_check();
            for outcome in self.evaluate(definition).await {
                ledger.record(group.title(), &definition.section, outcome);
            }
        }

        let summary = ledger.summary();
        info!(
            group = group.title(),
            passed = summary.passed,
            failed = summary.failed,
            warnings = summary.warnings,
            "Check group complete"
        );
        ledger
    }

    async fn evaluate(&self, definition: &CheckDefinition) -> Vec<CheckOutcome> {
        let name = definition.check.name();
        debug!(check = %name, section = %definition.section, "Evaluating check");

        let outcomes = match AssertUnwindSafe(definition.check.evaluate(&self.ctx))
            .catch_unwind()
            .await
        {
            Ok(outcomes) if outcomes.is_empty() => {
                warn!(check = %name, "Check produced no outcome");
                vec![CheckOutcome::warn(format!("{name}: no result"))]
            }
            Ok(outcomes) => outcomes,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(check = %name, reason = %reason, "Check panicked");
                vec![CheckOutcome::fail(format!("{name}: check aborted")).with_detail(reason)]
            }
        };

        for outcome in &outcomes {
            if outcome.status() != Status::Pass {
                debug!(
                    check = %name,
                    status = %outcome.status(),
                    label = outcome.label(),
                    "Check degraded"
                );
            }
        }
        outcomes
    }
}
