//! Post-deployment smoke test for the platform stack.
//!
//! Audits cluster health, platform controllers, custom resources and
//! cross-component configuration, then reports pass/fail/warning outcomes.
//! All cluster access is read-only.

pub mod check;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod platform;
pub mod probe;
pub mod resolver;
pub mod resource;
pub mod runner;
pub mod ui;

pub use check::{Check, CheckContext, CheckGroup, CheckOutcome, Status};
pub use error::{AccessError, CheckError, Criticality};
pub use ledger::{ExitSignal, ResultLedger, Summary};
pub use orchestrator::{CompletedAudit, ExecutionMode, Orchestrator};
pub use probe::{HttpsProbe, Reachability, ReachabilityProbe};
pub use resource::{KubeAccessor, ResourceAccessor, ResourceQuery, ResourceRecord};
