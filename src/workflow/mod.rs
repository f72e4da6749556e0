// Workflow Action Orchestrator.
//
// Every mutating operation runs the same discipline: gate locally
// against the lifecycle state, build the wire payload, dispatch it,
// then let the caller re-fetch the record. The working copy is never
// mutated optimistically; the backend remains the sole source of
// truth.

pub mod orchestrator;
pub mod requests;
pub mod session;

pub use orchestrator::{DiagnosisOutcome, LookupOutcome, WorkflowCoordinator, WorkflowError};
pub use session::WorkflowSession;
