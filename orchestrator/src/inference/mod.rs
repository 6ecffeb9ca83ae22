pub mod orchestrator;
pub mod state;

pub use orchestrator::InferenceOrchestrator;
pub use state::{Failure, OrchestrationState, Snapshot, SubmissionId, Transition};
