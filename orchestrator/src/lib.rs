pub mod config;
pub mod inference;
pub mod payload;
pub mod services;

pub use config::{ConfigError, CredentialPolicy, OrchestratorConfig};
pub use inference::{
    Failure, InferenceOrchestrator, OrchestrationState, Snapshot, SubmissionId, Transition,
};
pub use services::{Classifier, ClassifyError, ReportError, ReportGenerator};
pub use shared::{ClassificationResult, ImagePayload, ReportText, TumorClass};
