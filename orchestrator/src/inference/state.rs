use shared::{ClassificationResult, ReportText};
use std::fmt;

use crate::services::{ClassifyError, ReportError};

/// Monotonic submission number. Zero means nothing was submitted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a submission ended without a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Unreachable,
    MalformedResponse,
    ServerError(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Unreachable => write!(f, "service unreachable"),
            Failure::MalformedResponse => write!(f, "malformed response"),
            Failure::ServerError(message) => write!(f, "{}", message),
        }
    }
}

impl From<&ClassifyError> for Failure {
    fn from(err: &ClassifyError) -> Self {
        match err {
            ClassifyError::Unreachable(_) => Failure::Unreachable,
            ClassifyError::Malformed(_) => Failure::MalformedResponse,
            ClassifyError::Server { status, message } => Failure::ServerError(
                message
                    .clone()
                    .unwrap_or_else(|| format!("classification service returned HTTP {}", status)),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrchestrationState {
    #[default]
    Idle,
    Submitting,
    Classified,
    ReportPending,
    Complete,
    Failed(Failure),
}

impl fmt::Display for OrchestrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationState::Idle => write!(f, "idle"),
            OrchestrationState::Submitting => write!(f, "submitting"),
            OrchestrationState::Classified => write!(f, "classified"),
            OrchestrationState::ReportPending => write!(f, "report pending"),
            OrchestrationState::Complete => write!(f, "complete"),
            OrchestrationState::Failed(failure) => write!(f, "failed: {}", failure),
        }
    }
}

/// Everything the view layer renders, as of the latest submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub submission: SubmissionId,
    pub state: OrchestrationState,
    pub classification: Option<ClassificationResult>,
    pub report: Option<ReportText>,
    /// Set when the report step failed after a successful classification.
    pub warning: Option<ReportError>,
}

impl Snapshot {
    pub fn failure(&self) -> Option<&Failure> {
        match &self.state {
            OrchestrationState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A single state change, tagged with the submission that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub submission: SubmissionId,
    pub state: OrchestrationState,
}
