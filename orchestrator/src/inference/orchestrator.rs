use log::{debug, error, info, warn};
use shared::{ClassificationResult, ImagePayload, ReportText};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use super::state::{Failure, OrchestrationState, Snapshot, SubmissionId, Transition};
use crate::config::{ConfigError, OrchestratorConfig};
use crate::services::prompt::report_prompt;
use crate::services::{Classifier, GeminiReporter, HttpClassifier, ReportGenerator};

const TRANSITION_BUFFER: usize = 64;

/// Drives classification followed by report generation for one image at a
/// time and publishes the outcome as a [`Snapshot`].
///
/// A new `submit` (or `clear`) supersedes whatever is in flight: each
/// submission gets the next [`SubmissionId`] and every state update is
/// applied only while that id is still the latest one.
pub struct InferenceOrchestrator {
    classifier: Arc<dyn Classifier>,
    reporter: Arc<dyn ReportGenerator>,
    state: watch::Sender<Snapshot>,
    transitions: broadcast::Sender<Transition>,
}

impl InferenceOrchestrator {
    pub fn new(classifier: Arc<dyn Classifier>, reporter: Arc<dyn ReportGenerator>) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);

        Self {
            classifier,
            reporter,
            state,
            transitions,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, ConfigError> {
        config.validate_credential()?;

        let classifier =
            HttpClassifier::new(config.classifier_url.clone(), config.request_timeout)?;
        let reporter = GeminiReporter::new(&config.report, config.request_timeout)?;

        if config.report.usable_api_key().is_none() {
            warn!("Report API key is not configured; reports will be skipped");
        }

        Ok(Self::new(Arc::new(classifier), Arc::new(reporter)))
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    pub fn transitions(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Classifies `image`, then asks for a report on the returned label.
    ///
    /// Never fails: the outcome is observable through [`Self::snapshot`].
    /// Returns the id assigned to this submission.
    pub async fn submit(&self, image: ImagePayload) -> SubmissionId {
        let id = self.begin(OrchestrationState::Submitting);
        info!(
            "Submission {} started ({} bytes, {})",
            id,
            image.len(),
            image.media_type()
        );

        let classification = match self.classifier.classify(&image).await {
            Ok(classification) => classification,
            Err(err) => {
                error!("Submission {} failed: {}", id, err);
                let failure = Failure::from(&err);
                if !self.publish(id, |snapshot| {
                    snapshot.state = OrchestrationState::Failed(failure)
                }) {
                    discarded(id, "classification error");
                }
                return id;
            }
        };

        let stored = classification.clone();
        if !self.publish(id, |snapshot| {
            snapshot.classification = Some(stored);
            snapshot.state = OrchestrationState::Classified;
        }) {
            discarded(id, "classification result");
            return id;
        }

        self.request_report(id, &classification).await;
        id
    }

    /// Drops any results and returns to `Idle`; in-flight work is ignored.
    pub fn clear(&self) {
        let id = self.begin(OrchestrationState::Idle);
        debug!("Cleared; next results must come from after {}", id);
    }

    async fn request_report(&self, id: SubmissionId, classification: &ClassificationResult) {
        if !self.publish(id, |snapshot| {
            snapshot.state = OrchestrationState::ReportPending
        }) {
            discarded(id, "report request");
            return;
        }

        let prompt = report_prompt(classification);
        let accepted = match self.reporter.generate(&prompt).await {
            Ok(markdown) => {
                info!("Submission {} report ready ({} chars)", id, markdown.len());
                let report = ReportText::new(classification.label.clone(), markdown);
                self.publish(id, |snapshot| {
                    snapshot.report = Some(report);
                    snapshot.state = OrchestrationState::Complete;
                })
            }
            Err(err) => {
                warn!(
                    "Submission {} report unavailable, keeping classification: {}",
                    id, err
                );
                self.publish(id, |snapshot| {
                    snapshot.report = None;
                    snapshot.warning = Some(err);
                    snapshot.state = OrchestrationState::Complete;
                })
            }
        };

        if !accepted {
            discarded(id, "report");
        }
    }

    /// Starts a new submission with fresh, empty results.
    fn begin(&self, state: OrchestrationState) -> SubmissionId {
        let mut id = SubmissionId::default();
        self.state.send_modify(|snapshot| {
            id = SubmissionId(snapshot.submission.0 + 1);
            *snapshot = Snapshot {
                submission: id,
                state: state.clone(),
                ..Snapshot::default()
            };
            let _ = self.transitions.send(Transition {
                submission: id,
                state,
            });
        });
        id
    }

    /// Applies `update` if `id` is still the latest submission.
    fn publish<F>(&self, id: SubmissionId, update: F) -> bool
    where
        F: FnOnce(&mut Snapshot),
    {
        self.state.send_if_modified(|snapshot| {
            if snapshot.submission != id {
                return false;
            }
            update(snapshot);
            let _ = self.transitions.send(Transition {
                submission: id,
                state: snapshot.state.clone(),
            });
            true
        })
    }
}

fn discarded(id: SubmissionId, what: &str) {
    debug!("Discarding stale {} from superseded submission {}", what, id);
}
