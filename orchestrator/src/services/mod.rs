pub mod classifier;
pub mod prompt;
pub mod report;

use async_trait::async_trait;
use shared::{ClassificationResult, ImagePayload};

pub use classifier::{ClassifyError, HttpClassifier};
pub use report::{GeminiReporter, ReportError};

/// Remote endpoint returning a categorical label for an image.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &ImagePayload) -> Result<ClassificationResult, ClassifyError>;
}

/// Remote generative-text endpoint producing explanatory text from a prompt.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ReportError>;
}
