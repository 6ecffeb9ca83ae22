use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use shared::{ClassificationResult, ErrorDetail, ImagePayload, PredictResponse};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::Classifier;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("Classification service unreachable: {0}")]
    Unreachable(String),
    #[error("Malformed classification response: {0}")]
    Malformed(String),
    #[error("Classification service error ({status}): {}", .message.as_deref().unwrap_or("no detail"))]
    Server {
        status: u16,
        message: Option<String>,
    },
}

impl From<reqwest::Error> for ClassifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClassifyError::Unreachable(format!("request timed out: {}", err))
        } else {
            ClassifyError::Unreachable(err.to_string())
        }
    }
}

#[derive(Clone)]
pub struct HttpClassifier {
    http_client: HttpClient,
    endpoint: Url,
}

impl HttpClassifier {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http_client, endpoint))
    }

    pub fn with_client(http_client: HttpClient, endpoint: Url) -> Self {
        Self {
            http_client,
            endpoint,
        }
    }

    fn form_for(image: &ImagePayload) -> Result<Form, reqwest::Error> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().unwrap_or("upload").to_string())
            .mime_str(image.media_type())?;
        Ok(Form::new().part("file", part))
    }
}

/// Turns a classification response into a result or a typed error.
pub fn interpret_response(status: u16, body: &str) -> Result<ClassificationResult, ClassifyError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorDetail>(body)
            .ok()
            .and_then(|detail| detail.message().map(str::to_string));
        return Err(ClassifyError::Server { status, message });
    }

    let response: PredictResponse =
        serde_json::from_str(body).map_err(|e| ClassifyError::Malformed(e.to_string()))?;
    if response.predicted_class.trim().is_empty() {
        return Err(ClassifyError::Malformed("predicted_class is empty".to_string()));
    }

    Ok(response.into())
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image: &ImagePayload) -> Result<ClassificationResult, ClassifyError> {
        debug!(
            "Uploading {} bytes ({}) to {}",
            image.len(),
            image.media_type(),
            self.endpoint
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .multipart(Self::form_for(image)?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match interpret_response(status.as_u16(), &body) {
            Ok(result) => {
                info!("Classification succeeded: {}", result.label);
                Ok(result)
            }
            Err(err) => {
                error!("Classification failed: {} (body: {})", err, body);
                Err(err)
            }
        }
    }
}
