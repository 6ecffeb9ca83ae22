use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::ReportGenerator;
use crate::config::{ReportConfig, is_placeholder};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("Report service is not configured: {0}")]
    Configuration(String),
    #[error("Report service unreachable: {0}")]
    Unreachable(String),
    #[error("Malformed report response: {0}")]
    Malformed(String),
    #[error("Report service error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        ReportError::Unreachable(err.to_string())
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Clone)]
pub struct GeminiReporter {
    http_client: HttpClient,
    base_url: Url,
    model: String,
    api_key: Option<String>,
}

impl GeminiReporter {
    pub fn new(config: &ReportConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http_client, config))
    }

    pub fn with_client(http_client: HttpClient, config: &ReportConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ReportError> {
        match self.api_key.as_deref() {
            Some(key) if !is_placeholder(key) => Ok(key),
            Some(_) => Err(ReportError::Configuration(
                "API key is still a placeholder".to_string(),
            )),
            None => Err(ReportError::Configuration("API key is not set".to_string())),
        }
    }

    fn endpoint(&self) -> Result<Url, ReportError> {
        self.base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| ReportError::Configuration(format!("invalid report endpoint: {}", e)))
    }
}

/// Maps an HTTP reply from the generative API to report text or an error.
fn interpret_response(status: StatusCode, body: &str) -> Result<String, ReportError> {
    if !status.is_success() {
        let api_error = serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error);
        let message = api_error
            .as_ref()
            .map(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        let rejected_key = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            || (status == StatusCode::BAD_REQUEST
                && (message.to_ascii_lowercase().contains("api key")
                    || api_error
                        .as_ref()
                        .and_then(|e| e.status.as_deref())
                        == Some("UNAUTHENTICATED")));

        return Err(if rejected_key {
            ReportError::Configuration(message)
        } else {
            ReportError::Server {
                status: status.as_u16(),
                message,
            }
        });
    }

    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ReportError::Malformed(e.to_string()))?;

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ReportError::Malformed(
            "response contained no report text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl ReportGenerator for GeminiReporter {
    async fn generate(&self, prompt: &str) -> Result<String, ReportError> {
        let api_key = self.api_key()?;
        let url = self.endpoint()?;
        debug!("Requesting report from {}", url);

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: prompt }],
            }],
        };

        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        interpret_response(status, &body).inspect_err(|err| {
            warn!("Report generation failed: {}", err);
        })
    }
}
