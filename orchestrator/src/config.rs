use std::env;
use std::str::FromStr;
use std::time::Duration;
use strum_macros::EnumString;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CLASSIFIER_URL: &str = "http://127.0.0.1:8000/predict";
pub const DEFAULT_REPORT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_REPORT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
    #[error("Report API credential is missing or still a placeholder")]
    MissingCredential,
    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// When the report credential is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum CredentialPolicy {
    /// Only the report step fails, after classification has run.
    #[default]
    Lazy,
    /// Refuse to build the orchestrator without a usable credential.
    Eager,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub base_url: Url,
    pub model: String,
    pub api_key: Option<String>,
}

impl ReportConfig {
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !is_placeholder(key))
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub classifier_url: Url,
    pub report: ReportConfig,
    pub request_timeout: Duration,
    pub credential_policy: CredentialPolicy,
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let classifier_url = parse_url(
            "CLASSIFIER_URL",
            var("CLASSIFIER_URL").as_deref().unwrap_or(DEFAULT_CLASSIFIER_URL),
        )?;
        let base_url = parse_url(
            "REPORT_API_BASE",
            var("REPORT_API_BASE").as_deref().unwrap_or(DEFAULT_REPORT_API_BASE),
        )?;
        let model = var("REPORT_MODEL").unwrap_or_else(|| DEFAULT_REPORT_MODEL.to_string());
        let api_key = var("REPORT_API_KEY").or_else(|| var("GEMINI_API_KEY"));

        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "REQUEST_TIMEOUT_SECS",
                        value,
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let credential_policy = match var("REPORT_CREDENTIAL_POLICY") {
            Some(value) => CredentialPolicy::from_str(&value).map_err(|_| {
                ConfigError::InvalidValue {
                    var: "REPORT_CREDENTIAL_POLICY",
                    value,
                }
            })?,
            None => CredentialPolicy::default(),
        };

        Ok(Self {
            classifier_url,
            report: ReportConfig {
                base_url,
                model,
                api_key,
            },
            request_timeout,
            credential_policy,
        })
    }

    pub fn validate_credential(&self) -> Result<(), ConfigError> {
        match self.credential_policy {
            CredentialPolicy::Lazy => Ok(()),
            CredentialPolicy::Eager => self
                .report
                .usable_api_key()
                .map(|_| ())
                .ok_or(ConfigError::MissingCredential),
        }
    }
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { var, source })
}

/// Keys copied straight from a `.env.example` are treated as absent.
pub fn is_placeholder(key: &str) -> bool {
    let key = key.trim().to_ascii_lowercase();
    key.is_empty()
        || key.contains("your_api_key")
        || key.contains("your-api-key")
        || key.starts_with("your_")
        || key == "changeme"
}
