use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use strum_macros::{EnumIter, EnumString};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("image payload is empty")]
    EmptyImage,
    #[error("not an image media type: {0}")]
    NotAnImage(String),
}

/// Image bytes captured from user input, ready to be uploaded.
///
/// A value of this type is always non-empty and carries an `image/*` media
/// type, so the orchestrator never has to re-check its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    media_type: String,
    file_name: Option<String>,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Result<Self, PayloadError> {
        let media_type = media_type.into();
        if bytes.is_empty() {
            return Err(PayloadError::EmptyImage);
        }
        if !is_image_media_type(&media_type) {
            return Err(PayloadError::NotAnImage(media_type));
        }

        Ok(Self {
            bytes,
            media_type: media_type.to_ascii_lowercase(),
            file_name: None,
        })
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn is_image_media_type(media_type: &str) -> bool {
    let Some((kind, subtype)) = media_type.split_once('/') else {
        return false;
    };

    kind.eq_ignore_ascii_case("image")
        && !subtype.is_empty()
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Labels the brain MRI model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, strum_macros::Display)]
#[strum(ascii_case_insensitive)]
pub enum TumorClass {
    #[strum(to_string = "glioma_tumor", serialize = "glioma")]
    Glioma,
    #[strum(to_string = "meningioma_tumor", serialize = "meningioma")]
    Meningioma,
    #[strum(to_string = "no_tumor", serialize = "none", serialize = "no")]
    NoTumor,
    #[strum(to_string = "pituitary_tumor", serialize = "pituitary")]
    Pituitary,
}

impl TumorClass {
    pub fn display_name(&self) -> &'static str {
        match self {
            TumorClass::Glioma => "Glioma",
            TumorClass::Meningioma => "Meningioma",
            TumorClass::NoTumor => "No tumor",
            TumorClass::Pituitary => "Pituitary tumor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    pub extra: Map<String, Value>,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            extra: Map::new(),
        }
    }

    /// The label as a known class, if the service used one of ours.
    pub fn category(&self) -> Option<TumorClass> {
        TumorClass::from_str(self.label.trim()).ok()
    }

    pub fn display_label(&self) -> String {
        self.category()
            .map(|class| class.display_name().to_string())
            .unwrap_or_else(|| self.label.clone())
    }
}

/// Generated markdown report, tied to the label it was written for.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display(fmt = "{}", markdown)]
pub struct ReportText {
    pub label: String,
    pub markdown: String,
}

impl ReportText {
    pub fn new(label: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            markdown: markdown.into(),
        }
    }

    pub fn is_for(&self, classification: &ClassificationResult) -> bool {
        self.label == classification.label
    }
}

// Wire types of the classification service

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictResponse {
    pub predicted_class: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<PredictResponse> for ClassificationResult {
    fn from(response: PredictResponse) -> Self {
        Self {
            label: response.predicted_class,
            extra: response.extra,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorDetail {
    /// The `detail` field when the server sent a plain message.
    pub fn message(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn payload_rejects_empty_bytes() {
        assert_eq!(
            ImagePayload::new(Vec::new(), "image/jpeg"),
            Err(PayloadError::EmptyImage)
        );
    }

    #[test]
    fn payload_rejects_non_image_media_types() {
        for media_type in ["text/plain", "image/", "image", "application/json", "image/x y"] {
            assert!(
                matches!(
                    ImagePayload::new(vec![1, 2, 3], media_type),
                    Err(PayloadError::NotAnImage(_))
                ),
                "{media_type} should be rejected"
            );
        }
    }

    #[test]
    fn payload_keeps_bytes_and_normalises_media_type() {
        let payload = ImagePayload::new(vec![0xff, 0xd8, 0xff], "IMAGE/JPEG")
            .unwrap()
            .with_file_name("scan.jpg");
        assert_eq!(payload.bytes(), &[0xff, 0xd8, 0xff]);
        assert_eq!(payload.media_type(), "image/jpeg");
        assert_eq!(payload.file_name(), Some("scan.jpg"));
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn tumor_class_parses_model_labels_and_aliases() {
        assert_eq!(TumorClass::from_str("glioma_tumor"), Ok(TumorClass::Glioma));
        assert_eq!(TumorClass::from_str("Glioma"), Ok(TumorClass::Glioma));
        assert_eq!(TumorClass::from_str("no_tumor"), Ok(TumorClass::NoTumor));
        assert_eq!(TumorClass::from_str("pituitary"), Ok(TumorClass::Pituitary));
        assert!(TumorClass::from_str("astrocytoma").is_err());

        for class in TumorClass::iter() {
            assert_eq!(TumorClass::from_str(&class.to_string()), Ok(class));
        }
    }

    #[test]
    fn unknown_labels_are_kept_verbatim() {
        let result = ClassificationResult::new("astrocytoma");
        assert_eq!(result.category(), None);
        assert_eq!(result.display_label(), "astrocytoma");

        let known = ClassificationResult::new("meningioma_tumor");
        assert_eq!(known.display_label(), "Meningioma");
    }

    #[test]
    fn predict_response_keeps_auxiliary_fields() {
        let response: PredictResponse =
            serde_json::from_str(r#"{"predicted_class":"glioma","confidence":0.93}"#).unwrap();
        let result = ClassificationResult::from(response);
        assert_eq!(result.label, "glioma");
        assert_eq!(result.extra.get("confidence"), Some(&serde_json::json!(0.93)));
    }

    #[test]
    fn predict_response_requires_string_label() {
        assert!(serde_json::from_str::<PredictResponse>(r#"{"label":"glioma"}"#).is_err());
        assert!(serde_json::from_str::<PredictResponse>(r#"{"predicted_class":3}"#).is_err());
    }

    #[test]
    fn error_detail_only_uses_string_messages() {
        let detail: ErrorDetail = serde_json::from_str(r#"{"detail":"model unavailable"}"#).unwrap();
        assert_eq!(detail.message(), Some("model unavailable"));

        let validation: ErrorDetail =
            serde_json::from_str(r#"{"detail":[{"loc":["body","file"]}]}"#).unwrap();
        assert_eq!(validation.message(), None);

        let empty: ErrorDetail = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.message(), None);
    }

    #[test]
    fn report_text_is_keyed_to_its_label() {
        let report = ReportText::new("glioma", "## General Information\n...");
        assert!(report.is_for(&ClassificationResult::new("glioma")));
        assert!(!report.is_for(&ClassificationResult::new("no_tumor")));
        assert_eq!(report.to_string(), "## General Information\n...");
    }
}
