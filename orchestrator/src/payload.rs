use shared::{ImagePayload, PayloadError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Skipping non-image file: {0}")]
    UnknownFormat(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Builds a payload from raw bytes, taking the media type from the content
/// rather than trusting a file extension.
pub fn sniff_image(bytes: Vec<u8>) -> Result<ImagePayload, ImageLoadError> {
    if bytes.is_empty() {
        return Err(PayloadError::EmptyImage.into());
    }
    let format = image::guess_format(&bytes)
        .map_err(|_| ImageLoadError::UnknownFormat("unrecognised image data".to_string()))?;

    Ok(ImagePayload::new(bytes, format.to_mime_type())?)
}

pub fn read_image(path: impl AsRef<Path>) -> Result<ImagePayload, ImageLoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ImageLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let payload = sniff_image(bytes).map_err(|err| match err {
        ImageLoadError::UnknownFormat(_) => {
            ImageLoadError::UnknownFormat(path.display().to_string())
        }
        other => other,
    })?;

    Ok(match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => payload.with_file_name(name),
        None => payload,
    })
}
