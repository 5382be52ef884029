//! File Ingestor
//!
//! Reads an uploaded pipeline definition from a chunk stream, enforcing the
//! size limit while reading, and derives the display name of the upload.

use std::path::Path;

use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

/// Longest accepted pipeline or version name, in bytes
pub const MAX_NAME_LENGTH: usize = 100;

/// Artifact encodings accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Yaml,
    Json,
}

impl ArtifactFormat {
    /// Format implied by the file extension, case-insensitively
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_ascii_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Some(ArtifactFormat::Yaml),
            "json" => Some(ArtifactFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file '{0}' has an unsupported extension, expected .yaml, .yml or .json")]
    UnsupportedExtension(String),

    #[error("file exceeds the maximum size of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("file is empty")]
    Empty,

    #[error("failed to read file: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("file is not valid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("file is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("name is too long, maximum length is {} bytes", MAX_NAME_LENGTH)]
    NameTooLong,

    #[error("'{0}' has an invalid URL escape")]
    InvalidEscape(String),
}

/// Read at most `max_bytes` from `stream`, failing as soon as the stream
/// yields more
pub async fn read_pipeline_file<S, E>(
    file_name: &str,
    stream: S,
    max_bytes: usize,
) -> Result<Vec<u8>, IngestError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let format = ArtifactFormat::from_file_name(file_name)
        .ok_or_else(|| IngestError::UnsupportedExtension(file_name.to_string()))?;

    let mut stream = std::pin::pin!(stream);
    let mut data = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| IngestError::Read(Box::new(e)))?;
        if data.len() + chunk.len() > max_bytes {
            return Err(IngestError::PayloadTooLarge { limit: max_bytes });
        }
        data.extend_from_slice(&chunk);
    }

    if data.is_empty() {
        return Err(IngestError::Empty);
    }

    match format {
        ArtifactFormat::Yaml => {
            serde_yaml::from_slice::<serde_yaml::Value>(&data)?;
        }
        ArtifactFormat::Json => {
            serde_json::from_slice::<serde_json::Value>(&data)?;
        }
    }

    tracing::debug!("Read pipeline file '{}' ({} bytes)", file_name, data.len());

    Ok(data)
}

/// Decode a query value the way form decoding does: `+` is a space and every
/// `%` must start a two-digit hex escape
pub fn query_unescape(value: &str) -> Result<String, IngestError> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(IngestError::InvalidEscape(value.to_string()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    urlencoding::decode(&value.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .map_err(|_| IngestError::InvalidEscape(value.to_string()))
}

/// Display name of an upload: the unescaped `name` parameter, or the file
/// name when the parameter is absent or empty
pub fn pipeline_name(name_param: Option<&str>, file_name: &str) -> Result<String, IngestError> {
    let mut name = query_unescape(name_param.unwrap_or_default())?;
    if name.is_empty() {
        name = file_name.to_string();
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(IngestError::NameTooLong);
    }
    Ok(name)
}
