use thiserror::Error;

use crate::api::{ApiError, FileKind};

/// Faults raised by the orchestration layer itself, plus the service faults
/// it passes through unchanged.
#[derive(Debug, Error)]
pub enum CrossCheckError {
    #[error("No files uploaded for analysis.")]
    NoFiles,

    #[error("Unsupported {kind} file: {filename} (expected one of: {expected})")]
    UnsupportedFile {
        kind: FileKind,
        filename: String,
        expected: String,
    },

    #[error("No analysis job is active.")]
    NoActiveJob,

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CrossCheckError {
    pub fn unsupported_file(kind: FileKind, filename: &str) -> Self {
        let expected = kind
            .extensions()
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(", ");
        CrossCheckError::UnsupportedFile {
            kind,
            filename: filename.to_string(),
            expected,
        }
    }
}
