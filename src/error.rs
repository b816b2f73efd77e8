//! Request-level error taxonomy shared by the HTTP surface and the pipeline.

use crate::extract::ExtractError;
use crate::package::PackageError;
use crate::render::RenderError;
use crate::summarization::CompletionClientError;
use axum::http::StatusCode;
use thiserror::Error;

/// Every way a `/make-notes` request can fail.
///
/// Any variant aborts the whole request; no partial archive is ever returned.
#[derive(Debug, Error)]
pub enum NotesError {
    /// Shared secret header missing or wrong.
    #[error("Unauthorized")]
    Unauthorized,
    /// Request carried no file parts.
    #[error("No files uploaded")]
    NoFiles,
    /// More file parts than the configured maximum.
    #[error("Too many files (max {max})")]
    TooManyFiles {
        /// Configured file count ceiling.
        max: usize,
    },
    /// A single file exceeded the per-file ceiling.
    #[error("{name} too large (> {max_mb}MB)")]
    FileTooLarge {
        /// Sanitized name of the offending file.
        name: String,
        /// Configured per-file ceiling in MiB.
        max_mb: u64,
    },
    /// The upload set exceeded the aggregate ceiling.
    #[error("Total upload too large (> {max_mb}MB)")]
    TotalTooLarge {
        /// Configured aggregate ceiling in MiB.
        max_mb: u64,
    },
    /// The multipart body itself could not be parsed.
    #[error("Invalid upload: {message}")]
    Multipart {
        /// Status chosen by the multipart parser (400 or 413).
        status: StatusCode,
        /// Parser diagnostic.
        message: String,
    },
    /// Extraction failed or the format is not supported.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// No completion credential was configured.
    #[error("OPENAI_API_KEY not set")]
    MissingCredential,
    /// The completion service could not produce notes.
    #[error("Completion service failed: {0}")]
    Completion(#[from] CompletionClientError),
    /// The completion service answered with blank content.
    #[error("AI returned empty notes")]
    EmptyNotes,
    /// Rendering the notes into DOCX or PDF failed.
    #[error("Failed to render notes: {0}")]
    Render(#[from] RenderError),
    /// Building the output archive failed.
    #[error("Failed to package notes: {0}")]
    Package(#[from] PackageError),
    /// A blocking pipeline stage panicked or was cancelled.
    #[error("Pipeline worker failed: {0}")]
    Worker(String),
}

impl NotesError {
    /// HTTP status reported to the caller for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NoFiles | Self::TooManyFiles { .. } => StatusCode::BAD_REQUEST,
            Self::FileTooLarge { .. } | Self::TotalTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Multipart { status, .. } => *status,
            Self::Extract(error) => match error {
                ExtractError::MissingCapability { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                ExtractError::UnsupportedType { .. } | ExtractError::Unreadable { .. } => {
                    StatusCode::BAD_REQUEST
                }
            },
            Self::Completion(CompletionClientError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Completion(_) => StatusCode::BAD_GATEWAY,
            Self::MissingCredential
            | Self::EmptyNotes
            | Self::Render(_)
            | Self::Package(_)
            | Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
