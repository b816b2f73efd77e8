//! Text extraction from uploaded lecture material.
//!
//! Each supported format implements [`Extractor`]. Extractors are registered in an
//! [`ExtractorRegistry`] at startup; a recognized format without a registered extractor is a
//! server configuration problem rather than a client error.

mod docx;
mod ooxml;
mod pdf;
mod pptx;
mod text;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use pptx::PptxExtractor;
pub use text::PlainTextExtractor;

use crate::ingress::UploadedFile;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Placeholder used when a file yields no text, so every upload stays represented.
pub const EMPTY_TEXT_PLACEHOLDER: &str = "No extractable text found.";

/// Errors raised while classifying or extracting uploads.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Filename suffix is not one of the supported formats.
    #[error("Unsupported file type: {name}")]
    UnsupportedType {
        /// Sanitized filename.
        name: String,
    },
    /// The format is recognized but no extractor was registered for it.
    #[error("{format} support missing on this server")]
    MissingCapability {
        /// Format lacking an extractor.
        format: DocumentFormat,
    },
    /// The file could not be parsed as its declared format.
    #[error("Could not read {name}: {reason}")]
    Unreadable {
        /// Sanitized filename.
        name: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Parser-level failure, attached to a filename by the registry.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseFailure(pub String);

impl ParseFailure {
    pub(crate) fn new(reason: impl fmt::Display) -> Self {
        Self(reason.to_string())
    }
}

/// Formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Word-processor document (Office Open XML).
    Docx,
    /// Slide deck (Office Open XML).
    Pptx,
    /// Plain text or markdown.
    PlainText,
}

impl DocumentFormat {
    /// Detect the format from a filename suffix, case-insensitively.
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".docx") {
            Some(Self::Docx)
        } else if lower.ends_with(".pptx") {
            Some(Self::Pptx)
        } else if lower.ends_with(".txt") || lower.ends_with(".md") {
            Some(Self::PlainText)
        } else {
            None
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Pptx => "PPTX",
            Self::PlainText => "Plain text",
        };
        f.write_str(label)
    }
}

/// Format-specific text extractor.
pub trait Extractor: Send + Sync {
    /// The format this extractor handles.
    fn format(&self) -> DocumentFormat;

    /// Pull plain text out of raw file bytes. An empty string means "no text".
    fn extract(&self, data: &[u8]) -> Result<String, ParseFailure>;
}

/// Text pulled from one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Sanitized name of the originating file.
    pub source_name: String,
    /// Extracted text; never empty.
    pub text: String,
}

/// Ordered extraction results for a whole request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBundle {
    /// One entry per upload, in upload order.
    pub documents: Vec<ExtractedDocument>,
}

impl SourceBundle {
    /// Concatenate all documents into labeled blocks separated by a blank line.
    pub fn render(&self) -> String {
        self.documents
            .iter()
            .map(|doc| format!("=== File: {} ===\n{}", doc.source_name, doc.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Table of extractors keyed by format, populated once at startup.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<DocumentFormat, Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in extractor.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PdfExtractor));
        registry.register(Box::new(DocxExtractor));
        registry.register(Box::new(PptxExtractor));
        registry.register(Box::new(PlainTextExtractor));
        registry
    }

    /// Register (or replace) the extractor for its format.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.insert(extractor.format(), extractor);
    }

    /// Formats with a registered extractor.
    pub fn supports(&self, format: DocumentFormat) -> bool {
        self.extractors.contains_key(&format)
    }

    /// Resolve the extractor for a filename.
    pub fn resolve(&self, name: &str) -> Result<&dyn Extractor, ExtractError> {
        let format = DocumentFormat::from_filename(name).ok_or_else(|| {
            ExtractError::UnsupportedType {
                name: name.to_string(),
            }
        })?;
        self.extractors
            .get(&format)
            .map(Box::as_ref)
            .ok_or(ExtractError::MissingCapability { format })
    }

    /// Extract a single upload, substituting the placeholder for empty results.
    pub fn extract(&self, file: &UploadedFile) -> Result<ExtractedDocument, ExtractError> {
        let extractor = self.resolve(&file.name)?;
        let text = extractor
            .extract(&file.bytes)
            .map_err(|failure| ExtractError::Unreadable {
                name: file.name.clone(),
                reason: failure.0,
            })?;
        let text = text.trim();
        tracing::debug!(
            file = %file.name,
            format = %extractor.format(),
            bytes = file.bytes.len(),
            chars = text.chars().count(),
            "Extracted text"
        );
        let text = if text.is_empty() {
            EMPTY_TEXT_PLACEHOLDER.to_string()
        } else {
            text.to_string()
        };
        Ok(ExtractedDocument {
            source_name: file.name.clone(),
            text,
        })
    }

    /// Extract every upload in order.
    ///
    /// All files are classified before any is parsed, so an unsupported or unavailable
    /// format fails the request without wasted work.
    pub fn extract_all(&self, files: &[UploadedFile]) -> Result<SourceBundle, ExtractError> {
        for file in files {
            self.resolve(&file.name)?;
        }
        let documents = files
            .iter()
            .map(|file| self.extract(file))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SourceBundle { documents })
    }
}
