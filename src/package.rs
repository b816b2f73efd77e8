//! Bundling the rendered documents into the downloadable archive.

use crate::render::RenderedArtifacts;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Suggested download name for the archive.
pub const ARCHIVE_FILENAME: &str = "notes.zip";
/// Archive entry holding the word-processor document.
pub const DOCX_ENTRY: &str = "notes.docx";
/// Archive entry holding the PDF.
pub const PDF_ENTRY: &str = "notes.pdf";
/// MIME type of the archive.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Errors raised while writing the archive.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The ZIP writer rejected an entry.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// Writing entry bytes failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Deflated entry with a pinned 1980-01-01 timestamp and no extra fields.
pub(crate) fn fixed_entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
}

/// Write `notes.docx` then `notes.pdf` into an in-memory ZIP.
pub fn build_archive(artifacts: &RenderedArtifacts) -> Result<Vec<u8>, PackageError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in [(DOCX_ENTRY, &artifacts.docx), (PDF_ENTRY, &artifacts.pdf)] {
        writer.start_file(name, fixed_entry_options())?;
        writer.write_all(bytes)?;
    }
    let archive = writer.finish()?.into_inner();
    tracing::debug!(
        bytes = archive.len(),
        docx_bytes = artifacts.docx.len(),
        pdf_bytes = artifacts.pdf.len(),
        "Packaged notes archive"
    );
    Ok(archive)
}
