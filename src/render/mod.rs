//! Markdown notes → DOCX and PDF.
//!
//! Lines are classified once into [`Block`]s and both writers consume the same blocks, so the
//! two documents always agree on what is a heading, a list item, or a paragraph. Neither
//! writer embeds timestamps or random identifiers: identical markdown yields identical bytes.

mod docx;
mod pdf;

pub use docx::render_docx;
pub use pdf::render_pdf;

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+").expect("valid numbered-list regex"));

const MAX_HEADING_LEVEL: u8 = 3;

/// Errors raised while producing the output documents.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The DOCX container could not be written.
    #[error("DOCX packaging failed: {0}")]
    Docx(#[from] zip::result::ZipError),
    /// The PDF document could not be assembled or serialized.
    #[error("PDF generation failed: {0}")]
    Pdf(#[from] lopdf::Error),
    /// Writing to the in-memory buffer failed.
    #[error("I/O error while rendering: {0}")]
    Io(#[from] std::io::Error),
}

/// One classified line of the notes markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `#`, `##`, `###` (deeper levels clamp to 3).
    Heading {
        /// Heading depth, 1..=3.
        level: u8,
        /// Heading text without markers.
        text: String,
    },
    /// `-` or `*` list item, marker removed.
    Bullet(String),
    /// `N.` list item, marker removed.
    Numbered {
        /// The digits of the original marker.
        marker: String,
        /// Item text without the marker.
        text: String,
    },
    /// Anything else.
    Plain(String),
}

/// Both rendered documents for one set of notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifacts {
    /// Word-processor document.
    pub docx: Vec<u8>,
    /// Paginated PDF.
    pub pdf: Vec<u8>,
}

/// Classify a single line; blank lines (and headings without text) yield `None`.
pub fn classify_line(line: &str) -> Option<Block> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(block) = classify_heading(line) {
        return block;
    }

    if let Some(rest) = line.strip_prefix(['-', '*']) {
        return Some(Block::Bullet(rest.trim().to_string()));
    }

    if let Some(captures) = NUMBERED_MARKER.captures(line) {
        let whole = captures.get(0).map_or(0, |m| m.end());
        let marker = captures
            .get(1)
            .map_or_else(String::new, |m| m.as_str().to_string());
        return Some(Block::Numbered {
            marker,
            text: line[whole..].trim().to_string(),
        });
    }

    Some(Block::Plain(line.to_string()))
}

/// Outer `None`: not a heading. Inner `None`: a heading marker with no text, which is dropped.
fn classify_heading(line: &str) -> Option<Option<Block>> {
    let hashes = line.chars().take_while(|ch| *ch == '#').count();
    if hashes == 0 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    if text.is_empty() {
        return Some(None);
    }
    let level = u8::try_from(hashes)
        .unwrap_or(MAX_HEADING_LEVEL)
        .min(MAX_HEADING_LEVEL);
    Some(Some(Block::Heading {
        level,
        text: text.to_string(),
    }))
}

/// Classify every line of a markdown document, dropping blank lines.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    markdown.lines().filter_map(classify_line).collect()
}

/// Render both documents from the same block list.
pub fn render(markdown: &str) -> Result<RenderedArtifacts, RenderError> {
    let blocks = parse_blocks(markdown);
    tracing::debug!(blocks = blocks.len(), "Rendering notes");
    Ok(RenderedArtifacts {
        docx: render_docx(&blocks)?,
        pdf: render_pdf(&blocks)?,
    })
}
