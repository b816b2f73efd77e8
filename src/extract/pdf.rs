//! PDF text extraction backed by `lopdf`.

use super::{DocumentFormat, Extractor, ParseFailure};
use lopdf::Document;

/// Extracts page text in page order; blank pages are dropped.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn extract(&self, data: &[u8]) -> Result<String, ParseFailure> {
        let document = Document::load_mem(data).map_err(ParseFailure::new)?;
        let mut pages = Vec::new();

        for page_number in document.get_pages().into_keys() {
            match document.extract_text(&[page_number]) {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        pages.push(text.to_string());
                    }
                }
                Err(error) => {
                    // Odd font encodings are common in slide exports; keep the readable pages.
                    tracing::warn!(page = page_number, error = %error, "Skipping undecodable PDF page");
                }
            }
        }

        Ok(pages.join("\n\n"))
    }
}
