use super::ooxml::{Package, join_non_empty, paragraph_texts};
use super::{DocumentFormat, Extractor, ParseFailure};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extracts paragraph text from `word/document.xml`.
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn extract(&self, data: &[u8]) -> Result<String, ParseFailure> {
        let mut package = Package::open(data)?;
        let xml = package.required_part(DOCUMENT_PART)?;
        let paragraphs = paragraph_texts(&xml)?;
        Ok(join_non_empty(&paragraphs))
    }
}
