use super::{DocumentFormat, Extractor, ParseFailure};

/// Plain text and markdown: UTF-8 with undecodable bytes dropped.
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::PlainText
    }

    fn extract(&self, data: &[u8]) -> Result<String, ParseFailure> {
        let text: String = data.utf8_chunks().map(|chunk| chunk.valid()).collect();
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_invalid_bytes() {
        let mut data = b"  Dose: 5".to_vec();
        data.push(0xFF);
        data.extend_from_slice(b"mg \n");
        let text = PlainTextExtractor.extract(&data).expect("text");
        assert_eq!(text, "Dose: 5mg");
    }

    #[test]
    fn keeps_encoded_replacement_characters_and_bom() {
        let data = "\u{feff}Dose: \u{fffd} mg".as_bytes();
        let text = PlainTextExtractor.extract(data).expect("text");
        assert_eq!(text, "\u{feff}Dose: \u{fffd} mg");
    }

    #[test]
    fn keeps_multibyte_characters() {
        let text = PlainTextExtractor
            .extract("β-lactam → cell wall".as_bytes())
            .expect("text");
        assert_eq!(text, "β-lactam → cell wall");
    }
}
