//! Minimal WordprocessingML writer.
//!
//! Emits a fixed set of parts (content types, relationships, styles, numbering, document) into
//! a ZIP container with pinned timestamps. Headings map to `Heading1..3`, bullets to a bullet
//! list, numbered items to a decimal list that restarts after every heading.

use super::{Block, RenderError};
use crate::package::fixed_entry_options;
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::ZipWriter;

const BULLET_NUM_ID: u32 = 1;
const FIRST_DECIMAL_NUM_ID: u32 = 2;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="264" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="360" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:color w:val="1F3864"/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="28"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="200" w:after="60"/><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:sz w:val="24"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="60"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="ListNumber"><w:name w:val="List Number"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="60"/></w:pPr></w:style></w:styles>"#;

const DOCUMENT_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

// A4 portrait with 2 cm margins, matching the PDF layout.
const DOCUMENT_CLOSE: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1134" w:right="1134" w:bottom="1134" w:left="1134" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

const NUMBERING_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum><w:abstractNum w:abstractNumId="1"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum>"#;

/// Render blocks into DOCX bytes.
pub fn render_docx(blocks: &[Block]) -> Result<Vec<u8>, RenderError> {
    let body = DocumentBody::build(blocks);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let parts: [(&str, &str); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("word/styles.xml", STYLES),
        ("word/numbering.xml", &body.numbering),
        ("word/document.xml", &body.document),
    ];
    for (name, content) in parts {
        writer.start_file(name, fixed_entry_options())?;
        writer.write_all(content.as_bytes())?;
    }
    Ok(writer.finish()?.into_inner())
}

/// The two parts that depend on the notes content.
struct DocumentBody {
    document: String,
    numbering: String,
}

impl DocumentBody {
    fn build(blocks: &[Block]) -> Self {
        let mut document = String::from(DOCUMENT_OPEN);
        let mut next_num_id = FIRST_DECIMAL_NUM_ID;
        let mut active_list: Option<u32> = None;

        for block in blocks {
            match block {
                Block::Heading { level, text } => {
                    active_list = None;
                    push_paragraph(&mut document, &format!("Heading{level}"), None, text);
                }
                Block::Bullet(text) => {
                    push_paragraph(&mut document, "ListBullet", Some(BULLET_NUM_ID), text);
                }
                Block::Numbered { text, .. } => {
                    let num_id = *active_list.get_or_insert_with(|| {
                        let id = next_num_id;
                        next_num_id += 1;
                        id
                    });
                    push_paragraph(&mut document, "ListNumber", Some(num_id), text);
                }
                Block::Plain(text) => push_paragraph(&mut document, "Normal", None, text),
            }
        }
        document.push_str(DOCUMENT_CLOSE);

        let mut numbering = String::from(NUMBERING_OPEN);
        let _ = write!(
            numbering,
            r#"<w:num w:numId="{BULLET_NUM_ID}"><w:abstractNumId w:val="0"/></w:num>"#
        );
        for num_id in FIRST_DECIMAL_NUM_ID..next_num_id {
            let _ = write!(
                numbering,
                r#"<w:num w:numId="{num_id}"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="1"/></w:lvlOverride></w:num>"#
            );
        }
        numbering.push_str("</w:numbering>");

        Self {
            document,
            numbering,
        }
    }
}

fn push_paragraph(out: &mut String, style: &str, num_id: Option<u32>, text: &str) {
    out.push_str("<w:p><w:pPr>");
    let _ = write!(out, r#"<w:pStyle w:val="{style}"/>"#);
    if let Some(num_id) = num_id {
        let _ = write!(
            out,
            r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="{num_id}"/></w:numPr>"#
        );
    }
    out.push_str("</w:pPr>");
    let cleaned = strip_invalid_xml_chars(text);
    if !cleaned.is_empty() {
        let _ = write!(
            out,
            r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#,
            escape(cleaned.as_str())
        );
    }
    out.push_str("</w:p>");
}

/// XML 1.0 forbids most C0 control characters; model output occasionally contains them.
fn strip_invalid_xml_chars(text: &str) -> String {
    text.chars()
        .filter(|ch| matches!(ch, '\t' | '\n' | '\r') || !ch.is_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::parse_blocks;
    use quick_xml::Reader;
    use quick_xml::events::Event;
    use std::io::Read;

    fn read_part(docx: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(docx)).expect("zip");
        let mut xml = String::new();
        archive
            .by_name(name)
            .expect("part")
            .read_to_string(&mut xml)
            .expect("utf8");
        xml
    }

    /// (style, numId, text) per paragraph.
    fn paragraphs(docx: &[u8]) -> Vec<(String, Option<String>, String)> {
        let xml = read_part(docx, "word/document.xml");
        let mut reader = Reader::from_str(&xml);
        let mut out = Vec::new();
        let mut style = String::new();
        let mut num_id = None;
        let mut text = String::new();
        loop {
            match reader.read_event().expect("event") {
                Event::Start(e) if e.local_name().as_ref() == b"p" => {
                    style.clear();
                    num_id = None;
                    text.clear();
                }
                Event::Empty(e) if e.local_name().as_ref() == b"pStyle" => {
                    let attr = e.try_get_attribute("w:val").unwrap().unwrap();
                    style = attr.unescape_value().unwrap().into_owned();
                }
                Event::Empty(e) if e.local_name().as_ref() == b"numId" => {
                    let attr = e.try_get_attribute("w:val").unwrap().unwrap();
                    num_id = Some(attr.unescape_value().unwrap().into_owned());
                }
                Event::Text(t) => text.push_str(&t.unescape().unwrap()),
                Event::End(e) if e.local_name().as_ref() == b"p" => {
                    out.push((style.clone(), num_id.clone(), text.clone()));
                }
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn paragraphs_keep_order_and_styles() {
        let blocks = parse_blocks("## Title\n- item one\n1. step one\nplain line");
        let docx = render_docx(&blocks).expect("docx");
        assert_eq!(
            paragraphs(&docx),
            vec![
                ("Heading2".into(), None, "Title".into()),
                ("ListBullet".into(), Some("1".into()), "item one".into()),
                ("ListNumber".into(), Some("2".into()), "step one".into()),
                ("Normal".into(), None, "plain line".into()),
            ]
        );
    }

    #[test]
    fn numbered_lists_restart_after_headings() {
        let blocks = parse_blocks("# A\n1. a\n2. b\n- aside\n3. c\n# B\n1. d");
        let docx = render_docx(&blocks).expect("docx");
        let ids: Vec<Option<String>> = paragraphs(&docx)
            .into_iter()
            .filter(|(style, _, _)| style == "ListNumber")
            .map(|(_, id, _)| id)
            .collect();
        assert_eq!(
            ids,
            vec![
                Some("2".into()),
                Some("2".into()),
                Some("2".into()),
                Some("3".into())
            ]
        );
        let numbering = read_part(&docx, "word/numbering.xml");
        assert!(numbering.contains(r#"w:numId="3""#));
        assert!(!numbering.contains(r#"w:numId="4""#));
    }

    #[test]
    fn text_is_escaped_and_sanitized() {
        let blocks = vec![Block::Plain("A < B & \"C\"\u{1}".into())];
        let docx = render_docx(&blocks).expect("docx");
        let paragraphs = paragraphs(&docx);
        assert_eq!(paragraphs[0].2, "A < B & \"C\"");
    }

    #[test]
    fn package_contains_required_parts() {
        let docx = render_docx(&[]).expect("docx");
        let archive = zip::ZipArchive::new(Cursor::new(docx.as_slice())).expect("zip");
        let names: Vec<&str> = archive.file_names().collect();
        for required in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/numbering.xml",
        ] {
            assert!(names.contains(&required), "missing {required}");
        }
    }
}
