//! Shared plumbing for Office Open XML packages (DOCX, PPTX).
//!
//! Both formats are ZIP containers of XML parts. Text lives in `t` elements grouped into `p`
//! paragraphs; element prefixes differ (`w:` vs `a:`) so matching is done on local names.

use super::ParseFailure;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

/// Ceiling on a single decompressed part; guards against compression bombs.
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

/// An opened OOXML container.
pub(super) struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    pub(super) fn open(data: &'a [u8]) -> Result<Self, ParseFailure> {
        let archive = ZipArchive::new(Cursor::new(data))
            .map_err(|error| ParseFailure::new(format!("not an Office document: {error}")))?;
        Ok(Self { archive })
    }

    /// Read a part as UTF-8, returning `None` when it does not exist.
    pub(super) fn part(&mut self, name: &str) -> Result<Option<String>, ParseFailure> {
        let file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(error) => return Err(ParseFailure::new(format!("{name}: {error}"))),
        };
        let mut xml = String::new();
        let read = file
            .take(MAX_PART_BYTES + 1)
            .read_to_string(&mut xml)
            .map_err(|error| ParseFailure::new(format!("{name}: {error}")))?;
        if read as u64 > MAX_PART_BYTES {
            return Err(ParseFailure::new(format!("{name} exceeds the part size limit")));
        }
        Ok(Some(xml))
    }

    /// Read a part that must exist.
    pub(super) fn required_part(&mut self, name: &str) -> Result<String, ParseFailure> {
        self.part(name)?
            .ok_or_else(|| ParseFailure::new(format!("missing {name}")))
    }

    pub(super) fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }
}

/// Collect the text of every `p` paragraph in document order.
///
/// A paragraph nested inside another (text boxes) is listed after its parent, which keeps the
/// text on both sides of it. `mc:Fallback` content repeats the chosen alternative and is skipped.
pub(super) fn paragraph_texts(xml: &str) -> Result<Vec<String>, ParseFailure> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(ParseFailure::new)?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }
        match event {
            Event::Start(element) => match element.local_name().as_ref() {
                b"p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"t" => in_text = true,
                b"Fallback" => skip_depth = 1,
                _ => {}
            },
            Event::Empty(element) => {
                if let Some(&index) = open.last() {
                    push_inline_break(&element, &mut paragraphs[index]);
                }
            }
            Event::Text(text) if in_text => {
                if let Some(&index) = open.last() {
                    paragraphs[index].push_str(&text.unescape().map_err(ParseFailure::new)?);
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"p" => {
                    open.pop();
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Trim paragraphs and join the non-empty ones with newlines.
pub(super) fn join_non_empty(paragraphs: &[String]) -> String {
    paragraphs
        .iter()
        .map(|paragraph| paragraph.trim())
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a `.rels` part into relationship id → (type, target).
pub(super) fn relationships(xml: &str) -> Result<HashMap<String, Relationship>, ParseFailure> {
    let mut reader = Reader::from_str(xml);
    let mut map = HashMap::new();

    loop {
        match reader.read_event().map_err(ParseFailure::new)? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"Relationship" =>
            {
                let id = attribute(&element, b"Id")?;
                let target = attribute(&element, b"Target")?;
                let kind = attribute(&element, b"Type")?.unwrap_or_default();
                if let (Some(id), Some(target)) = (id, target) {
                    map.insert(id, Relationship { kind, target });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(map)
}

/// One entry of a relationships part.
#[derive(Debug, Clone)]
pub(super) struct Relationship {
    pub(super) kind: String,
    pub(super) target: String,
}

/// Read an attribute by local name (`r:id` matches `id`).
pub(super) fn attribute(
    element: &BytesStart<'_>,
    local: &[u8],
) -> Result<Option<String>, ParseFailure> {
    for attr in element.attributes() {
        let attr = attr.map_err(ParseFailure::new)?;
        if attr.key.local_name().as_ref() == local {
            let value = attr.unescape_value().map_err(ParseFailure::new)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Resolve a relationship target relative to the directory of its source part.
pub(super) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn push_inline_break(element: &BytesStart<'_>, paragraph: &mut String) {
    match element.local_name().as_ref() {
        b"tab" => paragraph.push('\t'),
        b"br" | b"cr" => paragraph.push('\n'),
        _ => {}
    }
}
