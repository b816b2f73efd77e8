//! Slide deck extraction: shape text per slide plus speaker notes.

use super::ooxml::{Package, Relationship, attribute, relationships, resolve_target};
use super::{DocumentFormat, Extractor, ParseFailure};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_PREFIX: &str = "ppt/slides/slide";
const NOTES_REL_SUFFIX: &str = "/notesSlide";
const NOTES_BODY_PLACEHOLDER: &str = "body";

/// Extracts slide text in presentation order, labeling each slide by its position.
pub struct PptxExtractor;

impl Extractor for PptxExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pptx
    }

    fn extract(&self, data: &[u8]) -> Result<String, ParseFailure> {
        let mut package = Package::open(data)?;
        let slides = slide_order(&mut package)?;
        if slides.is_empty() {
            tracing::debug!("Presentation has no slides");
        }

        let mut blocks = Vec::new();
        for (index, slide_path) in slides.iter().enumerate() {
            let Some(xml) = package.part(slide_path)? else {
                tracing::warn!(slide = %slide_path, "Slide part referenced but missing");
                continue;
            };
            let mut lines: Vec<String> = shape_texts(&xml)?
                .into_iter()
                .map(|shape| shape.text)
                .filter(|text| !text.is_empty())
                .collect();

            if let Some(notes) = speaker_notes(&mut package, slide_path)? {
                lines.push(format!("(Notes) {notes}"));
            }

            if !lines.is_empty() {
                blocks.push(format!("Slide {}:\n{}", index + 1, lines.join("\n")));
            }
        }

        Ok(blocks.join("\n\n"))
    }
}

/// Text of one shape with its placeholder role, if any.
#[derive(Debug, Default)]
struct ShapeText {
    placeholder: Option<String>,
    text: String,
}

/// Slide part paths in presentation order.
///
/// Uses the slide id list of `presentation.xml`; falls back to numeric `slideN.xml` order when
/// the presentation part or its relationships are absent.
fn slide_order(package: &mut Package<'_>) -> Result<Vec<String>, ParseFailure> {
    if let (Some(presentation), Some(rels)) = (
        package.part(PRESENTATION_PART)?,
        package.part(PRESENTATION_RELS)?,
    ) {
        let rels = relationships(&rels)?;
        let ordered = slide_ids(&presentation)?
            .into_iter()
            .filter_map(|rel_id| rels.get(&rel_id))
            .map(|rel| resolve_target("ppt", &rel.target))
            .collect::<Vec<_>>();
        if !ordered.is_empty() {
            return Ok(ordered);
        }
    }

    let mut numbered: Vec<(u32, String)> = package
        .part_names()
        .into_iter()
        .filter_map(|name| {
            let number = name
                .strip_prefix(SLIDE_PREFIX)?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name))
        })
        .collect();
    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

/// Relationship ids of `p:sldId` entries, in order.
fn slide_ids(xml: &str) -> Result<Vec<String>, ParseFailure> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event().map_err(ParseFailure::new)? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"sldId" =>
            {
                if let Some(id) = relationship_id(&element)? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// The namespaced `r:id` attribute; the bare `id` is the numeric slide id.
fn relationship_id(element: &BytesStart<'_>) -> Result<Option<String>, ParseFailure> {
    for attr in element.attributes() {
        let attr = attr.map_err(ParseFailure::new)?;
        if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
            let value = attr.unescape_value().map_err(ParseFailure::new)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Body placeholder text of the notes slide linked to `slide_path`, if any.
fn speaker_notes(
    package: &mut Package<'_>,
    slide_path: &str,
) -> Result<Option<String>, ParseFailure> {
    let (dir, file) = slide_path.rsplit_once('/').unwrap_or(("", slide_path));
    let rels_path = format!("{dir}/_rels/{file}.rels");
    let Some(rels) = package.part(&rels_path)? else {
        return Ok(None);
    };
    let rels: HashMap<String, Relationship> = relationships(&rels)?;
    let Some(notes_rel) = rels
        .values()
        .find(|rel| rel.kind.ends_with(NOTES_REL_SUFFIX))
    else {
        return Ok(None);
    };
    let notes_path = resolve_target(dir, &notes_rel.target);
    let Some(xml) = package.part(&notes_path)? else {
        return Ok(None);
    };

    let notes = shape_texts(&xml)?
        .into_iter()
        .filter(|shape| shape.placeholder.as_deref() == Some(NOTES_BODY_PLACEHOLDER))
        .map(|shape| shape.text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok((!notes.is_empty()).then_some(notes))
}

/// Text of every shape (`sp`) and table frame (`graphicFrame`) on a slide, in drawing order.
fn shape_texts(xml: &str) -> Result<Vec<ShapeText>, ParseFailure> {
    let mut reader = Reader::from_str(xml);
    let mut shapes = Vec::new();
    let mut shape: Option<ShapeText> = None;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut paragraph: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(ParseFailure::new)? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"sp" | b"graphicFrame" => {
                    shape = Some(ShapeText::default());
                    paragraphs.clear();
                }
                b"ph" => mark_placeholder(&element, shape.as_mut())?,
                b"p" if shape.is_some() => paragraph = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                b"ph" => mark_placeholder(&element, shape.as_mut())?,
                b"br" => {
                    if let Some(current) = paragraph.as_mut() {
                        current.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(text) if in_text => {
                if let Some(current) = paragraph.as_mut() {
                    current.push_str(&text.unescape().map_err(ParseFailure::new)?);
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(current) = paragraph.take() {
                        paragraphs.push(current);
                    }
                }
                b"sp" | b"graphicFrame" => {
                    if let Some(mut finished) = shape.take() {
                        finished.text = paragraphs.join("\n").trim().to_string();
                        shapes.push(finished);
                    }
                    paragraphs.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes)
}

fn mark_placeholder(
    element: &BytesStart<'_>,
    shape: Option<&mut ShapeText>,
) -> Result<(), ParseFailure> {
    if let Some(shape) = shape {
        shape.placeholder = Some(attribute(element, b"type")?.unwrap_or_else(|| "obj".into()));
    }
    Ok(())
}
