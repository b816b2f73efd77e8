//! Paginated PDF writer built directly on `lopdf` objects.

use super::{Block, RenderError};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
/// 2 cm in points.
const MARGIN: f32 = 56.693;
const LINE_HEIGHT: f32 = 14.0;
const BLOCK_GAP: f32 = 4.0;
const WRAP_CHARS: usize = 95;

const BODY_FONT: &str = "F1";
const HEADING_FONT: &str = "F2";
const BODY_SIZE: f32 = 11.0;
const HEADING_SIZE: f32 = 13.0;

/// Render blocks into PDF bytes. Always produces at least one page.
pub fn render_pdf(blocks: &[Block]) -> Result<Vec<u8>, RenderError> {
    let mut layout = Layout::new();
    for block in blocks {
        layout.draw_block(block);
    }
    let pages = layout.finish();

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let body_font = document.add_object(type1_font("Helvetica"));
    let heading_font = document.add_object(type1_font("Helvetica-Bold"));
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! {
            BODY_FONT => body_font,
            HEADING_FONT => heading_font,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }.encode()?;
        let content_id = document.add_object(Stream::new(Dictionary::new(), content));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id: ObjectId = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
    document.compress();

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}

fn type1_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Top-down cursor that breaks pages when a line would cross the bottom margin.
struct Layout {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    cursor_y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor_y: PAGE_HEIGHT as f32 - MARGIN,
        }
    }

    fn draw_block(&mut self, block: &Block) {
        let (font, size, label) = match block {
            Block::Heading { text, .. } => (HEADING_FONT, HEADING_SIZE, text.clone()),
            Block::Bullet(text) => (BODY_FONT, BODY_SIZE, format!("• {text}")),
            Block::Numbered { marker, text } => (BODY_FONT, BODY_SIZE, format!("{marker}. {text}")),
            Block::Plain(text) => (BODY_FONT, BODY_SIZE, text.clone()),
        };

        for chunk in wrap(&label) {
            if self.cursor_y < MARGIN {
                self.break_page();
            }
            self.draw_text(font, size, &chunk);
            self.cursor_y -= LINE_HEIGHT;
        }
        self.cursor_y -= BLOCK_GAP;
    }

    fn draw_text(&mut self, font: &str, size: f32, text: &str) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]),
            Operation::new("Td", vec![MARGIN.into(), self.cursor_y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(win_ansi_bytes(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor_y = PAGE_HEIGHT as f32 - MARGIN;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.current);
        self.pages
    }
}

/// Fixed-width chunks; an empty label still occupies one line.
fn wrap(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(WRAP_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Encode for the standard fonts' WinAnsi encoding; anything else becomes `?`.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            ' '..='~' | '\u{a0}'..='\u{ff}' => ch as u8,
            '\t' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8a,
            '‹' => 0x8b,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9a,
            '›' => 0x9b,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            _ => b'?',
        })
        .collect()
}
