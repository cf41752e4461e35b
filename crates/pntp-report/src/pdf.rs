//! PDF rendering of a [`ReportLayout`] with the standard Helvetica fonts.
//!
//! Pages are A4 portrait with 10 mm side and top margins and an automatic
//! page break 15 mm above the bottom edge. Long lines wrap on word
//! boundaries and at embedded line breaks.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};

use crate::ReportError;
use crate::layout::{Line, LineStyle, ReportLayout};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MM: f32 = 72.0 / 25.4;
const SIDE_MARGIN: f32 = 10.0 * MM;
const TOP_MARGIN: f32 = 10.0 * MM;
const BOTTOM_MARGIN: f32 = 15.0 * MM;

const REGULAR_FONT: &[u8] = b"F1";
const BOLD_FONT: &[u8] = b"F2";

/// Font, size and row height (mm) for each line style.
struct TextStyle {
    font: &'static [u8],
    size: f32,
    row_height_mm: f32,
}

fn text_style(style: LineStyle) -> TextStyle {
    let (font, size, row_height_mm) = match style {
        LineStyle::Title => (BOLD_FONT, 16.0, 10.0),
        LineStyle::Subtitle => (REGULAR_FONT, 12.0, 10.0),
        LineStyle::Topic => (BOLD_FONT, 13.0, 10.0),
        LineStyle::Question => (REGULAR_FONT, 11.0, 8.0),
        LineStyle::Criterion => (REGULAR_FONT, 11.0, 7.0),
    };
    TextStyle {
        font,
        size,
        row_height_mm,
    }
}

/// Vertical gap (mm) inserted before a line, given the previous line's style.
fn gap_before(previous: Option<LineStyle>, current: LineStyle) -> f32 {
    match (previous, current) {
        (Some(LineStyle::Subtitle), _) => 5.0,
        (Some(LineStyle::Criterion), LineStyle::Question) => 2.0,
        (Some(LineStyle::Criterion), LineStyle::Topic) => 5.0,
        _ => 0.0,
    }
}

/// Approximate Helvetica advance width; bold runs slightly wider.
fn text_width(text: &str, style: &TextStyle) -> f32 {
    let factor = if style.font == BOLD_FONT { 0.56 } else { 0.52 };
    text.chars().count() as f32 * style.size * factor
}

/// Split `text` into rows no wider than `max_width`.
fn wrap(text: &str, style: &TextStyle, max_width: f32) -> Vec<String> {
    if text_width(text, style) <= max_width {
        return vec![text.to_string()];
    }

    let indent: String = text.chars().take_while(|c| *c == ' ').collect();
    let mut rows = Vec::new();
    let mut current = indent.clone();
    for word in text.split_whitespace() {
        let candidate = if current.trim().is_empty() {
            format!("{current}{word}")
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, style) <= max_width {
            current = candidate;
            continue;
        }
        if !current.trim().is_empty() {
            rows.push(std::mem::replace(&mut current, indent.clone()));
        }
        // A single word wider than the row is hard-broken.
        let mut piece = current.clone();
        for c in word.chars() {
            piece.push(c);
            if text_width(&piece, style) > max_width {
                piece.pop();
                rows.push(std::mem::replace(&mut piece, format!("{indent}{c}")));
            }
        }
        current = piece;
    }
    if !current.trim().is_empty() {
        rows.push(current);
    }
    rows
}

/// Map text to WinAnsiEncoding bytes. Latin-1 maps directly, the 0x80-0x9F
/// block uses the WinAnsi table, anything else becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7E => code as u8,
            code @ 0xA0..=0xFF => code as u8,
            _ => win_ansi_upper(c).unwrap_or(b'?'),
        })
        .collect()
}

fn win_ansi_upper(c: char) -> Option<u8> {
    let code = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(code)
}

/// Rows for one logical line: explicit line breaks first, then word
/// wrapping. Rows after a break keep the line's indent.
fn rows(text: &str, style: &TextStyle, max_width: f32) -> Vec<String> {
    let indent: String = text.chars().take_while(|c| *c == ' ').collect();
    text.split('\n')
        .enumerate()
        .flat_map(|(i, segment)| {
            let segment = segment.trim_end_matches('\r');
            let segment = if i == 0 {
                segment.to_string()
            } else {
                format!("{indent}{}", segment.trim_start())
            };
            wrap(&segment, style, max_width)
        })
        .collect()
}

/// Lays rows onto pages, starting a new page when the bottom margin is hit.
struct Paginator {
    pages: Vec<Vec<Operation>>,
    cursor: f32,
}

impl Paginator {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor: PAGE_HEIGHT - TOP_MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = PAGE_HEIGHT - TOP_MARGIN;
    }

    fn skip(&mut self, mm: f32) {
        self.cursor -= mm * MM;
    }

    fn row(&mut self, text: &str, style: &TextStyle) {
        let height = style.row_height_mm * MM;
        if self.cursor - height < BOTTOM_MARGIN {
            self.new_page();
        }
        // Baseline vertically centred in the row.
        let baseline = self.cursor - height / 2.0 - 0.3 * style.size;
        if let Some(ops) = self.pages.last_mut() {
            ops.extend([
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(style.font.to_vec()), Object::Real(style.size)],
                ),
                Operation::new(
                    "Td",
                    vec![Object::Real(SIDE_MARGIN), Object::Real(baseline)],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(win_ansi(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
        self.cursor -= height;
    }
}

fn lay_out_pages(layout: &ReportLayout) -> Vec<Vec<Operation>> {
    let max_width = PAGE_WIDTH - 2.0 * SIDE_MARGIN;
    let mut paginator = Paginator::new();
    let mut previous = None;
    for Line { style, text } in &layout.lines {
        paginator.skip(gap_before(previous, *style));
        let text_style = text_style(*style);
        for row in rows(text, &text_style, max_width) {
            paginator.row(&row, &text_style);
        }
        previous = Some(*style);
    }
    paginator.pages
}

fn font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Render the layout into PDF bytes.
pub fn render_pdf(layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids = Vec::new();
    for operations in lay_out_pages(layout) {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| ReportError::Pdf(format!("encoding page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(PAGE_WIDTH),
            Object::Real(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ReportError::Pdf(format!("writing document: {e}")))?;
    Ok(buffer)
}
