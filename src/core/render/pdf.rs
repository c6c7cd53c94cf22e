//! Minimal PDF 1.4 writer over the standard Helvetica fonts.
//!
//! Coordinates passed in are millimetres from the top-left corner of the page.
//! Text is encoded with WinAnsiEncoding; anything that encoding cannot carry is
//! replaced by [`PLACEHOLDER`], so any `&str` can be written.

use std::fmt::Write as _;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

pub const PLACEHOLDER: u8 = b'?';

const PT_PER_MM: f32 = 72.0 / 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    fn components(self) -> String {
        format!(
            "{:.3} {:.3} {:.3}",
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
}

// Glyph widths (1/1000 em) for bytes 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
        }
    }

    fn byte_width(self, byte: u8) -> u16 {
        let table = match self {
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
            Font::Regular | Font::Italic => &HELVETICA_WIDTHS,
        };
        match byte {
            32..=126 => table[(byte - 32) as usize],
            0x85 | 0x97 => 1000,
            0x95 => 350,
            0x91 | 0x92 => 278,
            0x93 | 0x94 => 500,
            0xC0..=0xDF => 722,
            _ => 556,
        }
    }

    /// Width of `text` in millimetres once encoded.
    pub fn text_width(self, text: &str, size_pt: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|b| self.byte_width(b) as u32)
            .sum();
        units as f32 / 1000.0 * size_pt / PT_PER_MM
    }
}

fn is_ignorable(c: char) -> bool {
    // Zero-width joiners and variation selectors ride along with emoji.
    matches!(c, '\u{200b}'..='\u{200f}' | '\u{fe00}'..='\u{fe0f}' | '\u{feff}')
        || (c.is_control() && c != '\t')
}

/// WinAnsi byte for `c`, if the encoding has one.
pub fn encode_char(c: char) -> Option<u8> {
    let byte = match c {
        '\t' => b' ',
        ' '..='~' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
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
    Some(byte)
}

pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !is_ignorable(*c))
        .map(|c| encode_char(c).unwrap_or(PLACEHOLDER))
        .collect()
}

fn escape_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(b as char);
            }
            32..=126 => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out.push(')');
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
    },
    StrokeRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
        line_width: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Rgb,
        line_width: f32,
    },
    /// `y` is the baseline.
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        color: Rgb,
        text: String,
    },
}

/// Draw operations for one page, in painting order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageCanvas {
    pub ops: Vec<DrawOp>,
}

impl PageCanvas {
    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    /// Inserts ops so they paint underneath everything pushed since `index`.
    pub fn insert_at(&mut self, index: usize, ops: Vec<DrawOp>) {
        let index = index.min(self.ops.len());
        self.ops.splice(index..index, ops);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    fn content_stream(&self) -> String {
        let mut out = String::new();
        for op in &self.ops {
            match op {
                DrawOp::FillRect { x, y, w, h, color } => {
                    let _ = writeln!(out, "{} rg", color.components());
                    let _ = writeln!(out, "{} re f", rect_pt(*x, *y, *w, *h));
                }
                DrawOp::StrokeRect {
                    x,
                    y,
                    w,
                    h,
                    color,
                    line_width,
                } => {
                    let _ = writeln!(out, "{} RG {:.2} w", color.components(), line_width * PT_PER_MM);
                    let _ = writeln!(out, "{} re S", rect_pt(*x, *y, *w, *h));
                }
                DrawOp::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    color,
                    line_width,
                } => {
                    let _ = writeln!(out, "{} RG {:.2} w", color.components(), line_width * PT_PER_MM);
                    let _ = writeln!(
                        out,
                        "{:.2} {:.2} m {:.2} {:.2} l S",
                        x1 * PT_PER_MM,
                        flip_y(*y1),
                        x2 * PT_PER_MM,
                        flip_y(*y2)
                    );
                }
                DrawOp::Text {
                    x,
                    y,
                    font,
                    size,
                    color,
                    text,
                } => {
                    let _ = writeln!(out, "BT /{} {:.1} Tf {} rg", font.resource(), size, color.components());
                    let _ = writeln!(out, "{:.2} {:.2} Td", x * PT_PER_MM, flip_y(*y));
                    let _ = writeln!(out, "{} Tj ET", escape_string(&encode_win_ansi(text)));
                }
            }
        }
        out
    }
}

fn flip_y(y_mm: f32) -> f32 {
    (PAGE_HEIGHT_MM - y_mm) * PT_PER_MM
}

fn rect_pt(x: f32, y: f32, w: f32, h: f32) -> String {
    format!(
        "{:.2} {:.2} {:.2} {:.2}",
        x * PT_PER_MM,
        flip_y(y + h),
        w * PT_PER_MM,
        h * PT_PER_MM
    )
}

#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: String,
    pub producer: String,
    /// `D:YYYYMMDDHHmmSS`
    pub creation_date: String,
}

struct ObjectWriter {
    buffer: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn new() -> Self {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buffer,
            offsets: Vec::new(),
        }
    }

    /// Objects must be written in id order starting at 1.
    fn object(&mut self, body: &str) {
        self.offsets.push(self.buffer.len());
        let id = self.offsets.len();
        self.buffer
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }

    fn stream(&mut self, content: &str) {
        let body = format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        );
        self.object(&body);
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        let xref_offset = self.buffer.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = writeln!(xref, "{:010} 00000 n ", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            root,
            info,
            xref_offset
        );
        self.buffer.extend_from_slice(xref.as_bytes());
        self.buffer
    }
}

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const INFO_ID: usize = 6;
const FIRST_PAGE_ID: usize = 7;

/// Serializes laid-out pages into a complete PDF file.
pub fn write_document(pages: &[PageCanvas], info: &DocumentInfo) -> Vec<u8> {
    let mut writer = ObjectWriter::new();
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| FIRST_PAGE_ID + 2 * i).collect();

    writer.object(&format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID));
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    writer.object(&format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids,
        pages.len()
    ));
    for font in [Font::Regular, Font::Bold, Font::Italic] {
        writer.object(&format!(
            "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
            font.base_font()
        ));
    }
    writer.object(&format!(
        "<< /Title {} /Producer {} /CreationDate {} >>",
        escape_string(&encode_win_ansi(&info.title)),
        escape_string(&encode_win_ansi(&info.producer)),
        escape_string(&encode_win_ansi(&info.creation_date))
    ));

    for (page, id) in pages.iter().zip(&page_ids) {
        writer.object(&format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R /F3 5 0 R >> >> /Contents {} 0 R >>",
            PAGES_ID,
            PAGE_WIDTH_MM * PT_PER_MM,
            PAGE_HEIGHT_MM * PT_PER_MM,
            id + 1
        ));
        writer.stream(&page.content_stream());
    }

    writer.finish(CATALOG_ID, INFO_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_characters_become_placeholder() {
        assert_eq!(encode_win_ansi("Café"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("🍽️ Food"), b"? Food".to_vec());
        assert_eq!(encode_win_ansi("ᐃᓄᒃᑎᑐᑦ"), b"??????".to_vec());
        assert_eq!(encode_win_ansi("• item – “ok”"), vec![0x95, b' ', b'i', b't', b'e', b'm', b' ', 0x96, b' ', 0x93, b'o', b'k', 0x94]);
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string(b"a(b)\\"), "(a\\(b\\)\\\\)");
        assert_eq!(escape_string(&[0xE9]), "(\\351)");
    }

    #[test]
    fn test_text_width_grows_with_text() {
        let short = Font::Regular.text_width("Food", 12.0);
        let long = Font::Regular.text_width("Food bank and community kitchen", 12.0);
        assert!(short > 0.0);
        assert!(long > short);
        assert!(Font::Bold.text_width("Food", 12.0) >= short);
    }

    #[test]
    fn test_write_document_structure() {
        let mut page = PageCanvas::default();
        page.push(DrawOp::Text {
            x: 10.0,
            y: 20.0,
            font: Font::Bold,
            size: 12.0,
            color: Rgb(0, 0, 0),
            text: "Hello (world)".to_string(),
        });
        let bytes = write_document(
            &[page.clone(), page],
            &DocumentInfo {
                title: "Service Handout".to_string(),
                producer: "service-handout".to_string(),
                creation_date: "D:20250101120000".to_string(),
            },
        );
        let text = String::from_utf8_lossy(&bytes);

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("/Count 2"));
        assert!(text.contains("(Hello \\(world\\)) Tj"));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = write_document(&[PageCanvas::default()], &DocumentInfo::default());
        let text = String::from_utf8_lossy(&bytes).to_string();
        let xref_at = text.find("xref\n").unwrap();
        let first_entry = text[xref_at..].lines().nth(3).unwrap();
        let offset: usize = first_entry[..10].parse().unwrap();
        assert!(bytes[offset..].starts_with(b"1 0 obj"));
    }
}
