//! Analytic layout: every block is measured from text, width and line height
//! before anything is drawn, so page breaks are decided up front.

use crate::core::render::glyph::CategoryGlyph;
use crate::core::render::pdf::{DrawOp, Font, PageCanvas, Rgb, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use crate::core::render::{HandoutDocument, ServiceCard};

pub const MARGIN: f32 = 15.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN;
pub const HEADER_HEIGHT: f32 = 25.0;
pub const BODY_TOP: f32 = HEADER_HEIGHT + 8.0;
/// Automatic page break 20 mm above the bottom edge.
pub const BODY_BOTTOM: f32 = PAGE_HEIGHT_MM - 20.0;

pub const BRAND_GREEN: Rgb = Rgb(0, 120, 90);
pub const BRAND_DARK: Rgb = Rgb(30, 30, 30);
pub const BRAND_LIGHT_GREY: Rgb = Rgb(245, 245, 245);
const BORDER_GREY: Rgb = Rgb(200, 200, 200);
const RULE_GREY: Rgb = Rgb(220, 220, 220);
const FOOTER_GREY: Rgb = Rgb(120, 120, 120);

pub const SERVICES_HEADING: &str = "Services that may help you";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    pub size: f32,
    pub line_height: f32,
}

impl TextStyle {
    const fn new(font: Font, size: f32, line_height: f32) -> Self {
        Self {
            font,
            size,
            line_height,
        }
    }

    /// Baseline for a line whose box starts at `top`.
    fn baseline(&self, top: f32) -> f32 {
        let size_mm = self.size * 25.4 / 72.0;
        top + self.line_height / 2.0 + size_mm * 0.35
    }
}

pub const PARAGRAPH: TextStyle = TextStyle::new(Font::Regular, 12.0, 7.0);
pub const HEADING: TextStyle = TextStyle::new(Font::Bold, 14.0, 9.0);
pub const CARD_TITLE: TextStyle = TextStyle::new(Font::Bold, 13.0, 7.0);
pub const CARD_BODY: TextStyle = TextStyle::new(Font::Regular, 11.0, 5.5);

pub const CARD_PADDING: f32 = 4.0;
pub const CARD_GAP: f32 = 5.0;
const TITLE_BODY_GAP: f32 = 1.5;
const BADGE_SIZE: f32 = 6.0;
const BADGE_GAP: f32 = 2.5;
const SECTION_GAP: f32 = 4.0;
const HEADING_GAP: f32 = 1.0;

const PAGE_BODY_HEIGHT: f32 = BODY_BOTTOM - BODY_TOP;
// Room for a card's top padding, title line and bottom padding.
const MIN_CARD_START: f32 = 2.0 * CARD_PADDING + CARD_TITLE.line_height;

const CARD_INNER_WIDTH: f32 = CONTENT_WIDTH - 2.0 * CARD_PADDING;
const CARD_TITLE_WIDTH: f32 = CARD_INNER_WIDTH - BADGE_SIZE - BADGE_GAP;

/// Greedy word wrap. Explicit newlines are kept; words wider than
/// `max_width` are broken between characters.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.lines() {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if font.text_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if font.text_width(word, size) <= max_width {
                current = word.to_string();
            } else {
                for ch in word.chars() {
                    let mut next = current.clone();
                    next.push(ch);
                    if !current.is_empty() && font.text_width(&next, size) > max_width {
                        lines.push(std::mem::take(&mut current));
                        current.push(ch);
                    } else {
                        current = next;
                    }
                }
            }
        }
        lines.push(current);
    }

    lines
}

/// A card measured before drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub glyph: CategoryGlyph,
    pub title_lines: Vec<String>,
    pub body_lines: Vec<String>,
    pub height: f32,
}

pub fn card_body_fields(card: &ServiceCard) -> Vec<String> {
    let service = &card.service;
    let mut fields = Vec::new();
    if !service.description.trim().is_empty() {
        fields.push(service.description.trim().to_string());
    }
    if !service.hours_today.trim().is_empty() {
        fields.push(format!("Today: {}", service.hours_today.trim()));
    }
    if !service.address.trim().is_empty() {
        fields.push(format!("Where: {}", service.address.trim()));
    }
    fields
}

pub fn measure_card(card: &ServiceCard) -> CardLayout {
    let title_lines = wrap_text(
        &card.service.name,
        CARD_TITLE.font,
        CARD_TITLE.size,
        CARD_TITLE_WIDTH,
    );
    let body_lines: Vec<String> = card_body_fields(card)
        .iter()
        .flat_map(|field| wrap_text(field, CARD_BODY.font, CARD_BODY.size, CARD_INNER_WIDTH))
        .collect();

    let mut height = 2.0 * CARD_PADDING + title_lines.len().max(1) as f32 * CARD_TITLE.line_height;
    if !body_lines.is_empty() {
        height += TITLE_BODY_GAP + body_lines.len() as f32 * CARD_BODY.line_height;
    }

    CardLayout {
        glyph: card.glyph,
        title_lines,
        body_lines,
        height,
    }
}

/// Where a card ended up. `segments` is more than one only for a card taller
/// than a whole page.
#[derive(Debug, Clone, PartialEq)]
pub struct CardPlacement {
    pub service_id: u32,
    pub page: usize,
    pub top: f32,
    pub height: f32,
    pub segments: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentLayout {
    pub pages: Vec<PageCanvas>,
    pub cards: Vec<CardPlacement>,
}

struct Flow {
    pages: Vec<PageCanvas>,
    y: f32,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: vec![PageCanvas::default()],
            y: BODY_TOP,
        }
    }

    fn page_index(&self) -> usize {
        self.pages.len() - 1
    }

    fn canvas(&mut self) -> &mut PageCanvas {
        let index = self.page_index();
        &mut self.pages[index]
    }

    fn new_page(&mut self) {
        self.pages.push(PageCanvas::default());
        self.y = BODY_TOP;
    }

    fn remaining(&self) -> f32 {
        BODY_BOTTOM - self.y
    }

    /// Breaks the page unless `height` fits, or the page is still empty.
    fn ensure_space(&mut self, height: f32) {
        if height > self.remaining() && self.y > BODY_TOP {
            self.new_page();
        }
    }

    fn text_line(&mut self, x: f32, style: TextStyle, color: Rgb, text: &str) {
        let baseline = style.baseline(self.y);
        self.canvas().push(DrawOp::Text {
            x,
            y: baseline,
            font: style.font,
            size: style.size,
            color,
            text: text.to_string(),
        });
        self.y += style.line_height;
    }

    fn paragraph(&mut self, text: &str, style: TextStyle) {
        for line in wrap_text(text, style.font, style.size, CONTENT_WIDTH) {
            self.ensure_space(style.line_height);
            self.text_line(MARGIN, style, BRAND_DARK, &line);
        }
        self.y += SECTION_GAP;
    }

    fn card_box(&mut self, insert_at: usize, top: f32, height: f32) {
        let ops = vec![
            DrawOp::FillRect {
                x: MARGIN,
                y: top,
                w: CONTENT_WIDTH,
                h: height,
                color: BRAND_LIGHT_GREY,
            },
            DrawOp::StrokeRect {
                x: MARGIN,
                y: top,
                w: CONTENT_WIDTH,
                h: height,
                color: BORDER_GREY,
                line_width: 0.3,
            },
        ];
        self.canvas().insert_at(insert_at, ops);
    }

    fn badge(&mut self, glyph: CategoryGlyph) {
        let x = MARGIN + CARD_PADDING;
        let y = self.y + (CARD_TITLE.line_height - BADGE_SIZE) / 2.0;
        let letter = glyph.badge_letter().to_string();
        let letter_width = Font::Bold.text_width(&letter, 9.0);
        self.canvas().push(DrawOp::FillRect {
            x,
            y,
            w: BADGE_SIZE,
            h: BADGE_SIZE,
            color: glyph.color(),
        });
        self.canvas().push(DrawOp::Text {
            x: x + (BADGE_SIZE - letter_width) / 2.0,
            y: y + BADGE_SIZE / 2.0 + 1.1,
            font: Font::Bold,
            size: 9.0,
            color: Rgb::WHITE,
            text: letter,
        });
    }

    fn card(&mut self, service_id: u32, layout: &CardLayout) -> CardPlacement {
        if layout.height <= PAGE_BODY_HEIGHT {
            self.ensure_space(layout.height);
        } else {
            self.ensure_space(MIN_CARD_START);
        }

        let page = self.page_index();
        let top = self.y;
        let mut segment_top = self.y;
        let mut segment_start = self.canvas().len();
        let mut segments = 1;

        self.y += CARD_PADDING;
        self.badge(layout.glyph);

        let title_x = MARGIN + CARD_PADDING + BADGE_SIZE + BADGE_GAP;
        let body_x = MARGIN + CARD_PADDING;
        let lines = layout
            .title_lines
            .iter()
            .map(|line| (title_x, CARD_TITLE, line))
            .chain(layout.body_lines.iter().map(|line| (body_x, CARD_BODY, line)));

        let mut first_body = true;
        for (x, style, line) in lines {
            if style == CARD_BODY && first_body {
                self.y += TITLE_BODY_GAP;
                first_body = false;
            }
            // Only reachable for a card taller than a full page.
            if self.y + style.line_height + CARD_PADDING > BODY_BOTTOM + 0.01 {
                let height = self.y + CARD_PADDING - segment_top;
                self.card_box(segment_start, segment_top, height);
                self.new_page();
                segments += 1;
                segment_top = self.y;
                segment_start = self.canvas().len();
                self.y += CARD_PADDING;
            }
            self.text_line(x, style, BRAND_DARK, line);
        }

        self.y += CARD_PADDING;
        let height = self.y - segment_top;
        self.card_box(segment_start, segment_top, height);
        self.y += CARD_GAP;

        CardPlacement {
            service_id,
            page,
            top,
            height: if segments == 1 { height } else { layout.height },
            segments,
        }
    }
}

fn draw_header(canvas: &mut PageCanvas, title: &str, generated_on: &str) {
    let mut ops = vec![
        DrawOp::FillRect {
            x: 0.0,
            y: 0.0,
            w: PAGE_WIDTH_MM,
            h: HEADER_HEIGHT,
            color: BRAND_GREEN,
        },
        DrawOp::Text {
            x: 10.0,
            y: 13.5,
            font: Font::Bold,
            size: 18.0,
            color: Rgb::WHITE,
            text: title.to_string(),
        },
    ];
    if !generated_on.is_empty() {
        ops.push(DrawOp::Text {
            x: 10.0,
            y: 20.0,
            font: Font::Regular,
            size: 10.0,
            color: Rgb::WHITE,
            text: format!("Generated on: {}", generated_on),
        });
    }
    canvas.insert_at(0, ops);
}

fn draw_footer(canvas: &mut PageCanvas, label: &str, page: usize, total: usize) {
    let rule_y = PAGE_HEIGHT_MM - 15.0;
    let text = format!("{}   -   Page {} of {}", label, page, total);
    let width = Font::Italic.text_width(&text, 8.0);
    canvas.push(DrawOp::Line {
        x1: 10.0,
        y1: rule_y,
        x2: PAGE_WIDTH_MM - 10.0,
        y2: rule_y,
        color: RULE_GREY,
        line_width: 0.3,
    });
    canvas.push(DrawOp::Text {
        x: (PAGE_WIDTH_MM - width) / 2.0,
        y: PAGE_HEIGHT_MM - 8.0,
        font: Font::Italic,
        size: 8.0,
        color: FOOTER_GREY,
        text,
    });
}

/// Lays out the whole document. Headers and footers are stamped last, once
/// the page total is known.
pub fn layout_document(
    document: &HandoutDocument,
    title: &str,
    footer_label: &str,
) -> DocumentLayout {
    let mut flow = Flow::new();

    if !document.intro.trim().is_empty() {
        flow.paragraph(&document.intro, PARAGRAPH);
    }

    let measured: Vec<CardLayout> = document.cards.iter().map(measure_card).collect();
    let mut placements = Vec::with_capacity(measured.len());

    if let Some(first) = measured.first() {
        // 標題不可與第一張卡片分開
        let keep_together = HEADING.line_height + HEADING_GAP + first.height;
        if keep_together <= PAGE_BODY_HEIGHT {
            flow.ensure_space(keep_together);
        } else {
            flow.ensure_space(HEADING.line_height + HEADING_GAP + MIN_CARD_START);
        }
        flow.text_line(MARGIN, HEADING, BRAND_DARK, SERVICES_HEADING);
        flow.y += HEADING_GAP;
    }
    for (card, layout) in document.cards.iter().zip(&measured) {
        placements.push(flow.card(card.service.id, layout));
    }

    if !document.closing.trim().is_empty() {
        flow.y += 2.0;
        flow.paragraph(&document.closing, PARAGRAPH);
    }

    let generated_on = document.generated_at.format("%Y-%m-%d %H:%M").to_string();
    let total = flow.pages.len();
    for (index, page) in flow.pages.iter_mut().enumerate() {
        draw_header(page, title, &generated_on);
        draw_footer(page, footer_label, index + 1, total);
    }

    DocumentLayout {
        pages: flow.pages,
        cards: placements,
    }
}
