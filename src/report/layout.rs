//! Fixed-page layout: word wrapping and pagination.
//!
//! Positions are millimetres measured down from the top edge. A logical report
//! line is a block of wrapped rows. A block that fits on one page is never
//! split across pages; a taller block breaks row by row. A section heading is
//! never left alone at the bottom of a page.

use super::{LineStyle, Report};

/// Page metrics in millimetres. Defaults describe A4 portrait.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    /// Baseline of the first row on a page.
    pub top: f32,
    /// Lowest allowed baseline.
    pub bottom: f32,
    pub line_height: f32,
    /// Extra space after each block.
    pub block_gap: f32,
    /// Space taken by a section heading and its rule.
    pub heading_height: f32,
    pub chars_per_line: usize,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin_left: 15.0,
            top: 20.0,
            bottom: 280.0,
            line_height: 6.0,
            block_gap: 2.0,
            heading_height: 12.0,
            chars_per_line: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Title,
    Subtitle,
    Generated,
    /// Horizontal rule under the header or a heading.
    Rule,
    Heading,
    Body(LineStyle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    pub kind: RowKind,
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Logical line this row was wrapped from (headers and headings have none).
    pub block: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<PlacedRow>,
}

/// Word-wrap `text` to at most `max_chars` characters per row.
/// Words longer than a row are hard-broken. Always returns at least one row.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(max_chars) {
            let needed = current.chars().count() + piece.len() + 1;
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(piece);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn indent_for(style: LineStyle) -> f32 {
    match style {
        LineStyle::Bullet => 4.0,
        LineStyle::Paragraph | LineStyle::Item | LineStyle::Detail => 0.0,
    }
}

/// Keeps the leading spaces of detail lines, which `wrap_text` would drop.
fn wrap_block(text: &str, style: LineStyle, chars: usize) -> Vec<String> {
    let lead: String = text.chars().take_while(|c| *c == ' ').collect();
    let mut rows = wrap_text(text, chars.saturating_sub(lead.len()).max(1));
    if style == LineStyle::Detail && !lead.is_empty() {
        for row in &mut rows {
            row.insert_str(0, &lead);
        }
    }
    rows
}

struct Cursor<'g> {
    geometry: &'g PageGeometry,
    pages: Vec<Page>,
    y: f32,
}

impl<'g> Cursor<'g> {
    fn new(geometry: &'g PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Page::default()],
            y: geometry.top,
        }
    }

    fn current_is_empty(&self) -> bool {
        self.pages.last().map_or(true, |p| p.rows.is_empty())
    }

    /// Start a new page unless `height` (baseline to last baseline) fits.
    /// An empty page never gets a successor.
    fn ensure_room(&mut self, height: f32) {
        if self.y + height > self.geometry.bottom && !self.current_is_empty() {
            self.pages.push(Page::default());
            self.y = self.geometry.top;
        }
    }

    fn place(&mut self, kind: RowKind, text: String, x: f32, block: Option<usize>) {
        if let Some(page) = self.pages.last_mut() {
            page.rows.push(PlacedRow {
                kind,
                text,
                x,
                y: self.y,
                block,
            });
        }
    }
}

/// Baseline of the first row to baseline of the last.
fn block_height(g: &PageGeometry, rows: usize) -> f32 {
    rows.saturating_sub(1) as f32 * g.line_height
}

fn fits_fresh_page(g: &PageGeometry, height: f32) -> bool {
    g.top + height <= g.bottom
}

/// Lay `report` out on fixed-height pages, preserving section order.
pub fn paginate(report: &Report, geometry: &PageGeometry) -> Vec<Page> {
    let g = geometry;
    let mut cursor = Cursor::new(g);
    let center = g.width / 2.0;

    cursor.place(RowKind::Title, report.title.clone(), center, None);
    cursor.y += 8.0;
    cursor.place(RowKind::Subtitle, report.subtitle.clone(), center, None);
    cursor.y += 10.0;
    cursor.place(RowKind::Generated, report.generated_line.clone(), center, None);
    cursor.y += 10.0;
    cursor.place(RowKind::Rule, String::new(), g.margin_left, None);
    cursor.y += 10.0;

    let mut block = 0usize;
    for section in &report.sections {
        let wrapped: Vec<(LineStyle, Vec<String>)> = section
            .lines
            .iter()
            .map(|line| {
                let indent = indent_for(line.style);
                let chars = g
                    .chars_per_line
                    .saturating_sub((indent / 2.0) as usize)
                    .max(1);
                (line.style, wrap_block(&line.text, line.style, chars))
            })
            .collect();

        // Heading travels with the first block of its section, or with the
        // first row when that block has to break anyway
        let first_height = wrapped.first().map_or(0.0, |(_, rows)| block_height(g, rows.len()));
        let first_whole = fits_fresh_page(g, g.heading_height + first_height);
        cursor.ensure_room(g.heading_height + if first_whole { first_height } else { 0.0 });
        cursor.place(RowKind::Heading, section.heading.clone(), g.margin_left, None);
        cursor.y += 5.0;
        cursor.place(RowKind::Rule, String::new(), g.margin_left, None);
        cursor.y += g.heading_height - 5.0;

        for (index, (style, rows)) in wrapped.into_iter().enumerate() {
            let height = block_height(g, rows.len());
            let whole = if index == 0 {
                first_whole
            } else {
                fits_fresh_page(g, height)
            };
            if whole {
                cursor.ensure_room(height);
            }
            let x = g.margin_left + indent_for(style);
            for row in rows {
                if !whole {
                    cursor.ensure_room(0.0);
                }
                cursor.place(RowKind::Body(style), row, x, Some(block));
                cursor.y += g.line_height;
            }
            cursor.y += g.block_gap;
            block += 1;
        }
    }

    cursor.pages
}
