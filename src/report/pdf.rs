//! PDF writer over the paginated layout, using `printpdf` builtin fonts.

use std::io::BufWriter;

use printpdf::*;

use super::layout::{paginate, PageGeometry, RowKind};
use super::{Report, ReportError};

const PT_TO_MM: f32 = 0.3528;

/// Rough Helvetica advance width: half the font size per character.
fn approx_text_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * 0.5 * PT_TO_MM
}

fn font_size(kind: RowKind) -> f32 {
    match kind {
        RowKind::Title => 22.0,
        RowKind::Subtitle => 13.0,
        RowKind::Generated => 10.0,
        RowKind::Heading => 14.0,
        RowKind::Rule | RowKind::Body(_) => 11.0,
    }
}

/// Generates the report PDF. Returns PDF bytes.
pub fn generate_pdf(report: &Report) -> Result<Vec<u8>, ReportError> {
    let geometry = PageGeometry::default();
    let pages = paginate(report, &geometry);
    let width = Mm(geometry.width);
    let height = Mm(geometry.height);

    let (doc, first_page, first_layer) = PdfDocument::new(&report.title, width, height, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(format!("font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Pdf(format!("font error: {e}")))?;

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = doc.add_page(width, height, format!("Layer {}", index + 1));
            doc.get_page(page_index).get_layer(layer_index)
        };

        for row in &page.rows {
            // Layout measures down from the top; PDF measures up from the bottom
            let y = Mm(geometry.height - row.y);
            match row.kind {
                RowKind::Rule => {
                    layer.set_outline_thickness(0.3);
                    layer.add_line(Line {
                        points: vec![
                            (Point::new(Mm(geometry.margin_left), y), false),
                            (Point::new(Mm(geometry.width - geometry.margin_left), y), false),
                        ],
                        is_closed: false,
                    });
                }
                RowKind::Title | RowKind::Subtitle | RowKind::Generated => {
                    let size = font_size(row.kind);
                    let x = row.x - approx_text_width_mm(&row.text, size) / 2.0;
                    let face = if row.kind == RowKind::Title { &bold } else { &font };
                    layer.use_text(&row.text, size, Mm(x), y, face);
                }
                RowKind::Heading => {
                    layer.use_text(&row.text, font_size(row.kind), Mm(row.x), y, &bold);
                }
                RowKind::Body(_) => {
                    layer.use_text(&row.text, font_size(row.kind), Mm(row.x), y, &font);
                }
            }
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Pdf(format!("save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ReportError::Pdf(format!("buffer error: {e}")))
}
