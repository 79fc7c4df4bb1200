// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — serialise composed pages as vector strokes using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. Backgrounds and annotations are added afterwards by
// `annotate`, which works on the saved bytes with lopdf.

use inkwerk_core::Rgb8;
use printpdf::{
    Color, Line, LineCapStyle, LineJoinStyle, LinePoint, Mm, Op, PdfDocument, PdfPage,
    PdfSaveOptions, PdfWarnMsg, Point, Pt, Rgb,
};
use tracing::{debug, info, instrument};

use crate::compositor::{ComposedLayer, ComposedPage};
use crate::painter::{CapStyle, PathOp, PathOpKind};

/// Writes composed pages into a new PDF document.
pub struct PdfWriter {
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Render every page's stroke layers and return the serialised PDF.
    ///
    /// Pages appear in the order given, one `PdfPage` per composed page.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn write(&self, pages: &[ComposedPage]) -> Vec<u8> {
        info!(title = %self.title, "Creating stroke PDF");

        let mut doc = PdfDocument::new(&self.title);
        let pdf_pages: Vec<PdfPage> = pages
            .iter()
            .map(|page| {
                let mut ops = Vec::new();
                for layer in &page.layers {
                    layer_ops(layer, &mut ops);
                }
                PdfPage::new(pt_to_mm(page.width), pt_to_mm(page.height), ops)
            })
            .collect();
        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        debug!(bytes = output.len(), warnings = warnings.len(), "stroke PDF serialised");
        output
    }
}

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

/// Stroke style shared by consecutive line segments.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Style {
    width: f32,
    color: Rgb8,
    cap: CapStyle,
}

impl Style {
    fn of(op: &PathOp) -> Self {
        Self {
            width: op.width,
            color: op.color,
            cap: op.cap,
        }
    }
}

/// Append the drawing operations for one layer, wrapped in its own graphics
/// state.
fn layer_ops(layer: &ComposedLayer, out: &mut Vec<Op>) {
    if layer.ops.is_empty() {
        return;
    }

    out.push(Op::SaveGraphicsState);
    out.push(Op::SetLineJoinStyle {
        join: LineJoinStyle::Round,
    });

    let mut current: Option<Style> = None;
    let mut polyline: Vec<LinePoint> = Vec::new();
    let mut pen: Option<&PathOp> = None;

    for op in &layer.ops {
        match op.kind {
            PathOpKind::Move => {
                flush(&mut polyline, out);
                pen = Some(op);
            }
            PathOpKind::Line => {
                let style = Style::of(op);
                if current != Some(style) {
                    flush(&mut polyline, out);
                    push_style(current, style, out);
                    current = Some(style);
                }
                if polyline.is_empty()
                    && let Some(from) = pen
                {
                    polyline.push(line_point(from));
                }
                polyline.push(line_point(op));
                pen = Some(op);
            }
        }
    }
    flush(&mut polyline, out);

    out.push(Op::RestoreGraphicsState);
}

/// Emit only the style operators that differ from `previous`.
fn push_style(previous: Option<Style>, style: Style, out: &mut Vec<Op>) {
    if previous.map(|p| p.color) != Some(style.color) {
        let [r, g, b] = style.color.to_unit();
        out.push(Op::SetOutlineColor {
            col: Color::Rgb(Rgb {
                r,
                g,
                b,
                icc_profile: None,
            }),
        });
    }
    if previous.map(|p| p.width) != Some(style.width) {
        out.push(Op::SetOutlineThickness {
            pt: Pt(style.width),
        });
    }
    if previous.map(|p| p.cap) != Some(style.cap) {
        out.push(Op::SetLineCapStyle {
            cap: match style.cap {
                CapStyle::Round => LineCapStyle::Round,
                CapStyle::Flat => LineCapStyle::Butt,
            },
        });
    }
}

fn flush(polyline: &mut Vec<LinePoint>, out: &mut Vec<Op>) {
    if polyline.len() >= 2 {
        out.push(Op::DrawLine {
            line: Line {
                points: std::mem::take(polyline),
                is_closed: false,
            },
        });
    }
    polyline.clear();
}

fn line_point(op: &PathOp) -> LinePoint {
    LinePoint {
        p: Point {
            x: Pt(op.point.x),
            y: Pt(op.point.y),
        },
        bezier: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry;

    fn op(kind: PathOpKind, x: f32, width: f32) -> PathOp {
        PathOp {
            kind,
            point: geometry::Point::new(x, 10.0),
            width,
            color: Rgb8::BLACK,
            cap: CapStyle::Round,
        }
    }

    fn draw_lines(ops: &[Op]) -> Vec<usize> {
        ops.iter()
            .filter_map(|o| match o {
                Op::DrawLine { line } => Some(line.points.len()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn equal_style_segments_collapse_into_one_polyline() {
        let layer = ComposedLayer {
            name: "Layer 1".into(),
            ops: vec![
                op(PathOpKind::Move, 0.0, 1.0),
                op(PathOpKind::Line, 1.0, 1.0),
                op(PathOpKind::Line, 2.0, 1.0),
                op(PathOpKind::Line, 3.0, 1.0),
            ],
        };
        let mut ops = Vec::new();
        layer_ops(&layer, &mut ops);

        assert_eq!(draw_lines(&ops), vec![4]);
        assert!(matches!(ops.first(), Some(Op::SaveGraphicsState)));
        assert!(matches!(ops.last(), Some(Op::RestoreGraphicsState)));
        let thickness = ops
            .iter()
            .filter(|o| matches!(o, Op::SetOutlineThickness { .. }))
            .count();
        assert_eq!(thickness, 1);
    }

    #[test]
    fn style_change_starts_new_polyline_at_last_point() {
        let layer = ComposedLayer {
            name: "Layer 1".into(),
            ops: vec![
                op(PathOpKind::Move, 0.0, 1.0),
                op(PathOpKind::Line, 1.0, 1.0),
                op(PathOpKind::Line, 2.0, 2.0),
                op(PathOpKind::Line, 3.0, 2.0),
            ],
        };
        let mut ops = Vec::new();
        layer_ops(&layer, &mut ops);
        assert_eq!(draw_lines(&ops), vec![2, 3]);

        let Some(Op::DrawLine { line }) = ops.iter().rev().find(|o| matches!(o, Op::DrawLine { .. }))
        else {
            panic!("no line drawn");
        };
        assert_eq!(line.points[0].p.x, Pt(1.0));
    }

    #[test]
    fn each_stroke_starts_at_its_move() {
        let layer = ComposedLayer {
            name: "Layer 1".into(),
            ops: vec![
                op(PathOpKind::Move, 0.0, 1.0),
                op(PathOpKind::Line, 1.0, 1.0),
                op(PathOpKind::Move, 50.0, 1.0),
                op(PathOpKind::Line, 51.0, 1.0),
                op(PathOpKind::Move, 90.0, 1.0),
            ],
        };
        let mut ops = Vec::new();
        layer_ops(&layer, &mut ops);
        assert_eq!(draw_lines(&ops), vec![2, 2]);
    }

    #[test]
    fn empty_layers_emit_nothing() {
        let mut ops = Vec::new();
        layer_ops(
            &ComposedLayer {
                name: "empty".into(),
                ops: Vec::new(),
            },
            &mut ops,
        );
        assert!(ops.is_empty());
    }

    #[test]
    fn writes_one_pdf_page_per_composed_page() {
        let page = |index| ComposedPage {
            index,
            width: 447.3,
            height: 596.4,
            background: None,
            layers: Vec::new(),
            highlights: Vec::new(),
        };
        let bytes = PdfWriter::new("test").write(&[page(0), page(3)]);
        assert!(bytes.starts_with(b"%PDF"));

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
