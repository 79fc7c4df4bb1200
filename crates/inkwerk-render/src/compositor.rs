// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page compositor — decides which pages are emitted, sizes each page to the
// device aspect ratio (fitting any background page), and maps painted
// strokes and grouped highlights from device pixels into page points.

use inkwerk_archive::{Document, FileType, Page};
use inkwerk_core::config::ExportConfig;
use inkwerk_core::error::{InkwerkError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::geometry::{Point, QuadPoints, Rect};
use crate::highlight::{Highlight, HighlightStyle, group_highlights, group_spans};
use crate::painter::{PathOp, StrokePainter};

/// Device screen size in pixels.
pub const DEVICE_WIDTH: f32 = 1404.0;
pub const DEVICE_HEIGHT: f32 = 1872.0;
pub const DEVICE_DPI: f32 = 226.0;
/// PDF points per device pixel.
pub const PT_PER_PX: f32 = 72.0 / DEVICE_DPI;
/// Device screen size in points.
pub const DEVICE_WIDTH_PT: f32 = DEVICE_WIDTH * PT_PER_PX;
pub const DEVICE_HEIGHT_PT: f32 = DEVICE_HEIGHT * PT_PER_PX;

/// Supplies the dimensions of background pages, in points.
pub trait BackgroundSource {
    /// Width and height of the zero-based page `index`, if it exists.
    fn page_size(&self, index: usize) -> Option<(f32, f32)>;
}

/// Maps device pixels to page points. Page Y grows upward, device Y downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    pub scale: f32,
    pub page_height: f32,
}

impl PageTransform {
    pub fn point(&self, p: Point) -> Point {
        let k = PT_PER_PX * self.scale;
        Point::new(p.x * k, self.page_height - p.y * k)
    }

    /// Stroke width in points for a device brush width.
    pub fn width(&self, width: f32) -> f32 {
        width / 2.0 * self.scale
    }

    /// Transformed rectangle, re-normalised so that `ll <= ur`.
    pub fn rect(&self, rect: &Rect) -> Rect {
        Rect::spanning(self.point(rect.ll), self.point(rect.ur))
    }

    pub fn quad_points(&self, qp: &QuadPoints) -> QuadPoints {
        qp.map(|p| self.point(p))
    }

    pub fn op(&self, op: &PathOp) -> PathOp {
        PathOp {
            point: self.point(op.point),
            width: self.width(op.width),
            ..*op
        }
    }

    pub fn highlight(&self, highlight: &Highlight) -> Highlight {
        Highlight {
            rect: self.rect(&highlight.rect),
            quad_points: self.quad_points(&highlight.quad_points),
            ..highlight.clone()
        }
    }
}

/// Where and how large the background page is drawn, in page points.
/// The page is drawn from the top-left corner at its natural size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPlacement {
    /// Zero-based page of the background document.
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
}

/// Stroke paths of one layer, in page space. Widths are in points.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedLayer {
    pub name: String,
    pub ops: Vec<PathOp>,
}

/// One output page, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPage {
    /// Zero-based index of the source page.
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub background: Option<BackgroundPlacement>,
    pub layers: Vec<ComposedLayer>,
    /// Grouped highlights of every layer, in page space.
    pub highlights: Vec<Highlight>,
}

/// Page size and transform for a page, given the optional background size.
pub fn fit_page(background: Option<(f32, f32)>) -> (f32, f32, PageTransform) {
    let device_ratio = DEVICE_WIDTH / DEVICE_HEIGHT;
    let (width, height, scale) = match background {
        Some((w, h)) if w / h <= device_ratio => (device_ratio * h, h, h / DEVICE_HEIGHT_PT),
        Some((w, _)) => (w, w / device_ratio, w / DEVICE_WIDTH_PT),
        None => (DEVICE_WIDTH_PT, DEVICE_HEIGHT_PT, 1.0),
    };
    (
        width,
        height,
        PageTransform {
            scale,
            page_height: height,
        },
    )
}

/// Lays out a decoded document as a list of output pages.
#[derive(Debug, Clone)]
pub struct PageCompositor {
    all_pages: bool,
    annotations_only: bool,
    style: HighlightStyle,
}

impl PageCompositor {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            all_pages: config.all_pages,
            annotations_only: config.annotations_only,
            style: HighlightStyle::from_config(config),
        }
    }

    /// Compose every emitted page of `document`.
    ///
    /// `background` is consulted only for PDF documents that carry a payload.
    #[instrument(skip_all, fields(uuid = %document.uuid, pages = document.pages.len()))]
    pub fn compose(
        &self,
        document: &Document,
        background: Option<&dyn BackgroundSource>,
    ) -> Result<Vec<ComposedPage>> {
        let kind = document.content.kind();
        if kind == FileType::Epub {
            return Err(InkwerkError::UnsupportedFormat(
                "only pdf and notebook documents can be exported".into(),
            ));
        }
        if document.pages.is_empty() {
            return Err(InkwerkError::EmptyDocument);
        }

        let background = match (kind, &document.payload) {
            (FileType::Pdf, Some(_)) => background,
            _ => None,
        };

        let mut painter = StrokePainter::new(self.style.clone());
        let mut composed = Vec::new();

        for (index, page) in document.pages.iter().enumerate() {
            if !self.all_pages && !page.has_strokes() {
                debug!(index, "skipping page without strokes");
                continue;
            }
            composed.push(self.compose_page(index, page, background, &mut painter));
        }

        debug!(emitted = composed.len(), "document composed");
        Ok(composed)
    }

    fn compose_page(
        &self,
        index: usize,
        page: &Page,
        background: Option<&dyn BackgroundSource>,
        painter: &mut StrokePainter,
    ) -> ComposedPage {
        let size = background.and_then(|source| {
            let size = source.page_size(index);
            match size {
                Some((w, h)) if w > 0.0 && h > 0.0 => size,
                Some((w, h)) => {
                    warn!(index, w, h, "background page has an empty media box");
                    None
                }
                None => {
                    warn!(index, "background document has no page at this index");
                    None
                }
            }
        });

        let (width, height, transform) = fit_page(size);
        let placement = size
            .filter(|_| !self.annotations_only)
            .map(|(w, h)| BackgroundPlacement {
                page_index: index,
                width: w,
                height: h,
            });

        let mut layers = Vec::new();
        let mut highlights = Vec::new();

        if let Some(data) = &page.data {
            for (idx, layer) in data.layers.iter().enumerate() {
                let mut ops = Vec::new();
                let mut found = Vec::new();

                for stroke in &layer.strokes {
                    let painted = painter.paint(stroke);
                    ops.extend(painted.ops.iter().map(|op| transform.op(op)));
                    found.extend(painted.highlight);
                }
                found.extend(group_spans(page.highlights.layer(idx), &self.style));

                highlights.extend(
                    group_highlights(found)
                        .iter()
                        .map(|h| transform.highlight(h)),
                );
                layers.push(ComposedLayer {
                    name: page.layer_name(idx),
                    ops,
                });
            }
        }

        ComposedPage {
            index,
            width,
            height,
            background: placement,
            layers,
            highlights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwerk_archive::{Content, HighlightSpan, LayerMetadata, PageHighlights, PageMetadata, SpanRect};
    use inkwerk_core::{BrushColor, BrushType, Layer, Segment, Stroke, StrokeData};

    struct FixedPages(Vec<(f32, f32)>);

    impl BackgroundSource for FixedPages {
        fn page_size(&self, index: usize) -> Option<(f32, f32)> {
            self.0.get(index).copied()
        }
    }

    fn seg(x: f32, y: f32) -> Segment {
        Segment {
            x,
            y,
            width: 4.0,
            pressure: 1.0,
            ..Segment::default()
        }
    }

    fn inked_page(strokes: Vec<Stroke>) -> Page {
        Page {
            data: Some(StrokeData {
                version: 5,
                layers: vec![Layer { strokes }],
            }),
            ..Page::default()
        }
    }

    fn document(file_type: &str, pages: Vec<Page>, payload: Option<Vec<u8>>) -> Document {
        Document {
            uuid: "doc".into(),
            content: Content {
                file_type: file_type.into(),
                page_count: pages.len() as i64,
                ..Content::default()
            },
            pages,
            payload,
        }
    }

    fn line() -> Stroke {
        Stroke::new(BrushType::Fineliner, BrushColor::Black, vec![seg(0.0, 0.0), seg(100.0, 200.0)])
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{a} != {b}");
    }

    #[test]
    fn epub_is_refused() {
        let doc = document("epub", vec![inked_page(vec![line()])], None);
        let result = PageCompositor::new(&ExportConfig::default()).compose(&doc, None);
        assert!(matches!(result, Err(InkwerkError::UnsupportedFormat(_))));
    }

    #[test]
    fn document_without_pages_is_refused() {
        let doc = document("notebook", Vec::new(), None);
        let result = PageCompositor::new(&ExportConfig::default()).compose(&doc, None);
        assert!(matches!(result, Err(InkwerkError::EmptyDocument)));
    }

    #[test]
    fn blank_pages_skipped_unless_requested() {
        let doc = document(
            "notebook",
            vec![Page::default(), inked_page(vec![line()]), Page::default()],
            None,
        );

        let pages = PageCompositor::new(&ExportConfig::default()).compose(&doc, None).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].index, 1);

        let config = ExportConfig {
            all_pages: true,
            ..ExportConfig::default()
        };
        let pages = PageCompositor::new(&config).compose(&doc, None).unwrap();
        assert_eq!(pages.iter().map(|p| p.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(pages[0].layers.is_empty());
    }

    #[test]
    fn notebook_pages_use_device_size() {
        let doc = document("notebook", vec![inked_page(vec![line()])], None);
        let page = &PageCompositor::new(&ExportConfig::default()).compose(&doc, None).unwrap()[0];

        assert_close(page.width, 1404.0 * 72.0 / 226.0);
        assert_close(page.height, 1872.0 * 72.0 / 226.0);
        assert!(page.background.is_none());

        let ops = &page.layers[0].ops;
        assert_close(ops[0].point.y, page.height);
        assert_close(ops[1].point.x, 100.0 * PT_PER_PX);
        assert_close(ops[1].point.y, page.height - 200.0 * PT_PER_PX);
        assert_close(ops[1].width, 2.0);
        assert_eq!(page.layers[0].name, "Layer 1");
    }

    #[test]
    fn narrow_background_keeps_its_height() {
        let doc = document("pdf", vec![inked_page(vec![line()])], Some(b"%PDF".to_vec()));
        let source = FixedPages(vec![(300.0, 1000.0)]);
        let page = &PageCompositor::new(&ExportConfig::default())
            .compose(&doc, Some(&source))
            .unwrap()[0];

        assert_close(page.height, 1000.0);
        assert_close(page.width, 1000.0 * 1404.0 / 1872.0);
        assert_eq!(
            page.background,
            Some(BackgroundPlacement {
                page_index: 0,
                width: 300.0,
                height: 1000.0
            })
        );
        let scale = 1000.0 / DEVICE_HEIGHT_PT;
        assert_close(page.layers[0].ops[1].width, 2.0 * scale);
    }

    #[test]
    fn wide_background_keeps_its_width() {
        let doc = document("pdf", vec![inked_page(vec![line()])], Some(b"%PDF".to_vec()));
        let source = FixedPages(vec![(842.0, 595.0)]);
        let page = &PageCompositor::new(&ExportConfig::default())
            .compose(&doc, Some(&source))
            .unwrap()[0];

        assert_close(page.width, 842.0);
        assert_close(page.height, 842.0 * 1872.0 / 1404.0);
    }

    #[test]
    fn background_ignored_without_pdf_payload() {
        let source = FixedPages(vec![(842.0, 595.0)]);
        let notebook = document("notebook", vec![inked_page(vec![line()])], Some(b"x".to_vec()));
        let no_payload = document("pdf", vec![inked_page(vec![line()])], None);

        for doc in [notebook, no_payload] {
            let page = &PageCompositor::new(&ExportConfig::default())
                .compose(&doc, Some(&source))
                .unwrap()[0];
            assert!(page.background.is_none());
            assert_close(page.width, DEVICE_WIDTH_PT);
        }
    }

    #[test]
    fn missing_background_page_falls_back_to_device_size() {
        let doc = document(
            "pdf",
            vec![inked_page(vec![line()]), inked_page(vec![line()])],
            Some(b"%PDF".to_vec()),
        );
        let source = FixedPages(vec![(612.0, 792.0)]);
        let pages = PageCompositor::new(&ExportConfig::default())
            .compose(&doc, Some(&source))
            .unwrap();
        assert!(pages[0].background.is_some());
        assert!(pages[1].background.is_none());
        assert_close(pages[1].height, DEVICE_HEIGHT_PT);
    }

    #[test]
    fn annotations_only_sizes_but_does_not_place_background() {
        let doc = document("pdf", vec![inked_page(vec![line()])], Some(b"%PDF".to_vec()));
        let source = FixedPages(vec![(612.0, 792.0)]);
        let config = ExportConfig {
            annotations_only: true,
            ..ExportConfig::default()
        };
        let page = &PageCompositor::new(&config).compose(&doc, Some(&source)).unwrap()[0];
        assert!(page.background.is_none());
        assert_close(page.width, 612.0);
        assert_close(page.height, 816.0);
    }

    #[test]
    fn highlights_grouped_and_flipped_to_page_space() {
        let marker = Stroke::new(
            BrushType::Highlighter,
            BrushColor::Black,
            vec![seg(100.0, 500.0), seg(120.0, 500.0)],
        );
        let mut page = inked_page(vec![marker]);
        page.metadata = PageMetadata {
            layers: vec![LayerMetadata { name: "Notes".into() }],
        };
        page.highlights = PageHighlights {
            layers: vec![vec![HighlightSpan {
                start: 0,
                length: 4,
                text: "word".into(),
                color: 3,
                rects: vec![SpanRect {
                    x: 110.0,
                    y: 499.0,
                    width: 30.0,
                    height: 4.0,
                }],
            }]],
        };

        let doc = document("notebook", vec![page], None);
        let composed = &PageCompositor::new(&ExportConfig::default()).compose(&doc, None).unwrap()[0];

        assert_eq!(composed.layers[0].name, "Notes");
        assert!(composed.layers[0].ops.is_empty());
        assert_eq!(composed.highlights.len(), 1);

        let h = &composed.highlights[0];
        assert_eq!(h.contents, "word");
        assert!(h.rect.ll.x <= h.rect.ur.x && h.rect.ll.y <= h.rect.ur.y);
        assert_close(h.rect.ll.x, 98.0 * PT_PER_PX);
        assert_close(h.rect.ur.x, 140.0 * PT_PER_PX);
        assert_close(h.rect.ur.y, DEVICE_HEIGHT_PT - 498.0 * PT_PER_PX);
        assert_close(h.rect.ll.y, DEVICE_HEIGHT_PT - 503.0 * PT_PER_PX);
        assert_eq!(h.quad_points.len(), 8);
        assert_close(h.quad_points.points()[0].y, DEVICE_HEIGHT_PT - 502.0 * PT_PER_PX);
    }
}
