// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inkwerk-render — Turns a decoded document into a PDF.
//
// Provides the geometry kernel, highlight grouping, per-brush stroke
// painting, page composition, and the PDF sink (stroke writer, background
// import, highlight annotations).

pub mod compositor;
pub mod geometry;
pub mod highlight;
pub mod painter;
pub mod pdf;

use std::path::Path;

use inkwerk_archive::{Document, FileType};
use inkwerk_core::config::ExportConfig;
use inkwerk_core::error::{InkwerkError, Result};
use tracing::{info, instrument};

pub use compositor::{BackgroundSource, ComposedPage, PageCompositor};
pub use highlight::{Highlight, HighlightStyle};
pub use painter::StrokePainter;
pub use pdf::{PdfReader, PdfWriter};

/// Render `document` as a PDF and return its bytes.
#[instrument(skip_all, fields(uuid = %document.uuid))]
pub fn render_pdf(document: &Document, config: &ExportConfig) -> Result<Vec<u8>> {
    let background = match (document.content.kind(), &document.payload) {
        (FileType::Pdf, Some(payload)) => Some(PdfReader::from_bytes(payload)?),
        _ => None,
    };

    let pages = PageCompositor::new(config).compose(
        document,
        background.as_ref().map(|r| r as &dyn BackgroundSource),
    )?;
    if pages.is_empty() {
        return Err(InkwerkError::EmptyDocument);
    }

    let title = config.title.clone().unwrap_or_else(|| document.uuid.clone());
    let strokes = PdfWriter::new(title).write(&pages);

    let placed = background.as_ref().filter(|_| !config.annotations_only);
    let output = pdf::annotate(&strokes, &pages, placed)?;

    info!(pages = pages.len(), bytes = output.len(), "PDF rendered");
    Ok(output)
}

/// Render `document` and write the PDF to `path`.
pub fn render_to_file(document: &Document, config: &ExportConfig, path: impl AsRef<Path>) -> Result<()> {
    let bytes = render_pdf(document, config)?;
    std::fs::write(path.as_ref(), &bytes)?;
    info!("Wrote PDF to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwerk_archive::{Content, HighlightSpan, Page, PageHighlights, SpanRect};
    use inkwerk_core::{BrushColor, BrushType, Layer, Segment, Stroke, StrokeData};

    fn stroke(brush: BrushType, y: f32) -> Stroke {
        let segments = (0..5)
            .map(|i| Segment {
                x: 100.0 + i as f32 * 20.0,
                y,
                width: 3.0,
                pressure: 0.9,
                ..Segment::default()
            })
            .collect();
        Stroke::new(brush, BrushColor::Black, segments)
    }

    fn document(file_type: &str, payload: Option<Vec<u8>>) -> Document {
        let mut inked = Page {
            data: Some(StrokeData {
                version: 5,
                layers: vec![Layer {
                    strokes: vec![
                        stroke(BrushType::BallPointV5, 400.0),
                        stroke(BrushType::HighlighterV5, 800.0),
                    ],
                }],
            }),
            ..Page::default()
        };
        inked.highlights = PageHighlights {
            layers: vec![vec![HighlightSpan {
                start: 0,
                length: 5,
                text: "hello".into(),
                color: 3,
                rects: vec![SpanRect {
                    x: 200.0,
                    y: 1200.0,
                    width: 80.0,
                    height: 20.0,
                }],
            }]],
        };

        Document {
            uuid: "render-test".into(),
            content: Content {
                file_type: file_type.into(),
                page_count: 2,
                ..Content::default()
            },
            pages: vec![inked, Page::default()],
            payload,
        }
    }

    fn annotation_count(bytes: &[u8]) -> usize {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        doc.objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .filter(|d| d.get(b"Subtype").and_then(lopdf::Object::as_name).ok() == Some(b"Highlight".as_slice()))
            .count()
    }

    #[test]
    fn notebook_renders_strokes_and_highlights() {
        let bytes = render_pdf(&document("notebook", None), &ExportConfig::default()).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(annotation_count(&bytes), 2);
    }

    #[test]
    fn all_pages_keeps_blank_pages() {
        let config = ExportConfig {
            all_pages: true,
            ..ExportConfig::default()
        };
        let bytes = render_pdf(&document("notebook", None), &config).unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn pdf_payload_is_drawn_as_background() {
        let payload = pdf::reader::tests::sample_pdf(&[(612, 792), (612, 792)]);
        let bytes = render_pdf(&document("pdf", Some(payload)), &ExportConfig::default()).unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        assert!(String::from_utf8_lossy(&content).contains("/InkBg Do"));
    }

    #[test]
    fn annotations_only_omits_background() {
        let payload = pdf::reader::tests::sample_pdf(&[(612, 792)]);
        let config = ExportConfig {
            annotations_only: true,
            ..ExportConfig::default()
        };
        let bytes = render_pdf(&document("pdf", Some(payload)), &config).unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        assert!(!String::from_utf8_lossy(&content).contains("/InkBg Do"));
        assert_eq!(annotation_count(&bytes), 2);
    }

    #[test]
    fn corrupt_payload_is_reported() {
        let result = render_pdf(&document("pdf", Some(b"garbage".to_vec())), &ExportConfig::default());
        assert!(matches!(result, Err(InkwerkError::Pdf(_))));
    }

    #[test]
    fn nothing_to_export_is_an_error() {
        let mut doc = document("notebook", None);
        doc.pages = vec![Page::default()];
        assert!(matches!(
            render_pdf(&doc, &ExportConfig::default()),
            Err(InkwerkError::EmptyDocument)
        ));
    }

    #[test]
    fn writes_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        render_to_file(&document("notebook", None), &ExportConfig::default(), &path).unwrap();
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
    }
}
