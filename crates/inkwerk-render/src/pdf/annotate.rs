// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Post-processing of the stroke PDF with `lopdf`: draws background pages
// beneath the strokes and attaches highlight annotations.

use inkwerk_core::error::{InkwerkError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, instrument, warn};

use crate::compositor::ComposedPage;
use crate::highlight::Highlight;
use crate::pdf::reader::PdfReader;

/// Resource name under which the background form is registered.
const BACKGROUND_XOBJECT: &str = "InkBg";
/// Annotation flag bit 3: print the annotation.
const ANNOT_FLAG_PRINT: i64 = 4;

fn pdf_err(context: &str) -> impl Fn(lopdf::Error) -> InkwerkError + '_ {
    move |err| InkwerkError::Pdf(format!("{context}: {err}"))
}

/// Add backgrounds and highlight annotations to `stroke_pdf`, whose pages
/// correspond one-to-one with `pages`.
#[instrument(skip_all, fields(pages = pages.len(), background = background.is_some()))]
pub fn annotate(
    stroke_pdf: &[u8],
    pages: &[ComposedPage],
    background: Option<&PdfReader>,
) -> Result<Vec<u8>> {
    let needs_background = background.is_some() && pages.iter().any(|p| p.background.is_some());
    if !needs_background && pages.iter().all(|p| p.highlights.is_empty()) {
        return Ok(stroke_pdf.to_vec());
    }

    let mut doc = Document::load_mem(stroke_pdf).map_err(pdf_err("failed to reload stroke PDF"))?;
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if page_ids.len() != pages.len() {
        return Err(InkwerkError::Pdf(format!(
            "stroke PDF has {} pages, expected {}",
            page_ids.len(),
            pages.len()
        )));
    }

    let mut annotations = 0usize;
    for (page_id, page) in page_ids.into_iter().zip(pages) {
        if let (Some(placement), Some(reader)) = (page.background, background) {
            let Some([llx, lly, _, _]) = reader.media_box(placement.page_index) else {
                warn!(index = page.index, "background page vanished, skipping");
                continue;
            };
            let form_id = reader.import_page(&mut doc, placement.page_index)?;
            doc.add_xobject(page_id, BACKGROUND_XOBJECT, form_id)
                .map_err(pdf_err("cannot register background form"))?;

            // Top-left aligned: the MediaBox origin maps to the page's
            // left edge, `placement.height` below its top edge.
            let tx = 0.0 - llx;
            let ty = page.height - placement.height - lly;
            let content = format!("q 1 0 0 1 {tx} {ty} cm /{BACKGROUND_XOBJECT} Do Q\n");
            prepend_content(&mut doc, page_id, content.into_bytes())?;
        }

        for highlight in &page.highlights {
            let annot_id = doc.add_object(highlight_annotation(highlight, page_id));
            add_annotation_to_page(&mut doc, page_id, annot_id)?;
            annotations += 1;
        }
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| InkwerkError::Pdf(format!("failed to serialise annotated PDF: {}", err)))?;

    debug!(annotations, bytes = output.len(), "annotations written");
    Ok(output)
}

fn reals(values: impl IntoIterator<Item = f32>) -> Object {
    Object::Array(values.into_iter().map(Object::Real).collect())
}

/// PDF text string: literal for ASCII, UTF-16BE with byte order mark
/// otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn highlight_annotation(highlight: &Highlight, page_id: ObjectId) -> Dictionary {
    let mut annot = Dictionary::new();
    annot.set("Type", Object::Name(b"Annot".to_vec()));
    annot.set("Subtype", Object::Name(b"Highlight".to_vec()));
    annot.set("Rect", reals(highlight.rect.to_list()));
    annot.set("QuadPoints", reals(highlight.quad_points.to_list()));
    annot.set("C", reals(highlight.color));
    annot.set("CA", Object::Real(highlight.opacity));
    annot.set("T", text_string(&highlight.author));
    annot.set("Contents", text_string(&highlight.contents));
    annot.set("F", Object::Integer(ANNOT_FLAG_PRINT));
    annot.set("P", Object::Reference(page_id));
    annot
}

fn add_annotation_to_page(doc: &mut Document, page_id: ObjectId, annot_id: ObjectId) -> Result<()> {
    let annots_ref = match doc.get_dictionary(page_id).map(|d| d.get(b"Annots")) {
        Ok(Ok(Object::Reference(id))) => Some(*id),
        _ => None,
    };

    if let Some(id) = annots_ref
        && let Ok(Object::Array(arr)) = doc.get_object_mut(id)
    {
        arr.push(Object::Reference(annot_id));
        return Ok(());
    }

    let page_dict = doc
        .get_dictionary_mut(page_id)
        .map_err(pdf_err("cannot open page for annotation"))?;
    if let Ok(Object::Array(arr)) = page_dict.get_mut(b"Annots") {
        arr.push(Object::Reference(annot_id));
    } else {
        page_dict.set("Annots", Object::Array(vec![Object::Reference(annot_id)]));
    }
    Ok(())
}

/// Insert a content stream ahead of the page's existing contents.
fn prepend_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let page_dict = doc
        .get_dictionary_mut(page_id)
        .map_err(pdf_err("cannot open page for background"))?;

    let contents = match page_dict.get(b"Contents") {
        Ok(Object::Array(existing)) => {
            let mut contents = Vec::with_capacity(existing.len() + 1);
            contents.push(Object::Reference(stream_id));
            contents.extend(existing.iter().cloned());
            contents
        }
        Ok(existing @ Object::Reference(_)) => vec![Object::Reference(stream_id), existing.clone()],
        _ => vec![Object::Reference(stream_id)],
    };
    page_dict.set("Contents", Object::Array(contents));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{BackgroundPlacement, ComposedLayer};
    use crate::geometry::{Point, Rect};
    use crate::highlight::HighlightStyle;
    use crate::painter::{CapStyle, PathOp, PathOpKind};
    use crate::pdf::reader::tests::sample_pdf;
    use crate::pdf::writer::PdfWriter;
    use inkwerk_core::Rgb8;

    fn composed(background: Option<BackgroundPlacement>, highlights: Vec<Highlight>) -> ComposedPage {
        let op = |kind, x| PathOp {
            kind,
            point: Point::new(x, 300.0),
            width: 1.0,
            color: Rgb8::BLACK,
            cap: CapStyle::Round,
        };
        ComposedPage {
            index: 0,
            width: 612.0,
            height: 816.0,
            background,
            layers: vec![ComposedLayer {
                name: "Layer 1".into(),
                ops: vec![op(PathOpKind::Move, 10.0), op(PathOpKind::Line, 200.0)],
            }],
            highlights,
        }
    }

    fn highlight(contents: &str) -> Highlight {
        let rect = Rect::new(Point::new(50.0, 500.0), Point::new(150.0, 512.0));
        HighlightStyle::default().highlight(contents, rect, rect.to_quad_points())
    }

    fn first_page(doc: &Document) -> &Dictionary {
        let id = *doc.get_pages().get(&1).unwrap();
        doc.get_dictionary(id).unwrap()
    }

    #[test]
    fn without_extras_the_pdf_is_untouched() {
        let pages = vec![composed(None, Vec::new())];
        let strokes = PdfWriter::new("t").write(&pages);
        assert_eq!(annotate(&strokes, &pages, None).unwrap(), strokes);
    }

    #[test]
    fn highlights_become_annotations() {
        let pages = vec![composed(None, vec![highlight("note"), highlight("Grüße")])];
        let strokes = PdfWriter::new("t").write(&pages);
        let out = annotate(&strokes, &pages, None).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let annots = first_page(&doc).get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 2);

        let annot = doc.get_dictionary(annots[0].as_reference().unwrap()).unwrap();
        assert_eq!(annot.get(b"Subtype").unwrap().as_name().unwrap(), b"Highlight");
        assert_eq!(annot.get(b"QuadPoints").unwrap().as_array().unwrap().len(), 8);
        assert_eq!(annot.get(b"Contents").unwrap().as_str().unwrap(), b"note");
        assert_eq!(annot.get(b"T").unwrap().as_str().unwrap(), b"reMarkable");
        assert_eq!(annot.get(b"F").unwrap().as_i64().unwrap(), 4);

        let unicode = doc.get_dictionary(annots[1].as_reference().unwrap()).unwrap();
        assert!(unicode.get(b"Contents").unwrap().as_str().unwrap().starts_with(&[0xFE, 0xFF]));
    }

    #[test]
    fn background_form_is_drawn_first() {
        let reader = PdfReader::from_bytes(&sample_pdf(&[(612, 792)])).unwrap();
        let placement = BackgroundPlacement {
            page_index: 0,
            width: 612.0,
            height: 792.0,
        };
        let pages = vec![composed(Some(placement), Vec::new())];
        let strokes = PdfWriter::new("t").write(&pages);
        let out = annotate(&strokes, &pages, Some(&reader)).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();
        assert!(content.starts_with("q 1 0 0 1 0 24 cm /InkBg Do Q"));

        let has_form = doc.objects.values().any(|o| {
            o.as_stream().is_ok_and(|s| {
                s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Form".as_slice())
            })
        });
        assert!(has_form);
    }

    #[test]
    fn page_count_mismatch_is_rejected() {
        let pages = vec![composed(None, vec![highlight("a")])];
        let strokes = PdfWriter::new("t").write(&pages);
        let two = vec![pages[0].clone(), pages[0].clone()];
        assert!(matches!(annotate(&strokes, &two, None), Err(InkwerkError::Pdf(_))));
    }
}
