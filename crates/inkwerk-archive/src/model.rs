// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document model reconstructed from an export archive.

use std::collections::BTreeMap;

use inkwerk_core::StrokeData;
use serde::{Deserialize, Serialize};

/// Container flavour named by the content descriptor's `fileType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    /// Annotated PDF; the payload is the original document.
    Pdf,
    /// Native notebook without a background document.
    Notebook,
    Epub,
    Other(String),
}

impl FileType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pdf" => Self::Pdf,
            "notebook" | "" => Self::Notebook,
            "epub" => Self::Epub,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Global content descriptor (the `.content` entry).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Content {
    pub file_type: String,
    pub page_count: i64,
    /// Page identifiers in page order; highlight files are named after them.
    pub pages: Vec<String>,
    // Reader settings are carried through untouched; devices write them
    // as null, integers or floats depending on firmware.
    pub orientation: Option<String>,
    pub last_opened_page: Option<f64>,
    pub dummy_document: Option<bool>,
    pub font_name: Option<String>,
    pub line_height: Option<f64>,
    pub margins: Option<f64>,
    pub text_scale: Option<f64>,
    pub extra_metadata: BTreeMap<String, serde_json::Value>,
    pub transform: Option<serde_json::Value>,
}

impl Content {
    pub fn kind(&self) -> FileType {
        FileType::parse(&self.file_type)
    }

    /// Index of the page carrying the given identifier.
    pub fn page_index(&self, page_id: &str) -> Option<usize> {
        self.pages.iter().position(|id| id == page_id)
    }
}

/// Per-layer display metadata from `<index>-metadata.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMetadata {
    pub layers: Vec<LayerMetadata>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerMetadata {
    pub name: String,
}

/// One text-selection highlight as recorded by the reader application.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightSpan {
    /// Offset of the first selected character in the page text.
    pub start: i64,
    pub length: i64,
    pub text: String,
    pub color: i64,
    /// Selection rectangles in device coordinates.
    pub rects: Vec<SpanRect>,
}

impl HighlightSpan {
    /// Offset one past the last selected character.
    pub fn end(&self) -> i64 {
        self.start + self.length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Contents of `highlights/<pageId>.json`: one span list per layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageHighlights {
    #[serde(rename = "highlights", default)]
    pub layers: Vec<Vec<HighlightSpan>>,
}

impl PageHighlights {
    pub fn layer(&self, idx: usize) -> &[HighlightSpan] {
        self.layers.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// One page of the document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Decoded strokes, absent when the page was never written on.
    pub data: Option<StrokeData>,
    /// Page template name from the `.pagedata` entry.
    pub pagedata: String,
    pub metadata: PageMetadata,
    pub highlights: PageHighlights,
    pub thumbnail: Option<Vec<u8>>,
}

impl Page {
    pub fn has_strokes(&self) -> bool {
        self.data.is_some()
    }

    /// Display name of a layer, falling back to "Layer N".
    pub fn layer_name(&self, idx: usize) -> String {
        self.metadata
            .layers
            .get(idx)
            .map(|layer| layer.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Layer {}", idx + 1))
    }
}

/// Top-level aggregate decoded from one archive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Archive identifier, taken from the content descriptor's filename.
    pub uuid: String,
    pub content: Content,
    /// Exactly `content.page_count` entries, or none for a page-less archive.
    pub pages: Vec<Page>,
    /// Embedded original document, e.g. the background PDF.
    pub payload: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_parses_device_json() {
        let json = r#"{
            "extraMetadata": {"LastTool": "Ballpoint"},
            "fileType": "pdf",
            "lastOpenedPage": 2,
            "orientation": "portrait",
            "pageCount": 3,
            "pages": ["a", "b", "c"],
            "textScale": 1
        }"#;
        let content: Content = serde_json::from_str(json).unwrap();
        assert_eq!(content.kind(), FileType::Pdf);
        assert_eq!(content.page_count, 3);
        assert_eq!(content.page_index("c"), Some(2));
        assert_eq!(content.page_index("z"), None);
    }

    #[test]
    fn loosely_typed_reader_settings_are_accepted() {
        let json = r#"{
            "fileType": "notebook",
            "pageCount": 1,
            "fontName": null,
            "margins": 125.5,
            "lineHeight": -1,
            "orientation": null
        }"#;
        let content: Content = serde_json::from_str(json).unwrap();
        assert_eq!(content.kind(), FileType::Notebook);
        assert_eq!(content.font_name, None);
        assert_eq!(content.margins, Some(125.5));
        assert_eq!(content.line_height, Some(-1.0));
    }

    #[test]
    fn highlights_parse_per_layer() {
        let json = r#"{"highlights": [[
            {"color": 3, "length": 5, "start": 10, "text": "hello",
             "rects": [{"x": 1.0, "y": 2.0, "width": 30.0, "height": 8.0}]}
        ]]}"#;
        let highlights: PageHighlights = serde_json::from_str(json).unwrap();
        assert_eq!(highlights.layer(0).len(), 1);
        assert_eq!(highlights.layer(0)[0].end(), 15);
        assert!(highlights.layer(1).is_empty());
    }

    #[test]
    fn layer_names_fall_back() {
        let page = Page {
            metadata: PageMetadata {
                layers: vec![LayerMetadata {
                    name: "Sketch".into(),
                }],
            },
            ..Default::default()
        };
        assert_eq!(page.layer_name(0), "Sketch");
        assert_eq!(page.layer_name(1), "Layer 2");
    }
}
