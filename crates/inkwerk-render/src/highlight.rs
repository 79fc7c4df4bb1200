// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Highlight records and the grouping passes that merge overlapping or
// adjacent highlights into single annotations.

use inkwerk_archive::HighlightSpan;
use inkwerk_core::config::{DEFAULT_HIGHLIGHT_AUTHOR, ExportConfig};
use inkwerk_core::Rgb8;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, QuadPoints, Rect};

/// Spans whose start lies at most this many characters past the previous
/// span's end are merged into one highlight.
pub const SPAN_MERGE_GAP: i64 = 10;

/// Ink used for every highlight annotation.
pub const HIGHLIGHT_YELLOW: Rgb8 = Rgb8::new(255, 240, 102);
/// Alpha of [`HIGHLIGHT_YELLOW`], out of 255.
pub const HIGHLIGHT_ALPHA: u8 = 77;

/// A highlight annotation in device or page space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub contents: String,
    pub rect: Rect,
    pub quad_points: QuadPoints,
    /// RGB channels in [0, 1].
    pub color: [f32; 3],
    pub opacity: f32,
    pub author: String,
}

impl Highlight {
    /// Merge `other` into `self`. Colour, opacity and author come from `self`.
    pub fn union(&self, other: &Highlight) -> Highlight {
        Highlight {
            contents: format!("{}{}", self.contents, other.contents),
            rect: self.rect.union(&other.rect),
            quad_points: self.quad_points.concat(&other.quad_points),
            color: self.color,
            opacity: self.opacity,
            author: self.author.clone(),
        }
    }

    pub fn intersects(&self, other: &Highlight) -> bool {
        self.rect.intersects(&other.rect)
    }
}

/// Appearance shared by all generated highlights.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightStyle {
    pub color: Rgb8,
    pub alpha: u8,
    pub author: String,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self::with_author(DEFAULT_HIGHLIGHT_AUTHOR)
    }
}

impl HighlightStyle {
    pub fn with_author(author: impl Into<String>) -> Self {
        Self {
            color: HIGHLIGHT_YELLOW,
            alpha: HIGHLIGHT_ALPHA,
            author: author.into(),
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::with_author(config.highlight_author.clone())
    }

    /// Build a highlight covering `rect` in this style.
    pub fn highlight(&self, contents: impl Into<String>, rect: Rect, quad_points: QuadPoints) -> Highlight {
        Highlight {
            contents: contents.into(),
            rect,
            quad_points,
            color: self.color.to_unit(),
            opacity: f32::from(self.alpha) / 255.0,
            author: self.author.clone(),
        }
    }

    /// Turn one text span into a highlight, or `None` if it has no rectangles.
    pub fn from_span(&self, span: &HighlightSpan) -> Option<Highlight> {
        let mut rects = span.rects.iter().map(|r| {
            Rect::new(Point::new(r.x, r.y), Point::new(r.x + r.width, r.y + r.height))
        });

        let first = rects.next()?;
        let mut bounds = first;
        let mut quad_points = first.to_quad_points();
        for rect in rects {
            bounds = bounds.union(&rect);
            quad_points = quad_points.concat(&rect.to_quad_points());
        }

        Some(self.highlight(span.text.clone(), bounds, quad_points))
    }
}

/// Merge intersecting highlights until no further merge is possible.
///
/// Each pass walks the list in order and folds every highlight into the
/// first group it intersects. Passes repeat while they shrink the list.
pub fn group_highlights(mut list: Vec<Highlight>) -> Vec<Highlight> {
    loop {
        let before = list.len();
        let mut grouped: Vec<Highlight> = Vec::with_capacity(before);

        'outer: for highlight in list {
            for group in grouped.iter_mut() {
                if highlight.intersects(group) {
                    *group = group.union(&highlight);
                    continue 'outer;
                }
            }
            grouped.push(highlight);
        }

        if grouped.len() == before {
            return grouped;
        }
        list = grouped;
    }
}

/// Convert the text spans of one layer into highlights, joining spans that
/// follow each other within [`SPAN_MERGE_GAP`] characters.
///
/// Spans without rectangles contribute no geometry but still count for
/// adjacency.
pub fn group_spans(spans: &[HighlightSpan], style: &HighlightStyle) -> Vec<Highlight> {
    let mut out = Vec::new();
    let mut note: Option<Highlight> = None;
    let mut cursor: Option<i64> = None;

    for span in spans {
        let breaks = cursor.is_some_and(|end| span.start - end > SPAN_MERGE_GAP);
        cursor = Some(span.end());
        if breaks {
            out.extend(note.take());
        }

        if let Some(highlight) = style.from_span(span) {
            note = Some(match note.take() {
                Some(current) => current.union(&highlight),
                None => highlight,
            });
        }
    }

    out.extend(note);
    out
}
