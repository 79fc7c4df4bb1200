// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// inkwerk-archive — Reads notebook export archives.
//
// Provides the container reader (zip entries correlated by name into a
// `Document`), the document model, and the `.lines` stroke decoder.

pub mod lines;
pub mod model;
pub mod reader;

pub use lines::LinesDecoder;
pub use model::{
    Content, Document, FileType, HighlightSpan, LayerMetadata, Page, PageHighlights,
    PageMetadata, SpanRect,
};
pub use reader::{ContainerReader, StrokeDecoder};
