// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading the background document, writing strokes, and
// attaching backgrounds and highlight annotations.

pub mod annotate;
pub mod reader;
pub mod writer;

pub use annotate::annotate;
pub use reader::PdfReader;
pub use writer::PdfWriter;
