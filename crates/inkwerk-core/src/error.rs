// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Inkwerk.

use thiserror::Error;

/// Top-level error type for all Inkwerk operations.
#[derive(Debug, Error)]
pub enum InkwerkError {
    // -- Archive errors --
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("the document has no pages")]
    EmptyDocument,

    #[error("stroke data could not be decoded: {0}")]
    DecodeFailure(String),

    // -- Rendering errors --
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    // -- Storage / persistence --
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, InkwerkError>;
