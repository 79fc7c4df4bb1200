// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Author tag stamped on every generated highlight annotation.
pub const DEFAULT_HIGHLIGHT_AUTHOR: &str = "reMarkable";

/// Settings controlling how an archive is turned into a PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Emit every page, including pages that carry no stroke data.
    pub all_pages: bool,
    /// Export strokes and highlights without compositing the background PDF.
    pub annotations_only: bool,
    /// Author written into each highlight annotation.
    pub highlight_author: String,
    /// Title for the PDF /Info dictionary. Falls back to the archive UUID.
    pub title: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            all_pages: false,
            annotations_only: false,
            highlight_author: DEFAULT_HIGHLIGHT_AUTHOR.to_string(),
            title: None,
        }
    }
}

impl ExportConfig {
    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        debug!(path = %path.display(), ?config, "export config loaded");
        Ok(config)
    }

    /// Persist the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
