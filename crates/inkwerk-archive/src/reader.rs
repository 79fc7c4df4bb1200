// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Container reader — rebuilds a `Document` from an export archive.
//
// Entries are correlated by naming convention only: the content descriptor
// is found by extension, per-page files by the numeric index in their stem,
// and highlight files by the page identifier listed in the descriptor.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use inkwerk_core::StrokeData;
use inkwerk_core::error::{InkwerkError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use crate::lines::LinesDecoder;
use crate::model::{Content, Document, Page};

pub const CONTENT_EXT: &str = ".content";
pub const PAGEDATA_EXT: &str = ".pagedata";
pub const STROKE_EXT: &str = ".rm";
pub const THUMBNAIL_EXT: &str = ".jpg";
pub const JSON_EXT: &str = ".json";
pub const HIGHLIGHTS_DIR: &str = "highlights";

/// Largest page count a descriptor may declare.
pub const MAX_PAGE_COUNT: usize = 100_000;
/// Upper bound on the buffer reserved up front from an entry's declared size.
const ENTRY_PREALLOC_LIMIT: usize = 1 << 20;

/// Turns the raw bytes of one stroke file into decoded layers.
pub trait StrokeDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<StrokeData>;
}

/// Name of one archive entry, split the way lookups need it.
#[derive(Debug, Clone)]
struct Entry {
    /// Position in the zip central directory.
    index: usize,
    path: String,
    /// Basename without extension.
    stem: String,
    /// Final extension including the dot, or empty.
    ext: String,
}

impl Entry {
    fn new(index: usize, path: &str) -> Self {
        let basename = path.rsplit('/').next().unwrap_or(path);
        let (stem, ext) = split_ext(basename);
        Self {
            index,
            path: path.to_string(),
            stem: stem.to_string(),
            ext: ext.to_string(),
        }
    }

    /// Whether a parent directory segment is named `dir`, either bare or as
    /// the `<uuid>.<dir>` folder the device writes.
    fn is_under(&self, dir: &str) -> bool {
        let mut segments: Vec<&str> = self.path.split('/').collect();
        segments.pop();
        segments
            .iter()
            .any(|segment| *segment == dir || split_ext(segment).1.strip_prefix('.') == Some(dir))
    }
}

/// Split a filename into (stem, extension) at the last dot.
fn split_ext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => name.split_at(pos),
        None => (name, ""),
    }
}

/// Reads export archives into [`Document`]s.
///
/// Decoding is all-or-nothing: any malformed entry aborts the read and no
/// partial document is returned.
pub struct ContainerReader<D = LinesDecoder> {
    decoder: D,
}

impl ContainerReader<LinesDecoder> {
    /// Reader using the built-in `.lines` stroke decoder.
    pub fn new() -> Self {
        Self {
            decoder: LinesDecoder,
        }
    }
}

impl Default for ContainerReader<LinesDecoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: StrokeDecoder> ContainerReader<D> {
    pub fn with_decoder(decoder: D) -> Self {
        Self { decoder }
    }

    /// Open and decode an archive from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Document> {
        let file = File::open(path.as_ref())?;
        self.read(BufReader::new(file))
    }

    /// Decode an archive already held in memory.
    pub fn read_bytes(&self, data: &[u8]) -> Result<Document> {
        self.read(Cursor::new(data))
    }

    /// Decode an archive from any random-access reader.
    #[instrument(skip_all)]
    pub fn read<R: Read + Seek>(&self, reader: R) -> Result<Document> {
        let mut archive = ZipArchive::new(reader)?;
        let entries = index_entries(&mut archive)?;

        let content_entry = unique(&entries, CONTENT_EXT)?;
        let content: Content = parse_json(&mut archive, content_entry)?;
        let uuid = content_entry.stem.clone();
        debug!(
            %uuid,
            file_type = %content.file_type,
            page_count = content.page_count,
            "content descriptor read"
        );

        let mut document = Document {
            uuid,
            content,
            pages: Vec::new(),
            payload: None,
        };

        // Uploading and re-downloading a document yields a zero page count.
        if document.content.page_count <= 0 {
            warn!(uuid = %document.uuid, "archive declares no pages");
            return Ok(document);
        }
        let page_count = usize::try_from(document.content.page_count)
            .ok()
            .filter(|&count| count <= MAX_PAGE_COUNT)
            .ok_or_else(|| {
                InkwerkError::MalformedArchive(format!(
                    "page count {} out of range (at most {MAX_PAGE_COUNT})",
                    document.content.page_count
                ))
            })?;
        let mut pages = Vec::new();
        pages.try_reserve_exact(page_count).map_err(|err| {
            InkwerkError::MalformedArchive(format!("cannot allocate {page_count} pages: {err}"))
        })?;
        pages.resize(page_count, Page::default());
        document.pages = pages;

        self.read_pagedata(&mut archive, &entries, &mut document)?;
        self.read_payload(&mut archive, &entries, &mut document)?;
        self.read_strokes(&mut archive, &entries, &mut document)?;
        self.read_thumbnails(&mut archive, &entries, &mut document)?;
        self.read_metadata(&mut archive, &entries, &mut document)?;
        self.read_highlights(&mut archive, &entries, &mut document)?;

        info!(
            uuid = %document.uuid,
            pages = document.pages.len(),
            with_strokes = document.pages.iter().filter(|p| p.has_strokes()).count(),
            payload = document.payload.is_some(),
            "archive decoded"
        );
        Ok(document)
    }

    /// Assign the i-th template line to page i.
    fn read_pagedata<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        entries: &[Entry],
        document: &mut Document,
    ) -> Result<()> {
        let entry = unique(entries, PAGEDATA_EXT)?;
        let bytes = read_entry(archive, entry)?;
        let text = String::from_utf8(bytes).map_err(|_| {
            InkwerkError::MalformedArchive(format!("{} is not valid UTF-8", entry.path))
        })?;

        let mut assigned = 0;
        for (page, line) in document.pages.iter_mut().zip(text.lines()) {
            page.pagedata = line.to_string();
            assigned += 1;
        }
        if assigned < document.pages.len() {
            debug!(
                assigned,
                pages = document.pages.len(),
                "pagedata has fewer lines than pages"
            );
        }
        Ok(())
    }

    /// Extract the embedded original document when exactly one is present.
    fn read_payload<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        entries: &[Entry],
        document: &mut Document,
    ) -> Result<()> {
        if document.content.file_type.is_empty() {
            return Ok(());
        }
        let ext = format!(".{}", document.content.file_type);
        let candidates = with_ext(entries, &ext);
        match candidates.as_slice() {
            [entry] => {
                document.payload = Some(read_entry(archive, entry)?);
                debug!(path = %entry.path, "payload extracted");
            }
            [] => {}
            many => warn!(count = many.len(), %ext, "ambiguous payload entries ignored"),
        }
        Ok(())
    }

    fn read_strokes<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        entries: &[Entry],
        document: &mut Document,
    ) -> Result<()> {
        for entry in with_ext(entries, STROKE_EXT) {
            let idx = page_index(&entry.stem, entry, document.pages.len())?;
            let bytes = read_entry(archive, entry)?;
            document.pages[idx].data = Some(self.decoder.decode(&bytes)?);
        }
        Ok(())
    }

    fn read_thumbnails<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        entries: &[Entry],
        document: &mut Document,
    ) -> Result<()> {
        for entry in with_ext(entries, THUMBNAIL_EXT) {
            let idx = page_index(&entry.stem, entry, document.pages.len())?;
            document.pages[idx].thumbnail = Some(read_entry(archive, entry)?);
        }
        Ok(())
    }

    /// Per-page metadata files are named `<index>-metadata.json`.
    fn read_metadata<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        entries: &[Entry],
        document: &mut Document,
    ) -> Result<()> {
        for entry in with_ext(entries, JSON_EXT) {
            if !entry.stem.contains("metadata") {
                continue;
            }
            let leading = entry.stem.split('-').next().unwrap_or_default();
            let idx = page_index(leading, entry, document.pages.len())?;
            document.pages[idx].metadata = parse_json(archive, entry)?;
        }
        Ok(())
    }

    /// Highlight files live under `highlights/` and are named after the page
    /// identifier from the content descriptor.
    fn read_highlights<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        entries: &[Entry],
        document: &mut Document,
    ) -> Result<()> {
        for entry in with_ext(entries, JSON_EXT) {
            if !entry.is_under(HIGHLIGHTS_DIR) {
                continue;
            }
            let Some(idx) = document.content.page_index(&entry.stem) else {
                debug!(path = %entry.path, "highlight file for unknown page ignored");
                continue;
            };
            if idx >= document.pages.len() {
                return Err(InkwerkError::MalformedArchive(format!(
                    "{} refers to page {} of {}",
                    entry.path,
                    idx,
                    document.pages.len()
                )));
            }
            document.pages[idx].highlights = parse_json(archive, entry)?;
        }
        Ok(())
    }
}

fn index_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<Entry>> {
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        entries.push(Entry::new(i, file.name()));
    }
    Ok(entries)
}

/// All entries whose final extension is exactly `ext` (case-sensitive).
fn with_ext<'a>(entries: &'a [Entry], ext: &str) -> Vec<&'a Entry> {
    entries.iter().filter(|e| e.ext == ext).collect()
}

/// The single entry carrying `ext`; zero or several is malformed.
fn unique<'a>(entries: &'a [Entry], ext: &str) -> Result<&'a Entry> {
    match with_ext(entries, ext).as_slice() {
        [entry] => Ok(*entry),
        [] => Err(InkwerkError::MalformedArchive(format!(
            "archive does not contain a {ext} entry"
        ))),
        many => Err(InkwerkError::MalformedArchive(format!(
            "archive contains {} {ext} entries, expected one",
            many.len()
        ))),
    }
}

fn page_index(raw: &str, entry: &Entry, page_count: usize) -> Result<usize> {
    let idx: usize = raw.parse().map_err(|_| {
        InkwerkError::MalformedArchive(format!("no page index in filename {}", entry.path))
    })?;
    if idx >= page_count {
        return Err(InkwerkError::MalformedArchive(format!(
            "{} refers to page {idx} but the document has {page_count} pages",
            entry.path
        )));
    }
    Ok(idx)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, entry: &Entry) -> Result<Vec<u8>> {
    let mut file = archive.by_index(entry.index)?;
    // The declared size comes from the zip header and is not trusted.
    let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
    let mut buf = Vec::with_capacity(declared.min(ENTRY_PREALLOC_LIMIT));
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

fn parse_json<T: DeserializeOwned, R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entry: &Entry,
) -> Result<T> {
    let bytes = read_entry(archive, entry)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| InkwerkError::MalformedArchive(format!("{}: {err}", entry.path)))
}
