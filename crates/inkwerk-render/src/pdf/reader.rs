// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background PDF reader — loads the payload document with `lopdf`, reports
// page sizes, and copies single pages into another document as Form XObjects.

use std::collections::HashMap;
use std::path::Path;

use inkwerk_core::error::{InkwerkError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument, warn};

use crate::compositor::BackgroundSource;

/// Page tree inheritance is followed at most this many levels up.
const MAX_PARENT_DEPTH: usize = 32;

/// Read-only view of a background PDF.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page object IDs in page order.
    pages: Vec<ObjectId>,
}

impl PdfReader {
    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening background PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            InkwerkError::Pdf(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        Ok(Self::from_document(document))
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            InkwerkError::Pdf(format!("failed to load PDF from memory: {}", err))
        })?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: Document) -> Self {
        // get_pages is keyed by 1-indexed page number, already sorted.
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = pages.len(), "background PDF loaded");
        Self { document, pages }
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// MediaBox `[llx, lly, urx, ury]` of the zero-based page `index`,
    /// inherited from ancestor page tree nodes when the page lacks one.
    pub fn media_box(&self, index: usize) -> Option<[f32; 4]> {
        let page_id = *self.pages.get(index)?;
        let object = self.inherited(page_id, b"MediaBox")?;
        let array = self.resolve(object).as_array().ok()?;

        let mut values = array.iter().map(|v| self.resolve(v).as_float().ok());
        match (values.next(), values.next(), values.next(), values.next()) {
            (Some(Some(a)), Some(Some(b)), Some(Some(c)), Some(Some(d))) => {
                Some([a.min(c), b.min(d), a.max(c), b.max(d)])
            }
            _ => {
                warn!(index, "malformed MediaBox");
                None
            }
        }
    }

    /// Copy page `index` into `target` as a Form XObject whose bounding box is
    /// the page's MediaBox. Returns the new object ID.
    #[instrument(skip(self, target))]
    pub fn import_page(&self, target: &mut Document, index: usize) -> Result<ObjectId> {
        let page_id = *self.pages.get(index).ok_or_else(|| {
            InkwerkError::Pdf(format!(
                "page {} out of range (document has {} pages)",
                index + 1,
                self.pages.len()
            ))
        })?;
        let media_box = self.media_box(index).ok_or_else(|| {
            InkwerkError::Pdf(format!("page {} has no usable MediaBox", index + 1))
        })?;

        let content = self.document.get_page_content(page_id).map_err(|err| {
            InkwerkError::Pdf(format!("cannot read content of page {}: {}", index + 1, err))
        })?;

        let mut cloner = ObjectCloner::new(&self.document);
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "FormType" => 1,
            "BBox" => media_box.iter().map(|v| Object::Real(*v)).collect::<Vec<_>>(),
        };
        if let Some(resources) = self.inherited(page_id, b"Resources") {
            dict.set("Resources", cloner.clone_into(target, resources));
        }

        let form_id = target.add_object(Stream::new(dict, content));
        debug!(index, ?form_id, copied = cloner.copied.len(), "page imported as form");
        Ok(form_id)
    }

    // -- Helpers --------------------------------------------------------------

    /// Look up `key` on the page or its nearest ancestor that defines it.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut node = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Ok(value) = node.get(key) {
                return Some(value);
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            other => other,
        }
    }
}

impl BackgroundSource for PdfReader {
    fn page_size(&self, index: usize) -> Option<(f32, f32)> {
        self.media_box(index)
            .map(|[llx, lly, urx, ury]| (urx - llx, ury - lly))
    }
}

/// Deep-copies objects from one document into another, following references.
///
/// Each source object is copied once; repeated and cyclic references map to
/// the same target object. `/Parent` entries are dropped so that copying a
/// resource never drags in the source page tree.
struct ObjectCloner<'a> {
    source: &'a Document,
    copied: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCloner<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: HashMap::new(),
        }
    }

    fn clone_into(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Dictionary(dict) => Object::Dictionary(self.clone_dict(target, dict)),
            Object::Array(arr) => Object::Array(
                arr.iter()
                    .map(|item| self.clone_into(target, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.clone_dict(target, &stream.dict);
                Object::Stream(Stream::new(dict, stream.content.clone()))
            }
            Object::Reference(ref_id) => {
                if let Some(existing) = self.copied.get(ref_id) {
                    return Object::Reference(*existing);
                }
                match self.source.get_object(*ref_id) {
                    Ok(referenced) => {
                        // Reserve the ID first so cycles resolve to it.
                        let new_id = target.new_object_id();
                        self.copied.insert(*ref_id, new_id);
                        let cloned = self.clone_into(target, referenced);
                        target.objects.insert(new_id, cloned);
                        Object::Reference(new_id)
                    }
                    Err(err) => {
                        warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                        Object::Null
                    }
                }
            }
            other => other.clone(),
        }
    }

    fn clone_dict(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut new_dict = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            new_dict.set(key.clone(), self.clone_into(target, value));
        }
        new_dict
    }
}
