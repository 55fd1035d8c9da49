//! PDF document session: buffer, xref table, object cache and page list.

use std::fs::File;
use std::path::Path;

use bytes::Bytes;
use memmap2::Mmap;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::config::ParseOptions;
use crate::document::trailer::read_trailer_chain;
use crate::document::xref::{XrefEntry, XrefTable};
use crate::ensure_format;
use crate::error::{PdfError, Result};
use crate::model::objects::{IndirectRef, PdfDict, PdfObject};
use crate::parser::value::get_value;

#[derive(Clone)]
pub enum PdfBytes {
    Owned(Bytes),
    Shared(Bytes),
}

impl PdfBytes {
    const fn as_bytes(&self) -> &Bytes {
        match self {
            Self::Owned(data) => data,
            Self::Shared(data) => data,
        }
    }

    fn as_slice(&self) -> &[u8] {
        self.as_bytes().as_ref()
    }
}

/// An open PDF document.
///
/// Opening reads the trailer chain, the catalog, the Info dictionary and the
/// flattened page list. Objects are parsed on first access and cached for
/// the life of the document. After [`PdfDocument::close`] only cached
/// objects remain reachable.
pub struct PdfDocument {
    data: Option<PdfBytes>,
    pub(crate) options: ParseOptions,
    pub(crate) xref: XrefTable,
    pub(crate) trailers: Vec<PdfDict>,
    pub(crate) last_xref_section_offset: Option<u64>,
    pub(crate) root: PdfDict,
    pub(crate) root_ref: Option<IndirectRef>,
    pub(crate) info: PdfDict,
    pub(crate) info_ref: Option<IndirectRef>,
    pub(crate) page_tree_root: PdfDict,
    pub(crate) pages_ref: Option<IndirectRef>,
    pub(crate) pages: Vec<IndirectRef>,
    pub(crate) orig_pages: Vec<IndirectRef>,
    cache: FxHashMap<IndirectRef, PdfObject>,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    /// An empty document to be written from scratch.
    pub fn new() -> Self {
        Self::empty(ParseOptions::default())
    }

    fn empty(options: ParseOptions) -> Self {
        let mut xref = XrefTable::new();
        xref.finish_reading();
        Self {
            data: None,
            options,
            xref,
            trailers: Vec::new(),
            last_xref_section_offset: None,
            root: PdfDict::new(),
            root_ref: None,
            info: PdfDict::new(),
            info_ref: None,
            page_tree_root: PdfDict::new(),
            pages_ref: None,
            pages: Vec::new(),
            orig_pages: Vec::new(),
            cache: FxHashMap::default(),
        }
    }

    fn with_data(data: PdfBytes, options: ParseOptions) -> Result<Self> {
        let readable = data.as_slice().len() > options.start_offset;
        let mut doc = Self::empty(options);
        if readable {
            doc.data = Some(data);
            doc.xref = XrefTable::new();
            doc.read_pdf_info()?;
            doc.xref.finish_reading();
        }
        Ok(doc)
    }

    /// Parse a document held in memory. An empty buffer gives an empty document.
    pub fn from_bytes<D: AsRef<[u8]>>(data: D) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    pub fn from_bytes_with_options<D: AsRef<[u8]>>(data: D, options: ParseOptions) -> Result<Self> {
        Self::with_data(
            PdfBytes::Owned(Bytes::copy_from_slice(data.as_ref())),
            options,
        )
    }

    /// Parse shared bytes without copying.
    pub fn from_shared(data: Bytes, options: ParseOptions) -> Result<Self> {
        Self::with_data(PdfBytes::Shared(data), options)
    }

    /// Parse a memory-mapped document.
    pub fn from_mmap(mmap: Mmap, options: ParseOptions) -> Result<Self> {
        Self::with_data(PdfBytes::Shared(Bytes::from_owner(mmap)), options)
    }

    /// Map and parse the file at `path`. A zero-length file gives an empty document.
    pub fn open(path: impl AsRef<Path>, options: ParseOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::empty(options));
        }
        // SAFETY: the mapping is read-only and dropped before this document
        // writes to the file.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_mmap(mmap, options)
    }

    fn read_pdf_info(&mut self) -> Result<()> {
        let data = self.bytes()?.clone();
        let chain = read_trailer_chain(data.as_ref(), &self.options, &mut self.xref)?;
        let trailer = chain.trailer().clone();
        self.last_xref_section_offset = Some(chain.last_xref_section_offset);
        self.trailers = chain.trailers;

        let root_ref = trailer
            .get_ref("Root")
            .ok_or_else(|| PdfError::Format("/Root not in trailer".into()))?;
        self.root = self.materialize(root_ref)?.as_dict()?.clone();
        self.root_ref = Some(root_ref);

        self.info_ref = trailer.get_ref("Info");
        if let Some(info_ref) = self.info_ref {
            self.info = self.materialize(info_ref)?.as_dict()?.clone();
        }

        ensure_format!(
            self.root.is_type("Catalog"),
            "/Type in Root is missing or not /Catalog"
        );
        let pages_ref = self.root.get_ref("Pages").ok_or_else(|| {
            PdfError::Format("/Pages in Root is missing or not an indirect reference".into())
        })?;
        self.pages_ref = Some(pages_ref);
        self.page_tree_root = self.materialize(pages_ref)?.as_dict()?.clone();
        let tree = self.page_tree_root.clone();
        self.pages = self.linearize_page_tree(&tree)?;
        self.orig_pages = self.pages.clone();
        if let Some(count) = self.page_tree_root.get_int("Count")
            && usize::try_from(count).ok() != Some(self.pages.len())
        {
            warn!(count, found = self.pages.len(), "page tree /Count disagrees with its leaves");
        }
        debug!(
            pages = self.pages.len(),
            objects = self.xref.keys().len(),
            "opened document"
        );
        Ok(())
    }

    fn bytes(&self) -> Result<&Bytes> {
        self.data
            .as_ref()
            .map(PdfBytes::as_bytes)
            .ok_or_else(|| PdfError::Format("document buffer is closed".into()))
    }

    /// Parse an object from the buffer, bypassing the cache.
    fn read_object(&self, reference: IndirectRef) -> Result<PdfObject> {
        let entry = self.xref.get(reference.object_id).ok_or_else(|| {
            PdfError::Format(format!("object {} not found in xref table", reference.object_id))
        })?;
        ensure_format!(
            entry.generation == reference.generation,
            "expected to find generation {} for object ID {} in xref table, instead found generation {} at offset {}",
            reference.generation,
            reference.object_id,
            entry.generation,
            entry.offset
        );
        let offset = usize::try_from(entry.offset)
            .ok()
            .and_then(|o| o.checked_add(self.options.start_offset))
            .ok_or_else(|| PdfError::Format(format!("offset {} out of range", entry.offset)))?;
        let data = self.bytes()?.as_ref();
        ensure_format!(offset < data.len(), "offset {offset} beyond end of file");
        trace!(object = %reference, offset, "reading object");
        let (value, _) = get_value(data, offset, Some(reference), self.options.max_nesting)?;
        Ok(value)
    }

    /// Parse the object if it is not cached yet, and return the cached value.
    pub fn materialize(&mut self, reference: IndirectRef) -> Result<&PdfObject> {
        if !self.cache.contains_key(&reference) {
            let value = self.read_object(reference)?;
            self.cache.insert(reference, value);
        }
        self.cache
            .get(&reference)
            .ok_or_else(|| PdfError::Format(format!("object {reference} not cached")))
    }

    /// Owned copy of an object, read through the cache.
    pub fn read_indirect(&mut self, reference: IndirectRef) -> Result<PdfObject> {
        self.materialize(reference).cloned()
    }

    /// Mutable access to an object, for editing a page dictionary before it
    /// is written back.
    pub fn object_mut(&mut self, reference: IndirectRef) -> Result<&mut PdfObject> {
        self.materialize(reference)?;
        self.cache
            .get_mut(&reference)
            .ok_or_else(|| PdfError::Format(format!("object {reference} not cached")))
    }

    pub fn cached(&self, reference: IndirectRef) -> Option<&PdfObject> {
        self.cache.get(&reference)
    }

    /// Allocate the id after the largest one the table has ever seen. With an
    /// offset the id is recorded in the table straight away.
    pub fn next_object_id(&mut self, offset: Option<u64>) -> Result<IndirectRef> {
        let object_id = match self.xref.max_id() {
            None => 1,
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| PdfError::Format(format!("no object id left after {max}")))?,
        };
        if let Some(offset) = offset {
            self.xref.set(object_id, XrefEntry::new(offset, 0));
        }
        Ok(IndirectRef::new(object_id, 0))
    }

    /// Mark the current catalog and its Pages node free.
    pub fn delete_root(&mut self) -> Result<()> {
        let Some(root_ref) = self.root_ref else {
            return Ok(());
        };
        self.xref.delete(root_ref.object_id)?;
        if let Some(pages_ref) = self.root.get_ref("Pages") {
            self.xref.delete(pages_ref.object_id)?;
        }
        Ok(())
    }

    /// Route later xref inserts to the update section. The input buffer stays
    /// readable until [`PdfDocument::close`].
    pub fn start_writing(&mut self) {
        self.xref.finish_reading();
    }

    /// Release the input buffer; only cached objects stay reachable. A
    /// memory-mapped document must be closed before its file is written.
    pub fn close(&mut self) {
        self.data = None;
    }

    pub fn is_closed(&self) -> bool {
        self.data.is_none()
    }

    pub const fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub const fn xref(&self) -> &XrefTable {
        &self.xref
    }

    pub const fn root(&self) -> &PdfDict {
        &self.root
    }

    pub const fn root_ref(&self) -> Option<IndirectRef> {
        self.root_ref
    }

    pub const fn info(&self) -> &PdfDict {
        &self.info
    }

    /// Entries set here are written as a new Info object with the next trailer.
    pub const fn info_mut(&mut self) -> &mut PdfDict {
        &mut self.info
    }

    pub const fn info_ref(&self) -> Option<IndirectRef> {
        self.info_ref
    }

    pub const fn page_tree_root(&self) -> &PdfDict {
        &self.page_tree_root
    }

    pub const fn pages_ref(&self) -> Option<IndirectRef> {
        self.pages_ref
    }

    /// Page references in document order.
    pub fn pages(&self) -> &[IndirectRef] {
        &self.pages
    }

    pub const fn pages_mut(&mut self) -> &mut Vec<IndirectRef> {
        &mut self.pages
    }

    /// Pages as they were when the document was opened; empty once the page
    /// tree has been rewritten.
    pub fn orig_pages(&self) -> &[IndirectRef] {
        &self.orig_pages
    }

    /// The newest trailer, if the document was read from a file.
    pub fn trailer(&self) -> Option<&PdfDict> {
        self.trailers.first()
    }

    /// All trailers, newest first.
    pub fn trailers(&self) -> &[PdfDict] {
        &self.trailers
    }

    pub const fn last_xref_section_offset(&self) -> Option<u64> {
        self.last_xref_section_offset
    }
}
