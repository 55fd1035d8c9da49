//! Incremental update writer.
//!
//! Every write goes to the end of the output. Replaced objects are marked
//! free in the xref table, and the closing xref section lists only what this
//! session wrote or freed, chained to the previous section through `Prev`.

use std::collections::BTreeSet;
use std::io::{Seek, SeekFrom, Write};

use tracing::debug;

use crate::document::catalog::PdfDocument;
use crate::document::xref::XrefEntry;
use crate::error::{PdfError, Result};
use crate::model::objects::{IndirectRef, PdfDict, PdfObject};

/// Appends objects, a rebuilt page tree and a new trailer to a document.
pub struct IncrementalWriter<'doc, W: Write + Seek> {
    doc: &'doc mut PdfDocument,
    out: W,
}

impl<'doc, W: Write + Seek> IncrementalWriter<'doc, W> {
    /// Start a writing session with the output positioned at its end.
    ///
    /// Objects not yet cached can still be read while writing. When `out` is
    /// the file the document was mapped from, close the document first.
    pub fn new(doc: &'doc mut PdfDocument, mut out: W) -> Result<Self> {
        doc.start_writing();
        out.seek(SeekFrom::End(0))?;
        Ok(Self { doc, out })
    }

    pub fn document(&self) -> &PdfDocument {
        self.doc
    }

    pub fn document_mut(&mut self) -> &mut PdfDocument {
        self.doc
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.out.stream_position()?)
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.out.write_all(b"%PDF-1.4\n")?;
        Ok(())
    }

    pub fn write_comment(&mut self, comment: &str) -> Result<()> {
        writeln!(self.out, "% {comment}")?;
        Ok(())
    }

    /// Write `value` as an indirect object at the current offset.
    ///
    /// Without a reference the next free id is allocated. Streams get their
    /// `Length` filled in.
    pub fn write_obj(
        &mut self,
        reference: Option<IndirectRef>,
        value: &PdfObject,
    ) -> Result<IndirectRef> {
        let offset = self.tell()?;
        let reference = match reference {
            Some(reference) => {
                self.doc.xref.set(
                    reference.object_id,
                    XrefEntry::new(offset, reference.generation),
                );
                reference
            }
            None => self.doc.next_object_id(Some(offset))?,
        };
        let mut buf = reference.definition().to_string().into_bytes();
        buf.push(b'\n');
        value.write_to(&mut buf);
        buf.extend_from_slice(b"\nendobj\n");
        self.out.write_all(&buf)?;
        debug!(object = %reference, offset, kind = value.type_name(), "wrote object");
        Ok(reference)
    }

    /// Write a page dictionary. `Type` defaults to `Page` and `Parent` to the
    /// current Pages node.
    pub fn write_page(
        &mut self,
        reference: Option<IndirectRef>,
        mut page: PdfDict,
    ) -> Result<IndirectRef> {
        if !page.contains_key("Type") {
            page.set("Type", PdfObject::name("Page"));
        }
        if !page.contains_key("Parent")
            && let Some(pages_ref) = self.doc.pages_ref
        {
            page.set("Parent", pages_ref);
        }
        self.write_obj(reference, &PdfObject::Dict(page))
    }

    /// Write the page at `index` of the page list.
    pub fn write_page_at(&mut self, index: usize, page: PdfDict) -> Result<IndirectRef> {
        let reference = self.doc.pages.get(index).copied().ok_or_else(|| {
            PdfError::Format(format!("page index {index} out of range"))
        })?;
        self.write_page(Some(reference), page)
    }

    /// Replace the catalog and flatten the page tree into a single new Pages
    /// node. Returns the new catalog reference.
    pub fn write_catalog(&mut self) -> Result<IndirectRef> {
        self.doc.delete_root()?;
        let offset = self.tell()?;
        let root_ref = self.doc.next_object_id(Some(offset))?;
        let pages_ref = self.doc.next_object_id(Some(0))?;
        self.doc.root_ref = Some(root_ref);
        self.doc.pages_ref = Some(pages_ref);
        self.rewrite_pages()?;

        let mut catalog = PdfDict::new();
        catalog.set("Type", PdfObject::name("Catalog"));
        catalog.set("Pages", pages_ref);
        self.write_obj(Some(root_ref), &PdfObject::Dict(catalog.clone()))?;

        let mut tree = PdfDict::new();
        tree.set("Type", PdfObject::name("Pages"));
        tree.set("Count", self.doc.pages.len());
        tree.set("Kids", self.doc.pages.clone());
        self.write_obj(Some(pages_ref), &PdfObject::Dict(tree.clone()))?;

        self.doc.root = catalog;
        self.doc.page_tree_root = tree;
        Ok(root_ref)
    }

    /// Re-emit every surviving original page under the current Pages node and
    /// free the old pages and their tree nodes.
    pub fn rewrite_pages(&mut self) -> Result<()> {
        let mut tree_nodes = BTreeSet::new();
        for page_ref in std::mem::take(&mut self.doc.orig_pages) {
            let mut page = self.doc.materialize(page_ref)?.as_dict()?.clone();
            self.doc.xref.delete(page_ref.object_id)?;
            if let Some(parent) = page.get_ref("Parent") {
                tree_nodes.insert(parent);
            }
            if !self.doc.pages.contains(&page_ref) {
                continue;
            }
            match self.doc.pages_ref {
                Some(pages_ref) => page.set("Parent", pages_ref),
                None => page.remove("Parent"),
            };
            let new_ref = self.write_page(None, page)?;
            for slot in self.doc.pages.iter_mut().filter(|slot| **slot == page_ref) {
                *slot = new_ref;
            }
        }

        for node_ref in tree_nodes {
            let mut current = Some(node_ref);
            while let Some(node) = current {
                current = self
                    .doc
                    .cached(node)
                    .ok_or_else(|| PdfError::Format(format!("page tree node {node} was never read")))?
                    .as_dict()?
                    .get_ref("Parent");
                if self.doc.xref.contains(node.object_id) {
                    self.doc.xref.delete(node.object_id)?;
                }
            }
        }
        Ok(())
    }

    /// Write the Info object, the xref section and the trailer. Returns the
    /// offset of the new xref section.
    pub fn write_xref_and_trailer(&mut self, new_root_ref: Option<IndirectRef>) -> Result<u64> {
        if let Some(root_ref) = new_root_ref {
            self.doc.delete_root()?;
            self.doc.root_ref = Some(root_ref);
        }
        let root_ref = self.doc.root_ref.ok_or_else(|| {
            PdfError::Format("no document catalog to reference from the trailer".into())
        })?;

        if !self.doc.info.is_empty() {
            if let Some(old_info) = self.doc.info_ref
                && self.doc.xref.contains(old_info.object_id)
            {
                self.doc.xref.delete(old_info.object_id)?;
            }
            let info = PdfObject::Dict(self.doc.info.clone());
            self.doc.info_ref = Some(self.write_obj(None, &info)?);
        }

        let start = self.doc.xref.write(&mut self.out)?;
        let mut trailer = PdfDict::new();
        trailer.set("Root", root_ref);
        trailer.set("Size", self.doc.xref.len());
        if let Some(prev) = self.doc.last_xref_section_offset {
            trailer.set("Prev", i64::try_from(prev).unwrap_or(i64::MAX));
        }
        if let Some(info_ref) = self.doc.info_ref {
            trailer.set("Info", info_ref);
        }

        let mut buf = b"trailer\n".to_vec();
        trailer.write_to(&mut buf);
        buf.extend_from_slice(format!("\nstartxref\n{start}\n%%EOF\n").as_bytes());
        self.out.write_all(&buf)?;
        debug!(startxref = start, prev = ?self.doc.last_xref_section_offset, "wrote trailer");

        self.doc.last_xref_section_offset = Some(start);
        self.doc.trailers.insert(0, trailer);
        Ok(start)
    }

    /// Flush and hand back the output.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
