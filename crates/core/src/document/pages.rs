//! Page tree flattening.

use crate::document::catalog::PdfDocument;
use crate::ensure_format;
use crate::error::{PdfError, Result};
use crate::model::objects::{IndirectRef, PdfDict};

impl PdfDocument {
    /// Flatten a Pages tree node into its Page leaves, depth first and left
    /// to right.
    pub fn linearize_page_tree(&mut self, node: &PdfDict) -> Result<Vec<IndirectRef>> {
        let mut pages = Vec::new();
        self.collect_pages(node, 0, &mut pages)?;
        Ok(pages)
    }

    fn collect_pages(
        &mut self,
        node: &PdfDict,
        depth: usize,
        pages: &mut Vec<IndirectRef>,
    ) -> Result<()> {
        ensure_format!(
            depth <= self.options.max_page_tree_depth,
            "page tree nested deeper than {} levels",
            self.options.max_page_tree_depth
        );
        ensure_format!(node.is_type("Pages"), "/Type of page tree node is not /Pages");
        let kids = node
            .get_array("Kids")
            .ok_or_else(|| PdfError::Format("/Kids missing from page tree node".into()))?;
        for kid in kids {
            let kid_ref = kid.as_reference().map_err(|_| {
                PdfError::Format("page tree /Kids entry is not an indirect reference".into())
            })?;
            let kid_node = self.materialize(kid_ref)?.as_dict()?.clone();
            if kid_node.is_type("Page") {
                pages.push(kid_ref);
            } else {
                self.collect_pages(&kid_node, depth + 1, pages)?;
            }
        }
        Ok(())
    }
}
