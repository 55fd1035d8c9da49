//! Parsing parameters.

/// Parameters for opening a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Offset of the `%PDF` header within the buffer. Xref offsets are
    /// relative to it.
    pub start_offset: usize,

    /// How many bytes at the end of the buffer are searched for the last
    /// trailer, and after an xref section for an earlier one.
    pub trailer_window: usize,

    /// Nesting limit for values read from the file. None is unlimited.
    pub max_nesting: Option<usize>,

    /// Deepest Pages tree accepted before the tree is reported as malformed.
    pub max_page_tree_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            start_offset: 0,
            trailer_window: 16384,
            max_nesting: None,
            max_page_tree_depth: 256,
        }
    }
}

impl ParseOptions {
    pub fn with_start_offset(mut self, start_offset: usize) -> Self {
        self.start_offset = start_offset;
        self
    }

    pub fn with_max_nesting(mut self, max_nesting: Option<usize>) -> Self {
        self.max_nesting = max_nesting;
        self
    }
}
