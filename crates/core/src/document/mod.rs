//! PDF document structure.
//!
//! This module contains:
//! - `catalog` - the document session (PdfDocument): buffer, object cache, catalog and pages
//! - `trailer` - trailer search and xref chain reading
//! - `xref` - the cross-reference table (XrefTable)
//! - `pages` - page tree flattening
//! - `writer` - incremental update writer (IncrementalWriter)

pub mod catalog;
pub mod pages;
pub mod trailer;
pub mod writer;
pub mod xref;

pub use catalog::{PdfBytes, PdfDocument};
pub use trailer::TrailerChain;
pub use writer::IncrementalWriter;
pub use xref::{XrefEntry, XrefPhase, XrefTable};
