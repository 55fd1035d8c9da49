//! quire - low-level PDF object reader and incremental writer.
//!
//! Reads the trailer chain, cross-reference sections and page tree of a PDF,
//! parses indirect objects on demand, and appends incremental updates that
//! rewrite the catalog and page list without touching existing bytes.

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;

pub use config::ParseOptions;
pub use document::{IncrementalWriter, PdfDocument, XrefTable};
pub use error::{PdfError, Result};
pub use model::{IndirectRef, PdfDict, PdfName, PdfObject, PdfStream};
pub use parser::get_value;
