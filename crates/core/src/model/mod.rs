//! PDF data model.
//!
//! - `objects` - PDF value types (PdfObject, PdfDict, PdfStream, IndirectRef)
//! - `text` - text string encoding (UTF-16BE and PDFDocEncoding)
//! - `date` - date string parsing and formatting

pub mod date;
pub mod objects;
pub mod text;

pub use objects::{IndirectRef, ObjectDef, PdfArray, PdfDict, PdfName, PdfObject, PdfStream};
