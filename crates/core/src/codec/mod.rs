//! Stream filter codecs.
//!
//! Filters are looked up by the name found in a stream's `Filter` entry.
//! Only `FlateDecode` has a decoder; every other filter is reported as
//! unsupported rather than passed through.

pub mod flate;

use crate::error::{PdfError, Result};

/// Decode `data` with the filter called `name`.
///
/// `expected_len` is a size hint for the decoded output, taken from the
/// stream's `DL` or `Length` entry.
pub fn decode_filter(name: &[u8], data: &[u8], expected_len: Option<usize>) -> Result<Vec<u8>> {
    match name {
        b"FlateDecode" => flate::decode(data, expected_len),
        other => Err(PdfError::UnsupportedFilter(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}
