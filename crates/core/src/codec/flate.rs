//! zlib (FlateDecode) streams.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{PdfError, Result};

/// Upper bound on the buffer reserved from a size hint read from the file.
const MAX_RESERVE: usize = 1 << 24;

/// Inflate a zlib stream.
pub fn decode(data: &[u8], expected_len: Option<usize>) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(
        expected_len
            .unwrap_or(data.len().saturating_mul(2))
            .min(MAX_RESERVE),
    );
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PdfError::Decode(format!("FlateDecode: {e}")))?;
    Ok(out)
}

/// Deflate `data` into a zlib stream.
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let payload = b"BT /F1 12 Tf 72 712 Td (Hello) Tj ET".repeat(4);
        let packed = encode(&payload).unwrap();
        assert_eq!(decode(&packed, Some(payload.len())).unwrap(), payload);
    }

    #[test]
    fn test_corrupt_input() {
        assert!(matches!(
            decode(b"not zlib", None),
            Err(PdfError::Decode(_))
        ));
    }
}
