//! PDF text strings.
//!
//! Text strings are either UTF-16BE with a byte order mark, or single bytes in
//! PDFDocEncoding. Writing always produces the UTF-16BE form.

const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// PDFDocEncoding code points that differ from Latin-1.
const PDF_DOC_ENCODING: [(u8, char); 40] = [
    (0x16, '\u{0017}'),
    (0x18, '\u{02D8}'),
    (0x19, '\u{02C7}'),
    (0x1A, '\u{02C6}'),
    (0x1B, '\u{02D9}'),
    (0x1C, '\u{02DD}'),
    (0x1D, '\u{02DB}'),
    (0x1E, '\u{02DA}'),
    (0x1F, '\u{02DC}'),
    (0x80, '\u{2022}'),
    (0x81, '\u{2020}'),
    (0x82, '\u{2021}'),
    (0x83, '\u{2026}'),
    (0x84, '\u{2014}'),
    (0x85, '\u{2013}'),
    (0x86, '\u{0192}'),
    (0x87, '\u{2044}'),
    (0x88, '\u{2039}'),
    (0x89, '\u{203A}'),
    (0x8A, '\u{2212}'),
    (0x8B, '\u{2030}'),
    (0x8C, '\u{201E}'),
    (0x8D, '\u{201C}'),
    (0x8E, '\u{201D}'),
    (0x8F, '\u{2018}'),
    (0x90, '\u{2019}'),
    (0x91, '\u{201A}'),
    (0x92, '\u{2122}'),
    (0x93, '\u{FB01}'),
    (0x94, '\u{FB02}'),
    (0x95, '\u{0141}'),
    (0x96, '\u{0152}'),
    (0x97, '\u{0160}'),
    (0x98, '\u{0178}'),
    (0x99, '\u{017D}'),
    (0x9A, '\u{0131}'),
    (0x9B, '\u{0142}'),
    (0x9C, '\u{0153}'),
    (0x9D, '\u{0161}'),
    (0x9E, '\u{017E}'),
];

fn pdf_doc_char(byte: u8) -> char {
    match byte {
        0x16..=0x1F | 0x80..=0x9E => PDF_DOC_ENCODING
            .iter()
            .find(|(b, _)| *b == byte)
            .map_or(byte as char, |(_, c)| *c),
        0xA0 => '\u{20AC}',
        _ => byte as char,
    }
}

/// Encode a string as a PDF text string (BOM + UTF-16BE).
pub fn encode_text(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + s.len() * 2);
    out.extend_from_slice(&UTF16BE_BOM);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Decode a PDF text string.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&UTF16BE_BOM) {
        let units = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    bytes.iter().copied().map(pdf_doc_char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_has_bom() {
        assert_eq!(encode_text("Hi"), vec![0xFE, 0xFF, 0x00, b'H', 0x00, b'i']);
    }

    #[test]
    fn test_decode_utf16() {
        assert_eq!(decode_text(&encode_text("Grüße ✓")), "Grüße ✓");
    }

    #[test]
    fn test_decode_pdf_doc_encoding() {
        assert_eq!(decode_text(b"a\x80b"), "a\u{2022}b");
        assert_eq!(decode_text(b"\xA0"), "\u{20AC}");
        assert_eq!(decode_text(b"\x17"), "\u{17}");
        assert_eq!(decode_text(b"\xE9"), "\u{E9}");
    }
}
