//! Fixture builders shared by the integration tests.
//!
//! Offsets in the generated xref sections are computed from the bytes
//! actually emitted, so fixtures stay valid when object bodies change.

#![allow(dead_code)]

/// One `id 0 obj ... endobj` block.
pub fn object_bytes(object_id: u32, body: &[u8]) -> Vec<u8> {
    let mut out = format!("{object_id} 0 obj\n").into_bytes();
    out.extend_from_slice(body);
    out.extend_from_slice(b"\nendobj\n");
    out
}

fn xref_line(offset: usize) -> String {
    format!("{offset:010} 00000 n \n")
}

/// A complete single-section PDF holding objects `1..=bodies.len()`.
pub fn build_pdf(bodies: &[&[u8]], trailer_extra: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (index, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        let object_id = u32::try_from(index + 1).unwrap();
        out.extend_from_slice(&object_bytes(object_id, body));
    }
    let startxref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", bodies.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(xref_line(offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R{trailer_extra} >>\nstartxref\n{startxref}\n%%EOF\n",
            bodies.len() + 1
        )
        .as_bytes(),
    );
    out
}

/// Offset recorded after the last `startxref`.
pub fn last_startxref(data: &[u8]) -> u64 {
    let text = String::from_utf8_lossy(data);
    let at = text.rfind("startxref").unwrap();
    text[at + "startxref".len()..]
        .split_whitespace()
        .next()
        .unwrap()
        .parse()
        .unwrap()
}

/// Append an update section redefining `objects`, chained to the section at
/// `prev`. Returns the offset of the new xref section.
pub fn append_update(
    data: &mut Vec<u8>,
    objects: &[(u32, &[u8])],
    trailer: &str,
    prev: u64,
) -> usize {
    let mut entries = Vec::new();
    for (object_id, body) in objects {
        entries.push((*object_id, data.len()));
        data.extend_from_slice(&object_bytes(*object_id, body));
    }
    let startxref = data.len();
    data.extend_from_slice(b"xref\n");
    for (object_id, offset) in entries {
        data.extend_from_slice(format!("{object_id} 1\n{}", xref_line(offset)).as_bytes());
    }
    data.extend_from_slice(
        format!("trailer\n<< {trailer} /Prev {prev} >>\nstartxref\n{startxref}\n%%EOF\n")
            .as_bytes(),
    );
    startxref
}

/// Catalog, a two-level page tree with three labelled pages, and an Info
/// dictionary as object 7.
pub fn three_page_pdf() -> Vec<u8> {
    build_pdf(
        &[
            b"<< /Type /Catalog /Pages 2 0 R >>",
            b"<< /Type /Pages /Kids [3 0 R 4 0 R 5 0 R] /Count 3 >>",
            b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Label (a) >>",
            b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Label (b) >>",
            b"<< /Type /Pages /Parent 2 0 R /Kids [6 0 R] /Count 1 >>",
            b"<< /Type /Page /Parent 5 0 R /MediaBox [0 0 595 842] /Label (c) >>",
            b"<< /Title (Original) /Producer (quire tests) >>",
        ],
        " /Info 7 0 R",
    )
}
