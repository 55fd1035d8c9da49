//! Trailer and xref section reading.
//!
//! The newest trailer sits at the end of the file. Each trailer points at its
//! xref section through `startxref`, and at the previous trailer's section
//! through `Prev`. Sections are read newest first and the first entry seen
//! for an id is kept, so later updates override earlier ones.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::config::ParseOptions;
use crate::document::xref::{XrefEntry, XrefTable};
use crate::ensure_format;
use crate::error::{PdfError, Result};
use crate::model::objects::{PdfDict, PdfName};
use crate::parser::lexer::{Lexer, is_whitespace};
use crate::parser::value::get_value;

/// Trailers read from a document, newest first.
#[derive(Debug, Clone)]
pub struct TrailerChain {
    pub trailers: Vec<PdfDict>,
    /// `startxref` of the newest trailer.
    pub last_xref_section_offset: u64,
}

impl TrailerChain {
    /// The newest trailer.
    pub fn trailer(&self) -> &PdfDict {
        // A chain always holds at least the last trailer.
        &self.trailers[0]
    }
}

fn find_all<'a>(hay: &'a [u8], needle: &'a [u8]) -> impl DoubleEndedIterator<Item = usize> + 'a {
    hay.windows(needle.len())
        .enumerate()
        .filter(move |(_, w)| *w == needle)
        .map(|(i, _)| i)
}

fn skip_back_whitespace(data: &[u8], mut end: usize) -> usize {
    while end > 0 && is_whitespace(data[end - 1]) {
        end -= 1;
    }
    end
}

/// Step backwards over one end-of-line (blanks, CR/LF run, blanks).
fn back_newline(data: &[u8], end: usize) -> Option<usize> {
    let blank = |b: u8| is_whitespace(b) && b != b'\r' && b != b'\n';
    let mut pos = end;
    while pos > 0 && blank(data[pos - 1]) {
        pos -= 1;
    }
    let breaks = pos;
    while pos > 0 && matches!(data[pos - 1], b'\r' | b'\n') {
        pos -= 1;
    }
    if pos == breaks {
        return None;
    }
    while pos > 0 && blank(data[pos - 1]) {
        pos -= 1;
    }
    Some(pos)
}

fn back_literal(data: &[u8], end: usize, lit: &[u8]) -> Option<usize> {
    data[..end].ends_with(lit).then(|| end - lit.len())
}

/// Match `>> startxref N %%EOF` at the very end of `data`, returning the
/// index just past `>>` and `N`.
fn trailer_tail(data: &[u8]) -> Option<(usize, u64)> {
    let end = skip_back_whitespace(data, data.len());
    let end = back_literal(data, end, b"%%EOF")?;
    let digits_end = back_newline(data, end)?;
    let mut pos = digits_end;
    while pos > 0 && data[pos - 1].is_ascii_digit() {
        pos -= 1;
    }
    if pos == digits_end {
        return None;
    }
    let startxref = std::str::from_utf8(&data[pos..digits_end]).ok()?.parse().ok()?;
    let pos = back_newline(data, pos)?;
    let pos = back_literal(data, pos, b"startxref")?;
    let pos = back_newline(data, pos)?;
    back_literal(data, pos, b">>")?;
    Some((pos, startxref))
}

/// Match `>> startxref N %%EOF` going forward from `pos`, just after `>>`.
fn trailer_tail_forward(data: &[u8], pos: usize) -> Option<u64> {
    let mut lex = Lexer::new(data, pos);
    if !(lex.eat_newline() && lex.eat(b"startxref") && lex.eat_newline()) {
        return None;
    }
    let startxref = lex.unsigned()?;
    (lex.eat_newline() && lex.eat(b"%%EOF")).then_some(startxref)
}

/// Offset of the body after `<<` if `trailer` at `at` opens a dictionary.
fn dict_open_after_keyword(data: &[u8], at: usize) -> Option<usize> {
    let mut lex = Lexer::new(data, at + b"trailer".len());
    lex.eat(b"<<").then(|| lex.tell())
}

/// Find the last complete trailer block in the final `window` bytes.
///
/// Returns the dictionary body (after `<<`, including the closing `>>`) and
/// the `startxref` value.
pub fn find_last_trailer(data: &[u8], window: usize, start_offset: usize) -> Result<(&[u8], u64)> {
    let missing = || PdfError::Format("trailer end not found".into());
    let (dict_end, startxref) = trailer_tail(data).ok_or_else(missing)?;
    let search_start = data.len().saturating_sub(window).max(start_offset);
    let region = data.get(..dict_end).ok_or_else(missing)?;

    find_all(region, b"trailer")
        .rev()
        .filter(|&at| at > search_start && is_whitespace(data[at - 1]))
        .find_map(|at| {
            let body = dict_open_after_keyword(data, at)?;
            (body + 2 <= dict_end).then(|| (&data[body..dict_end], startxref))
        })
        .ok_or_else(missing)
}

/// Find the first complete trailer block within `window` bytes of `from`.
fn find_trailer_after(data: &[u8], from: usize, window: usize) -> Result<(&[u8], u64)> {
    let end = data.len().min(from.saturating_add(window));
    let segment = data.get(from..end).unwrap_or_default();
    for at in find_all(segment, b"trailer") {
        let Some(body) = dict_open_after_keyword(segment, at) else {
            continue;
        };
        for close in find_all(&segment[body..], b">>") {
            let dict_end = body + close + 2;
            if let Some(startxref) = trailer_tail_forward(segment, dict_end) {
                return Ok((&segment[body..dict_end], startxref));
            }
        }
    }
    Err(PdfError::Format("previous trailer not found".into()))
}

/// Read a trailer dictionary body (`/Key value ... >>`).
pub fn interpret_trailer(body: &[u8], max_nesting: Option<usize>) -> Result<PdfDict> {
    let mut trailer = PdfDict::new();
    let mut lex = Lexer::new(body, 0);
    loop {
        let Some(key) = lex.name() else {
            let at = lex.tell();
            let closed = lex.eat(b">>") && {
                lex.skip_whitespace();
                lex.tell() == body.len()
            };
            ensure_format!(
                closed,
                "name not found in trailer, remaining data: {:?}",
                String::from_utf8_lossy(&body[at..])
            );
            break;
        };
        let (value, next) = get_value(body, lex.tell(), None, max_nesting)?;
        trailer.set(PdfName::new(key), value);
        let Some(next) = next else {
            break;
        };
        lex.set_pos(next);
    }
    ensure_format!(
        trailer.get_int("Size").is_some(),
        "/Size not in trailer or not an integer"
    );
    ensure_format!(
        trailer.get_ref("Root").is_some(),
        "/Root not in trailer or not an indirect reference"
    );
    Ok(trailer)
}

/// `first count` line of a subsection; leaves the lexer after its newline.
fn subsection_header(lex: &mut Lexer<'_>) -> Option<(u64, u64)> {
    let start = lex.tell();
    let header = (|| {
        lex.skip_whitespace();
        let first = lex.unsigned()?;
        let before_gap = lex.tell();
        lex.skip_whitespace();
        if lex.tell() == before_gap {
            return None;
        }
        let count = lex.unsigned()?;
        let gap = lex.tell();
        lex.skip_whitespace();
        let run = lex.since(gap);
        let last_break = run.iter().rposition(|b| matches!(b, b'\r' | b'\n'))?;
        lex.set_pos(gap + last_break + 1);
        Some((first, count))
    })();
    if header.is_none() {
        lex.set_pos(start);
    }
    header
}

/// One 20-byte entry: offset, generation and in-use flag.
fn xref_entry(lex: &mut Lexer<'_>) -> Option<(u64, u32, bool)> {
    let offset = lex.fixed_digits(10)?;
    if !lex.eat_exact(b" ") {
        return None;
    }
    let generation = u32::try_from(lex.fixed_digits(5)?).ok()?;
    if !lex.eat_exact(b" ") {
        return None;
    }
    let in_use = if lex.eat_exact(b"n") {
        true
    } else if lex.eat_exact(b"f") {
        false
    } else {
        return None;
    };
    (lex.eat_exact(b" \r") || lex.eat_exact(b" \n") || lex.eat_exact(b"\r\n"))
        .then_some((offset, generation, in_use))
}

/// Read the xref section at `offset` into `xref`, keeping ids already known.
/// Returns the offset just past the last entry.
pub fn read_xref_section(data: &[u8], offset: usize, xref: &mut XrefTable) -> Result<usize> {
    let mut lex = Lexer::new(data, offset);
    ensure_format!(
        lex.eat(b"xref") && lex.eat_newline(),
        "xref section start not found"
    );
    let mut subsections = 0usize;
    let mut recorded = 0usize;
    while let Some((first, count)) = subsection_header(&mut lex) {
        subsections += 1;
        for index in first..first.saturating_add(count) {
            let (entry_offset, generation, in_use) = xref_entry(&mut lex)
                .ok_or_else(|| PdfError::Format(format!("xref entry not found for object {index}")))?;
            let object_id = u32::try_from(index)
                .map_err(|_| PdfError::Format(format!("object id {index} out of range")))?;
            if in_use && !xref.contains(object_id) {
                xref.set(object_id, XrefEntry::new(entry_offset, generation));
                recorded += 1;
            }
        }
    }
    ensure_format!(subsections > 0, "xref subsection start not found");
    debug!(offset, subsections, recorded, "read xref section");
    Ok(lex.tell())
}

fn as_offset(value: u64, start_offset: usize) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .and_then(|v| v.checked_add(start_offset))
        .ok_or_else(|| PdfError::Format(format!("offset {value} out of range")))
}

fn prev_offset(trailer: &PdfDict) -> Result<Option<u64>> {
    match trailer.get("Prev") {
        None => Ok(None),
        Some(prev) => {
            let prev = prev.as_int()?;
            u64::try_from(prev)
                .map(Some)
                .map_err(|_| PdfError::Format(format!("invalid /Prev offset {prev}")))
        }
    }
}

/// Read the newest trailer, its xref section and every earlier section
/// reachable through `Prev`.
pub fn read_trailer_chain(
    data: &[u8],
    options: &ParseOptions,
    xref: &mut XrefTable,
) -> Result<TrailerChain> {
    let (body, startxref) = find_last_trailer(data, options.trailer_window, options.start_offset)?;
    let trailer = interpret_trailer(body, options.max_nesting)?;
    debug!(startxref, "found last trailer");

    let mut visited = FxHashSet::default();
    visited.insert(startxref);
    read_xref_section(data, as_offset(startxref, options.start_offset)?, xref)?;

    let mut prev = prev_offset(&trailer)?;
    let mut trailers = vec![trailer];
    while let Some(section) = prev {
        ensure_format!(
            visited.insert(section),
            "xref chain loops back to offset {section}"
        );
        let after = read_xref_section(data, as_offset(section, options.start_offset)?, xref)?;
        let (body, recorded) = find_trailer_after(data, after, options.trailer_window)?;
        ensure_format!(
            recorded == section,
            "xref section offset in previous trailer doesn't match what was expected: {recorded} != {section}"
        );
        let trailer = interpret_trailer(body, options.max_nesting)?;
        debug!(section, "followed /Prev to earlier trailer");
        prev = prev_offset(&trailer)?;
        trailers.push(trailer);
    }

    Ok(TrailerChain {
        trailers,
        last_xref_section_offset: startxref,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAIL: &[u8] = b"junk\ntrailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n17\n%%EOF\n";

    #[test]
    fn test_find_last_trailer() {
        let (body, startxref) = find_last_trailer(TAIL, 16384, 0).unwrap();
        assert_eq!(body, b" /Size 3 /Root 1 0 R >>");
        assert_eq!(startxref, 17);
    }

    #[test]
    fn test_last_of_several_trailers() {
        let mut data = TAIL.to_vec();
        data.extend_from_slice(b"trailer\n<< /Size 4 /Root 2 0 R >>\nstartxref\n99\n%%EOF");
        let (body, startxref) = find_last_trailer(&data, 16384, 0).unwrap();
        assert_eq!(startxref, 99);
        let trailer = interpret_trailer(body, None).unwrap();
        assert_eq!(trailer.get_int("Size"), Some(4));
    }

    #[test]
    fn test_missing_trailer() {
        assert!(find_last_trailer(b"%PDF-1.4\n", 16384, 0).is_err());
    }

    #[test]
    fn test_interpret_trailer_requires_root() {
        let err = interpret_trailer(b" /Size 3 >>", None).unwrap_err();
        assert!(err.to_string().contains("/Root"));
        assert!(interpret_trailer(b" /Size 3 /Root 1 0 R junk >>", None).is_err());
    }

    #[test]
    fn test_read_xref_section() {
        let data = b"xref\n0 3\n0000000000 65535 f \n0000000015 00000 n \n0000000079 00000 n\r\n5 1\n0000000200 00002 n \ntrailer";
        let mut xref = XrefTable::new();
        let end = read_xref_section(data, 0, &mut xref).unwrap();
        assert_eq!(&data[end..], b"trailer");
        assert_eq!(xref.keys(), vec![1, 2, 5]);
        assert_eq!(xref.get(5), Some(XrefEntry::new(200, 2)));
    }

    #[test]
    fn test_read_xref_section_keeps_first_seen() {
        let mut xref = XrefTable::new();
        xref.set(1, XrefEntry::new(900, 0));
        read_xref_section(b"xref\n1 1\n0000000015 00000 n \n", 0, &mut xref).unwrap();
        assert_eq!(xref.get(1), Some(XrefEntry::new(900, 0)));
    }

    #[test]
    fn test_empty_xref_section() {
        let mut xref = XrefTable::new();
        assert!(read_xref_section(b"xref\ntrailer", 0, &mut xref).is_err());
    }
}
