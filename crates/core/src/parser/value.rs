//! Recursive PDF value parser.

use tracing::trace;

use crate::ensure_format;
use crate::error::{PdfError, Result};
use crate::model::objects::{IndirectRef, PdfArray, PdfDict, PdfName, PdfObject, PdfStream};
use crate::parser::lexer::Lexer;

/// A parsed value and the offset just past it.
///
/// The offset is `None` when the nesting limit cut the parse short; the value
/// then holds whatever was read before the cut.
pub type Parsed = (PdfObject, Option<usize>);

fn object_ref(id: i64, generation: i64) -> Result<IndirectRef> {
    let object_id = u32::try_from(id)
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| PdfError::Format(format!("invalid object id {id}")))?;
    let generation = u32::try_from(generation)
        .map_err(|_| PdfError::Format(format!("invalid generation {generation}")))?;
    Ok(IndirectRef::new(object_id, generation))
}

fn unrecognized(data: &[u8], offset: usize) -> PdfError {
    let end = data.len().min(offset.saturating_add(32));
    let fragment = data.get(offset..end).unwrap_or_default();
    PdfError::Format(format!(
        "unrecognized object: {}",
        String::from_utf8_lossy(fragment)
    ))
}

/// Parse one value from `data` at `offset`.
///
/// When `expect_indirect` is given the value must be the definition
/// `id gen obj ... endobj` of that object. `max_nesting` bounds recursion;
/// `None` is unlimited and `Some(0)` returns `(Null, None)` straight away.
pub fn get_value(
    data: &[u8],
    offset: usize,
    expect_indirect: Option<IndirectRef>,
    max_nesting: Option<usize>,
) -> Result<Parsed> {
    if max_nesting == Some(0) {
        return Ok((PdfObject::Null, None));
    }
    let nested = max_nesting.map(|n| n - 1);
    let mut lex = Lexer::new(data, offset);
    lex.skip_comments();

    if let Some((id, generation)) = lex.object_pair(b"obj") {
        let found = object_ref(id, generation)?;
        if let Some(expected) = expect_indirect {
            ensure_format!(
                found == expected,
                "indirect object definition different than expected: {} {}",
                found.definition(),
                expected.definition()
            );
        }
        let (value, next) = get_value(data, lex.tell(), None, nested)?;
        let Some(next) = next else {
            return Ok((value, None));
        };
        lex.set_pos(next);
        ensure_format!(lex.eat_keyword(b"endobj"), "indirect object end not found");
        trace!(object = %found, "parsed indirect object");
        return Ok((value, Some(lex.tell())));
    }
    ensure_format!(
        expect_indirect.is_none(),
        "indirect object definition not found"
    );

    if let Some((id, generation)) = lex.object_pair(b"R") {
        let reference = object_ref(id, generation)?;
        return Ok((PdfObject::Ref(reference), Some(lex.tell())));
    }

    if lex.eat(b"<<") {
        return parse_dict(data, lex, nested);
    }

    if lex.eat(b"[") {
        let mut items = PdfArray::new();
        loop {
            if lex.eat(b"]") {
                return Ok((PdfObject::Array(items), Some(lex.tell())));
            }
            let (item, next) = get_value(data, lex.tell(), None, nested)?;
            items.push(item);
            let Some(next) = next else {
                return Ok((PdfObject::Array(items), None));
            };
            lex.set_pos(next);
        }
    }

    if lex.eat_keyword(b"null") {
        return Ok((PdfObject::Null, Some(lex.tell())));
    }
    if lex.eat_keyword(b"true") {
        return Ok((PdfObject::Bool(true), Some(lex.tell())));
    }
    if lex.eat_keyword(b"false") {
        return Ok((PdfObject::Bool(false), Some(lex.tell())));
    }
    if let Some(name) = lex.name() {
        return Ok((PdfObject::Name(PdfName::new(name)), Some(lex.tell())));
    }
    if let Some(n) = lex.integer() {
        return Ok((PdfObject::Int(n), Some(lex.tell())));
    }
    if let Some(n) = lex.real() {
        return Ok((PdfObject::Real(n), Some(lex.tell())));
    }
    if let Some(bytes) = lex.hex_string() {
        return Ok((PdfObject::String(bytes), Some(lex.tell())));
    }
    if lex.eat(b"(") {
        let bytes = lex.literal_string()?;
        return Ok((PdfObject::String(bytes), Some(lex.tell())));
    }

    Err(unrecognized(data, offset))
}

/// Dictionary body after `<<`, plus the stream payload if one follows.
fn parse_dict(data: &[u8], mut lex: Lexer<'_>, nested: Option<usize>) -> Result<Parsed> {
    let mut dict = PdfDict::new();
    loop {
        if lex.eat(b">>") {
            lex.skip_whitespace();
            break;
        }
        let (key, next) = get_value(data, lex.tell(), None, nested)?;
        let Some(next) = next else {
            return Ok((PdfObject::Dict(dict), None));
        };
        let PdfObject::Name(key) = key else {
            return Err(PdfError::Format(format!(
                "dictionary key must be a name, got {}",
                key.type_name()
            )));
        };
        let (value, next) = get_value(data, next, None, nested)?;
        dict.set(key, value);
        let Some(next) = next else {
            return Ok((PdfObject::Dict(dict), None));
        };
        lex.set_pos(next);
    }

    let dict_end = lex.tell();
    if !(lex.eat(b"stream\n") || lex.eat(b"stream\r\n")) {
        return Ok((PdfObject::Dict(dict), Some(dict_end)));
    }
    let length = dict
        .get_int("Length")
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| PdfError::Format("bad or missing Length in stream dict".into()))?;
    let start = lex.tell();
    let end = start
        .checked_add(length)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| PdfError::Format("stream end not found".into()))?;
    lex.set_pos(end);
    ensure_format!(lex.eat_keyword(b"endstream"), "stream end not found");
    let stream = PdfStream::new(dict, data[start..end].to_vec());
    Ok((PdfObject::Stream(Box::new(stream)), Some(lex.tell())))
}
