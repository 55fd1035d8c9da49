//! PDF object types and their serialized form.

use std::borrow::Borrow;
use std::fmt;

use bytes::Bytes;
use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::codec;
use crate::error::{PdfError, Result};
use crate::model::date::{format_pdf_date, parse_pdf_date};
use crate::model::text::{decode_text, encode_text};

/// Reference to an indirect object, written `id gen R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndirectRef {
    pub object_id: u32,
    pub generation: u32,
}

impl IndirectRef {
    pub const fn new(object_id: u32, generation: u32) -> Self {
        Self {
            object_id,
            generation,
        }
    }

    /// The `id gen obj` header that defines this object.
    pub const fn definition(self) -> ObjectDef {
        ObjectDef(self)
    }
}

impl fmt::Display for IndirectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.object_id, self.generation)
    }
}

/// Header of an indirect object definition, written `id gen obj`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectDef(pub IndirectRef);

impl fmt::Display for ObjectDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} obj", self.0.object_id, self.0.generation)
    }
}

/// A name, holding its bytes after `#XX` escapes are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PdfName(Vec<u8>);

impl PdfName {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn needs_escape(byte: u8) -> bool {
        !(33..=126).contains(&byte) || b"#%/()<>[]{}".contains(&byte)
    }

    /// Append `/Name` with reserved bytes escaped as `#XX`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(b'/');
        for &byte in &self.0 {
            if Self::needs_escape(byte) {
                out.extend_from_slice(format!("#{byte:02X}").as_bytes());
            } else {
                out.push(byte);
            }
        }
    }
}

impl Borrow<[u8]> for PdfName {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for PdfName {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PdfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::with_capacity(self.0.len() + 1);
        self.write_to(&mut out);
        f.write_str(&String::from_utf8_lossy(&out))
    }
}

impl From<&str> for PdfName {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for PdfName {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&[u8]> for PdfName {
    fn from(b: &[u8]) -> Self {
        Self(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for PdfName {
    fn from(b: &[u8; N]) -> Self {
        Self(b.to_vec())
    }
}

impl From<Vec<u8>> for PdfName {
    fn from(b: Vec<u8>) -> Self {
        Self(b)
    }
}

impl PartialEq<[u8]> for PdfName {
    fn eq(&self, other: &[u8]) -> bool {
        self.0 == other
    }
}

impl PartialEq<&[u8]> for PdfName {
    fn eq(&self, other: &&[u8]) -> bool {
        self.0 == *other
    }
}

impl<const N: usize> PartialEq<&[u8; N]> for PdfName {
    fn eq(&self, other: &&[u8; N]) -> bool {
        self.0 == other[..]
    }
}

impl PartialEq<str> for PdfName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for PdfName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

pub type PdfArray = Vec<PdfObject>;

/// A PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Name(PdfName),
    /// Byte string, written as a literal `( ... )`.
    String(Vec<u8>),
    /// Byte string, written as hex `< ... >`.
    Binary(Vec<u8>),
    Array(PdfArray),
    Dict(PdfDict),
    Stream(Box<PdfStream>),
    Ref(IndirectRef),
}

fn type_error(expected: &'static str, got: &PdfObject) -> PdfError {
    PdfError::TypeError {
        expected,
        got: got.type_name(),
    }
}

impl PdfObject {
    /// A name value.
    pub fn name(name: impl Into<PdfName>) -> Self {
        Self::Name(name.into())
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(PdfError::TypeError {
                expected: "bool",
                got: self.type_name(),
            }),
        }
    }

    pub const fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "int",
                got: self.type_name(),
            }),
        }
    }

    /// Numeric value, with integers widened to f64.
    pub const fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "number",
                got: self.type_name(),
            }),
        }
    }

    pub fn as_name(&self) -> Result<&PdfName> {
        match self {
            Self::Name(n) => Ok(n),
            _ => Err(type_error("name", self)),
        }
    }

    /// Bytes of a literal or hex string.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) | Self::Binary(s) => Ok(s),
            _ => Err(type_error("string", self)),
        }
    }

    pub fn as_array(&self) -> Result<&PdfArray> {
        match self {
            Self::Array(a) => Ok(a),
            _ => Err(type_error("array", self)),
        }
    }

    pub fn as_dict(&self) -> Result<&PdfDict> {
        match self {
            Self::Dict(d) => Ok(d),
            _ => Err(type_error("dict", self)),
        }
    }

    pub fn as_stream(&self) -> Result<&PdfStream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(type_error("stream", self)),
        }
    }

    pub const fn as_reference(&self) -> Result<IndirectRef> {
        match self {
            Self::Ref(r) => Ok(*r),
            _ => Err(PdfError::TypeError {
                expected: "ref",
                got: self.type_name(),
            }),
        }
    }

    /// Serialize to PDF syntax.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Null => out.extend_from_slice(b"null"),
            Self::Bool(true) => out.extend_from_slice(b"true"),
            Self::Bool(false) => out.extend_from_slice(b"false"),
            Self::Int(n) => out.extend_from_slice(n.to_string().as_bytes()),
            Self::Real(n) => out.extend_from_slice(format_real(*n).as_bytes()),
            Self::Name(n) => n.write_to(out),
            Self::String(s) => write_literal(s, out),
            Self::Binary(b) => {
                out.push(b'<');
                for byte in b {
                    out.extend_from_slice(format!("{byte:02X}").as_bytes());
                }
                out.push(b'>');
            }
            Self::Array(items) => {
                out.extend_from_slice(b"[ ");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    item.write_to(out);
                }
                out.extend_from_slice(b" ]");
            }
            Self::Dict(d) => d.write_to(out),
            Self::Stream(s) => s.write_to(out),
            Self::Ref(r) => out.extend_from_slice(r.to_string().as_bytes()),
        }
    }
}

/// Reals always carry a decimal point so they read back as reals.
fn format_real(n: f64) -> String {
    if !n.is_finite() {
        return "0.0".to_string();
    }
    let s = n.to_string();
    if s.contains('.') { s } else { s + ".0" }
}

fn write_literal(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');
    for &byte in bytes {
        match byte {
            b'\\' | b'(' | b')' => {
                out.push(b'\\');
                out.push(byte);
            }
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

impl From<bool> for PdfObject {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PdfObject {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PdfObject {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for PdfObject {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for PdfObject {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for PdfObject {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

/// Text becomes a UTF-16BE string with a byte order mark.
impl From<&str> for PdfObject {
    fn from(v: &str) -> Self {
        Self::String(encode_text(v))
    }
}

impl From<String> for PdfObject {
    fn from(v: String) -> Self {
        Self::from(v.as_str())
    }
}

impl From<Vec<u8>> for PdfObject {
    fn from(v: Vec<u8>) -> Self {
        Self::String(v)
    }
}

impl From<&[u8]> for PdfObject {
    fn from(v: &[u8]) -> Self {
        Self::String(v.to_vec())
    }
}

impl From<NaiveDateTime> for PdfObject {
    fn from(v: NaiveDateTime) -> Self {
        Self::String(format_pdf_date(&v).into_bytes())
    }
}

impl From<PdfName> for PdfObject {
    fn from(v: PdfName) -> Self {
        Self::Name(v)
    }
}

impl From<PdfArray> for PdfObject {
    fn from(v: PdfArray) -> Self {
        Self::Array(v)
    }
}

impl From<Vec<IndirectRef>> for PdfObject {
    fn from(v: Vec<IndirectRef>) -> Self {
        Self::Array(v.into_iter().map(Self::Ref).collect())
    }
}

impl From<PdfDict> for PdfObject {
    fn from(v: PdfDict) -> Self {
        Self::Dict(v)
    }
}

impl From<PdfStream> for PdfObject {
    fn from(v: PdfStream) -> Self {
        Self::Stream(Box::new(v))
    }
}

impl From<IndirectRef> for PdfObject {
    fn from(v: IndirectRef) -> Self {
        Self::Ref(v)
    }
}

/// A dictionary. Keys keep their insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfDict(IndexMap<PdfName, PdfObject>);

impl PdfDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&PdfObject> {
        self.0.get(key.as_ref())
    }

    pub fn get_mut(&mut self, key: impl AsRef<[u8]>) -> Option<&mut PdfObject> {
        self.0.get_mut(key.as_ref())
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.0.contains_key(key.as_ref())
    }

    /// Insert or replace an entry, returning the previous value.
    pub fn set(&mut self, key: impl Into<PdfName>, value: impl Into<PdfObject>) -> Option<PdfObject> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<PdfObject> {
        self.0.shift_remove(key.as_ref())
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, PdfName, PdfObject> {
        self.0.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, PdfName, PdfObject> {
        self.0.keys()
    }

    pub fn get_int(&self, key: impl AsRef<[u8]>) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int().ok())
    }

    pub fn get_ref(&self, key: impl AsRef<[u8]>) -> Option<IndirectRef> {
        self.get(key).and_then(|v| v.as_reference().ok())
    }

    pub fn get_name(&self, key: impl AsRef<[u8]>) -> Option<&PdfName> {
        self.get(key).and_then(|v| v.as_name().ok())
    }

    pub fn get_dict(&self, key: impl AsRef<[u8]>) -> Option<&PdfDict> {
        self.get(key).and_then(|v| v.as_dict().ok())
    }

    pub fn get_array(&self, key: impl AsRef<[u8]>) -> Option<&PdfArray> {
        self.get(key).and_then(|v| v.as_array().ok())
    }

    /// True when `/Type` is the given name.
    pub fn is_type(&self, type_name: &str) -> bool {
        self.get_name("Type").is_some_and(|n| n == type_name)
    }

    /// Decode a text string entry.
    pub fn get_text(&self, key: impl AsRef<[u8]>) -> Result<Option<String>> {
        match self.get(key) {
            None | Some(PdfObject::Null) => Ok(None),
            Some(value) => Ok(Some(decode_text(value.as_bytes()?))),
        }
    }

    /// Parse a date entry such as `CreationDate`, normalized to UTC.
    pub fn get_date(&self, key: impl AsRef<[u8]>) -> Result<Option<NaiveDateTime>> {
        match self.get_text(key)? {
            None => Ok(None),
            Some(text) => parse_pdf_date(&text).map(Some),
        }
    }

    pub fn set_text(&mut self, key: impl Into<PdfName>, value: &str) {
        self.set(key, value);
    }

    pub fn set_date(&mut self, key: impl Into<PdfName>, value: NaiveDateTime) {
        self.set(key, value);
    }

    /// Append `<<\n/Key value\n...>>`, skipping null entries.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"<<");
        for (key, value) in &self.0 {
            if value.is_null() {
                continue;
            }
            out.push(b'\n');
            key.write_to(out);
            out.push(b' ');
            value.write_to(out);
        }
        out.extend_from_slice(b"\n>>");
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

impl<'a> IntoIterator for &'a PdfDict {
    type Item = (&'a PdfName, &'a PdfObject);
    type IntoIter = indexmap::map::Iter<'a, PdfName, PdfObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<PdfName>, V: Into<PdfObject>> FromIterator<(K, V)> for PdfDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A dictionary with a raw byte payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    pub dict: PdfDict,
    data: Bytes,
}

impl PdfStream {
    pub fn new(dict: PdfDict, data: impl Into<Bytes>) -> Self {
        Self {
            dict,
            data: data.into(),
        }
    }

    /// Compress `payload` and mark the stream as `FlateDecode`.
    pub fn flate(mut dict: PdfDict, payload: &[u8]) -> Result<Self> {
        let packed = codec::flate::encode(payload)?;
        dict.set("Filter", PdfObject::name("FlateDecode"));
        dict.set("DL", payload.len());
        Ok(Self::new(dict, packed))
    }

    /// The payload as stored in the file.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    fn filter_name(&self) -> Result<Option<&PdfName>> {
        match self.dict.get("Filter") {
            None | Some(PdfObject::Null) => Ok(None),
            Some(PdfObject::Name(name)) => Ok(Some(name)),
            Some(PdfObject::Array(items)) if items.len() == 1 => items[0].as_name().map(Some),
            Some(other) => Err(PdfError::UnsupportedFilter(
                String::from_utf8_lossy(&other.to_bytes()).into_owned(),
            )),
        }
    }

    /// The payload with its filter undone.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let Some(filter) = self.filter_name()? else {
            return Ok(self.data.to_vec());
        };
        let expected_len = self
            .dict
            .get_int("DL")
            .or_else(|| self.dict.get_int("Length"))
            .and_then(|n| usize::try_from(n).ok());
        codec::decode_filter(filter.as_bytes(), &self.data, expected_len)
    }

    /// Append the dictionary (with `Length` set) and the wrapped payload.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut dict = self.dict.clone();
        dict.set("Length", self.data.len());
        dict.write_to(out);
        out.extend_from_slice(b"\nstream\n");
        out.extend_from_slice(&self.data);
        out.extend_from_slice(b"\nendstream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_escaping() {
        let name = PdfName::from("A#B C");
        assert_eq!(name.to_string(), "/A#23B#20C");
        assert_eq!(name, "A#B C");
        assert_eq!(name, &b"A#B C"[..]);
    }

    #[test]
    fn test_dict_skips_null() {
        let mut dict = PdfDict::new();
        dict.set("Type", PdfObject::name("Page"));
        dict.set("Rotate", PdfObject::Null);
        dict.set("Parent", IndirectRef::new(3, 0));
        assert_eq!(dict.to_bytes(), b"<<\n/Type /Page\n/Parent 3 0 R\n>>");
    }

    #[test]
    fn test_array_and_scalars() {
        let value = PdfObject::Array(vec![
            PdfObject::Int(1),
            PdfObject::Real(2.0),
            PdfObject::Real(0.25),
            PdfObject::Bool(true),
            PdfObject::Null,
        ]);
        assert_eq!(value.to_bytes(), b"[ 1 2.0 0.25 true null ]");
    }

    #[test]
    fn test_literal_and_binary_strings() {
        assert_eq!(PdfObject::from(&b"a(b)\\"[..]).to_bytes(), b"(a\\(b\\)\\\\)");
        assert_eq!(PdfObject::Binary(vec![0x01, 0xAB]).to_bytes(), b"<01AB>");
    }

    #[test]
    fn test_text_roundtrip_through_dict() {
        let mut info = PdfDict::new();
        info.set_text("Title", "Caf\u{e9}");
        assert_eq!(info.get_text("Title").unwrap().as_deref(), Some("Caf\u{e9}"));
        assert_eq!(info.get_text("Author").unwrap(), None);
    }

    #[test]
    fn test_get_text_wrong_type() {
        let mut info = PdfDict::new();
        info.set("Title", 5);
        assert!(matches!(
            info.get_text("Title"),
            Err(PdfError::TypeError { expected: "string", got: "int" })
        ));
    }

    #[test]
    fn test_stream_serialization_sets_length() {
        let stream = PdfStream::new(PdfDict::new(), &b"abc"[..]);
        assert_eq!(
            PdfObject::from(stream).to_bytes(),
            b"<<\n/Length 3\n>>\nstream\nabc\nendstream"
        );
    }

    #[test]
    fn test_stream_decode() {
        let plain = PdfStream::new(PdfDict::new(), &b"raw"[..]);
        assert_eq!(plain.decode().unwrap(), b"raw");

        let packed = PdfStream::flate(PdfDict::new(), b"hello hello hello").unwrap();
        assert_eq!(packed.decode().unwrap(), b"hello hello hello");

        let mut dict = PdfDict::new();
        dict.set("Filter", PdfObject::name("LZWDecode"));
        let unknown = PdfStream::new(dict, &b"xx"[..]);
        assert!(matches!(unknown.decode(), Err(PdfError::UnsupportedFilter(f)) if f == "LZWDecode"));
    }
}
