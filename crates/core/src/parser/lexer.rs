//! Byte-level scanner for PDF syntax.
//!
//! [`Lexer`] walks an immutable buffer and recognizes one token shape at a
//! time. Every `eat_*`/scan method either consumes a complete token and
//! reports success, or leaves the position untouched.

use crate::error::{PdfError, Result};

/// Check if byte is PDF whitespace.
pub const fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

/// Check if byte is a PDF delimiter.
pub const fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

const fn is_name_char(b: u8) -> bool {
    b >= 0x21 && b <= 0x7E && !is_delimiter(b)
}

const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub const fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Current position in the buffer.
    pub const fn tell(&self) -> usize {
        self.pos
    }

    pub const fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn remaining(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or_default()
    }

    /// Bytes between `start` and the current position.
    pub fn since(&self, start: usize) -> &'a [u8] {
        self.data.get(start..self.pos).unwrap_or_default()
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// True at end of buffer or before whitespace or a delimiter.
    fn at_token_end(&self) -> bool {
        self.peek().is_none_or(|b| is_whitespace(b) || is_delimiter(b))
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    /// Consume one end-of-line: blanks, at least one CR/LF, blanks.
    pub fn eat_newline(&mut self) -> bool {
        let start = self.pos;
        let blank = |b: u8| is_whitespace(b) && b != b'\r' && b != b'\n';
        while self.peek().is_some_and(blank) {
            self.pos += 1;
        }
        let breaks = self.pos;
        while matches!(self.peek(), Some(b'\r' | b'\n')) {
            self.pos += 1;
        }
        if self.pos == breaks {
            self.pos = start;
            return false;
        }
        while self.peek().is_some_and(blank) {
            self.pos += 1;
        }
        true
    }

    /// Skip whole comment lines. A comment that is not terminated by a
    /// newline is left in place.
    pub fn skip_comments(&mut self) {
        loop {
            let start = self.pos;
            self.skip_whitespace();
            if self.peek() != Some(b'%') {
                self.pos = start;
                return;
            }
            while self.peek().is_some_and(|b| b != b'\r' && b != b'\n') {
                self.pos += 1;
            }
            if !self.eat_newline() {
                self.pos = start;
                return;
            }
        }
    }

    /// Skip whitespace, then consume `lit` if it comes next.
    pub fn eat(&mut self, lit: &[u8]) -> bool {
        let start = self.pos;
        self.skip_whitespace();
        if self.remaining().starts_with(lit) {
            self.pos += lit.len();
            true
        } else {
            self.pos = start;
            false
        }
    }

    /// Consume `lit` only if it starts exactly at the current position.
    pub fn eat_exact(&mut self, lit: &[u8]) -> bool {
        if self.remaining().starts_with(lit) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }

    /// Like [`Lexer::eat`], but the keyword must end at a token boundary.
    pub fn eat_keyword(&mut self, keyword: &[u8]) -> bool {
        let start = self.pos;
        if self.eat(keyword) && self.at_token_end() {
            true
        } else {
            self.pos = start;
            false
        }
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn sign(&mut self) {
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
    }

    fn text_since(&self, start: usize) -> &'a str {
        // Only ASCII digits, signs and dots are ever sliced here.
        std::str::from_utf8(self.since(start)).unwrap_or_default()
    }

    /// Skip whitespace, then scan `[-+]?[0-9]+` ending at a token boundary.
    pub fn integer(&mut self) -> Option<i64> {
        let start = self.pos;
        self.skip_whitespace();
        let token = self.pos;
        self.sign();
        if self.digits() > 0
            && self.at_token_end()
            && let Ok(n) = self.text_since(token).parse()
        {
            return Some(n);
        }
        self.pos = start;
        None
    }

    /// Unsigned digits with no whitespace skipping or boundary check.
    pub fn unsigned(&mut self) -> Option<u64> {
        let start = self.pos;
        if self.digits() == 0 {
            return None;
        }
        let parsed = self.text_since(start).parse().ok();
        if parsed.is_none() {
            self.pos = start;
        }
        parsed
    }

    /// Exactly `width` ASCII digits.
    pub fn fixed_digits(&mut self, width: usize) -> Option<u64> {
        let field = self.data.get(self.pos..self.pos + width)?;
        if !field.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let start = self.pos;
        self.pos += width;
        self.text_since(start).parse().ok()
    }

    /// Skip whitespace, then scan a real with a mandatory decimal point.
    pub fn real(&mut self) -> Option<f64> {
        let start = self.pos;
        self.skip_whitespace();
        let token = self.pos;
        self.sign();
        let whole = self.digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            let frac = self.digits();
            if (whole > 0 || frac > 0)
                && self.at_token_end()
                && let Ok(n) = self.text_since(token).parse()
            {
                return Some(n);
            }
        }
        self.pos = start;
        None
    }

    /// Skip whitespace, then scan `id gen <keyword>` where `keyword` is
    /// `obj` or `R`. Numbers may carry a sign; callers validate ranges.
    pub fn object_pair(&mut self, keyword: &[u8]) -> Option<(i64, i64)> {
        let start = self.pos;
        let pair = (|| {
            let id = self.integer()?;
            if !self.peek().is_some_and(is_whitespace) {
                return None;
            }
            let generation = self.integer()?;
            if !self.peek().is_some_and(is_whitespace) {
                return None;
            }
            self.eat_keyword(keyword).then_some((id, generation))
        })();
        if pair.is_none() {
            self.pos = start;
        }
        pair
    }

    /// Skip whitespace, then scan `/Name` with `#XX` escapes resolved.
    pub fn name(&mut self) -> Option<Vec<u8>> {
        let start = self.pos;
        self.skip_whitespace();
        if self.peek() != Some(b'/') {
            self.pos = start;
            return None;
        }
        self.pos += 1;
        let body = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        if self.pos == body || !self.at_token_end() {
            self.pos = start;
            return None;
        }
        let raw = &self.data[body..self.pos];
        let mut name = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#'
                && let (Some(hi), Some(lo)) = (
                    raw.get(i + 1).copied().and_then(hex_value),
                    raw.get(i + 2).copied().and_then(hex_value),
                )
            {
                name.push((hi << 4) | lo);
                i += 3;
                continue;
            }
            name.push(raw[i]);
            i += 1;
        }
        Some(name)
    }

    /// Skip whitespace, then scan `< hex >`. Whitespace inside is dropped and
    /// an odd trailing digit is padded with a zero nibble.
    pub fn hex_string(&mut self) -> Option<Vec<u8>> {
        let start = self.pos;
        if !self.eat(b"<") {
            return None;
        }
        let mut out = Vec::new();
        let mut pending: Option<u8> = None;
        loop {
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(c) if is_whitespace(c) => self.pos += 1,
                Some(c) => {
                    let Some(nibble) = hex_value(c) else {
                        self.pos = start;
                        return None;
                    };
                    self.pos += 1;
                    match pending.take() {
                        Some(high) => out.push((high << 4) | nibble),
                        None => pending = Some(nibble),
                    }
                }
                None => {
                    self.pos = start;
                    return None;
                }
            }
        }
        if let Some(high) = pending {
            out.push(high << 4);
        }
        Some(out)
    }

    /// Scan the body of a literal string; the opening `(` is already consumed.
    pub fn literal_string(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    if depth == 0 {
                        return Ok(out);
                    }
                    depth -= 1;
                    out.push(b);
                }
                b'\r' => {
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                b'\n' => out.push(b'\n'),
                b'\\' => self.escape(&mut out),
                _ => out.push(b),
            }
        }
        Err(PdfError::Format("unfinished literal string".into()))
    }

    /// Backslash sequences; anything unrecognized keeps the backslash.
    fn escape(&mut self, out: &mut Vec<u8>) {
        match self.peek() {
            Some(c @ (b'n' | b'r' | b't' | b'b' | b'f' | b'(' | b')' | b'\\')) => {
                self.pos += 1;
                out.push(match c {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    other => other,
                });
            }
            Some(b'0'..=b'7') => {
                let mut value = 0u32;
                let mut count = 0;
                while count < 3 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                            count += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => out.push(b'\\'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(input: &[u8]) -> Result<Vec<u8>> {
        let mut lex = Lexer::new(input, 1);
        lex.literal_string()
    }

    #[test]
    fn test_literal_escapes() {
        assert_eq!(literal(b"(a\\(b\\)c)").unwrap(), b"a(b)c");
        assert_eq!(literal(b"(a\\nb)").unwrap(), b"a\nb");
        assert_eq!(literal(b"(\\101\\0)").unwrap(), b"A\0");
        assert_eq!(literal(b"(\\x)").unwrap(), b"\\x");
    }

    #[test]
    fn test_literal_newlines() {
        assert_eq!(literal(b"(a\r\nb\rc)").unwrap(), b"a\nb\nc");
        assert_eq!(literal(b"(ab\\\r\ncd)").unwrap(), b"abcd");
    }

    #[test]
    fn test_literal_nesting() {
        assert_eq!(literal(b"(a(b)c)").unwrap(), b"a(b)c");
        assert!(matches!(literal(b"(a(b)"), Err(PdfError::Format(_))));
    }

    #[test]
    fn test_name_hex_escape() {
        let mut lex = Lexer::new(b" /A#23B#2", 0);
        assert_eq!(lex.name().unwrap(), b"A#B#2");
        assert_eq!(lex.tell(), 9);
    }

    #[test]
    fn test_hex_string_padding() {
        let mut lex = Lexer::new(b"<41 4>", 0);
        assert_eq!(lex.hex_string().unwrap(), vec![0x41, 0x40]);
        let mut bad = Lexer::new(b"<4G>", 0);
        assert!(bad.hex_string().is_none());
        assert_eq!(bad.tell(), 0);
    }

    #[test]
    fn test_keyword_needs_boundary() {
        assert!(Lexer::new(b" null]", 0).eat_keyword(b"null"));
        assert!(!Lexer::new(b"nullx", 0).eat_keyword(b"null"));
    }

    #[test]
    fn test_object_pair() {
        let mut lex = Lexer::new(b"12 0 obj\n<<>>", 0);
        assert_eq!(lex.object_pair(b"obj"), Some((12, 0)));
        assert_eq!(lex.tell(), 8);
        assert_eq!(Lexer::new(b"12 0 Rx", 0).object_pair(b"R"), None);
    }

    #[test]
    fn test_skip_comments() {
        let mut lex = Lexer::new(b"% one\n  % two\r\n 5", 0);
        lex.skip_comments();
        assert_eq!(lex.integer(), Some(5));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(Lexer::new(b"-17 ", 0).integer(), Some(-17));
        assert_eq!(Lexer::new(b"1.5", 0).integer(), None);
        assert_eq!(Lexer::new(b"1.5", 0).real(), Some(1.5));
        assert_eq!(Lexer::new(b"-.5]", 0).real(), Some(-0.5));
        assert_eq!(Lexer::new(b".", 0).real(), None);
    }
}
