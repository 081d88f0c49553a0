//! Streaming HTML tokenizer
//!
//! Classifies an HTML byte stream into start tags, end tags, self-closing tags,
//! text, comments and doctype declarations without building a DOM. Every token
//! carries its exact raw source bytes and start offset, so a consumer can re-emit
//! markup verbatim and resolve positions through a [`LineCounter`].
//!
//! The scanner is deliberately lenient: anything that does not parse as markup is
//! classified as text, never an error. Entity references are left untouched.
//!
//! [`LineCounter`]: crate::position::LineCounter

use std::io::{self, Read};

const READ_CHUNK: usize = 4096;

/// A parsed tag name with its attributes, names lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Tag {
    /// First value of the named attribute, if present. A bare attribute
    /// (`<sql ignore>`) yields an empty string.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    StartTag(Tag),
    EndTag(String),
    SelfClosingTag(Tag),
    Text,
    Comment,
    Doctype,
}

/// One classified region of the input stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source bytes of this token, for verbatim re-emission.
    pub raw: Vec<u8>,
    /// Byte offset of the token start in the overall stream.
    pub offset: usize,
}

/// Incremental tokenizer over any `io::Read`.
///
/// Bytes are pulled from the reader on demand; memory use is bounded by the
/// longest single token, not the document.
pub struct Tokenizer<R> {
    reader: R,
    buf: Vec<u8>,
    offset: usize,
    eof: bool,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Tokenizer {
            reader,
            buf: Vec::new(),
            offset: 0,
            eof: false,
        }
    }

    /// Access the underlying reader (e.g. a `LineCounter` for offset resolution).
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Next token in the stream, or `None` at end of input.
    ///
    /// Only I/O failure of the underlying reader is an error; malformed markup
    /// degrades to text tokens.
    pub fn next_token(&mut self) -> io::Result<Option<Token>> {
        while self.buf.is_empty() && !self.eof {
            self.fill()?;
        }
        if self.buf.is_empty() {
            return Ok(None);
        }
        if self.buf[0] == b'<' {
            self.scan_markup()
        } else {
            self.scan_text(0)
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.reader.read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    /// Grow the buffer until it holds at least `n` bytes or the input ends.
    fn ensure(&mut self, n: usize) -> io::Result<()> {
        while self.buf.len() < n && !self.eof {
            self.fill()?;
        }
        Ok(())
    }

    /// Find `needle` at or after `start`, reading more input as needed.
    fn find(&mut self, start: usize, needle: &[u8]) -> io::Result<Option<usize>> {
        loop {
            if self.buf.len() >= start + needle.len() {
                let haystack = &self.buf[start..];
                if let Some(i) = haystack
                    .windows(needle.len())
                    .position(|window| window == needle)
                {
                    return Ok(Some(start + i));
                }
            }
            if self.eof {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    /// Find the `>` closing a tag, skipping over quoted attribute values.
    fn find_tag_end(&mut self, start: usize) -> io::Result<Option<usize>> {
        let mut i = start;
        let mut quote: Option<u8> = None;
        loop {
            while i < self.buf.len() {
                let b = self.buf[i];
                match quote {
                    Some(q) => {
                        if b == q {
                            quote = None;
                        }
                    }
                    None => match b {
                        b'"' | b'\'' => quote = Some(b),
                        b'>' => return Ok(Some(i)),
                        _ => {}
                    },
                }
                i += 1;
            }
            if self.eof {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    fn emit(&mut self, kind: TokenKind, end: usize) -> io::Result<Option<Token>> {
        let raw: Vec<u8> = self.buf.drain(..end).collect();
        let token = Token {
            kind,
            raw,
            offset: self.offset,
        };
        self.offset += end;
        Ok(Some(token))
    }

    /// Text run: everything up to the next `<` (exclusive), starting the search
    /// at `from` so a stray `<` can itself begin a text token.
    fn scan_text(&mut self, from: usize) -> io::Result<Option<Token>> {
        let mut i = from;
        loop {
            while i < self.buf.len() {
                if self.buf[i] == b'<' {
                    return self.emit(TokenKind::Text, i);
                }
                i += 1;
            }
            if self.eof {
                let end = self.buf.len();
                return self.emit(TokenKind::Text, end);
            }
            self.fill()?;
        }
    }

    fn scan_markup(&mut self) -> io::Result<Option<Token>> {
        self.ensure(2)?;
        if self.buf.len() < 2 {
            // Lone "<" at end of input.
            return self.emit(TokenKind::Text, 1);
        }
        match self.buf[1] {
            b'!' => self.scan_declaration(),
            b'/' => self.scan_end_tag(),
            c if c.is_ascii_alphabetic() => self.scan_start_tag(),
            _ => self.scan_text(1),
        }
    }

    fn scan_declaration(&mut self) -> io::Result<Option<Token>> {
        self.ensure(4)?;
        if self.buf.len() >= 4 && &self.buf[..4] == b"<!--" {
            return match self.find(4, b"-->")? {
                Some(i) => self.emit(TokenKind::Comment, i + 3),
                None => {
                    let end = self.buf.len();
                    self.emit(TokenKind::Comment, end)
                }
            };
        }
        match self.find(2, b">")? {
            Some(i) => self.emit(TokenKind::Doctype, i + 1),
            None => {
                let end = self.buf.len();
                self.emit(TokenKind::Doctype, end)
            }
        }
    }

    fn scan_end_tag(&mut self) -> io::Result<Option<Token>> {
        match self.find(2, b">")? {
            Some(i) => {
                let name = tag_name(&self.buf[2..i]);
                if name.is_empty() {
                    return self.emit(TokenKind::Text, i + 1);
                }
                self.emit(TokenKind::EndTag(name), i + 1)
            }
            None => {
                let end = self.buf.len();
                self.emit(TokenKind::Text, end)
            }
        }
    }

    fn scan_start_tag(&mut self) -> io::Result<Option<Token>> {
        match self.find_tag_end(1)? {
            Some(gt) => {
                let self_closing = self.buf[gt - 1] == b'/';
                let inner_end = if self_closing { gt - 1 } else { gt };
                let tag = parse_tag(&self.buf[1..inner_end]);
                let kind = if self_closing {
                    TokenKind::SelfClosingTag(tag)
                } else {
                    TokenKind::StartTag(tag)
                };
                self.emit(kind, gt + 1)
            }
            None => {
                let end = self.buf.len();
                self.emit(TokenKind::Text, end)
            }
        }
    }
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Tag name from the bytes following `</` or `<`: up to whitespace or `/`.
fn tag_name(inner: &[u8]) -> String {
    let end = inner
        .iter()
        .position(|&b| is_ws(b) || b == b'/')
        .unwrap_or(inner.len());
    String::from_utf8_lossy(&inner[..end]).to_ascii_lowercase()
}

/// Parse the inside of a start tag (name stripped of `<`, `>` and a trailing
/// `/`) into name and attribute pairs. Attribute values may be double-quoted,
/// single-quoted, unquoted, or absent (bare attribute).
fn parse_tag(inner: &[u8]) -> Tag {
    let name_end = inner
        .iter()
        .position(|&b| is_ws(b) || b == b'/')
        .unwrap_or(inner.len());
    let name = String::from_utf8_lossy(&inner[..name_end]).to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut i = name_end;
    let len = inner.len();
    while i < len {
        while i < len && (is_ws(inner[i]) || inner[i] == b'/') {
            i += 1;
        }
        if i >= len {
            break;
        }
        let key_start = i;
        while i < len && !is_ws(inner[i]) && inner[i] != b'=' && inner[i] != b'/' {
            i += 1;
        }
        let key = String::from_utf8_lossy(&inner[key_start..i]).to_ascii_lowercase();
        if key.is_empty() {
            i += 1;
            continue;
        }
        while i < len && is_ws(inner[i]) {
            i += 1;
        }
        let value = if i < len && inner[i] == b'=' {
            i += 1;
            while i < len && is_ws(inner[i]) {
                i += 1;
            }
            if i < len && (inner[i] == b'"' || inner[i] == b'\'') {
                let quote = inner[i];
                i += 1;
                let value_start = i;
                while i < len && inner[i] != quote {
                    i += 1;
                }
                let value = String::from_utf8_lossy(&inner[value_start..i]).into_owned();
                i += 1;
                value
            } else {
                let value_start = i;
                while i < len && !is_ws(inner[i]) {
                    i += 1;
                }
                String::from_utf8_lossy(&inner[value_start..i]).into_owned()
            }
        } else {
            String::new()
        };
        attrs.push((key, value));
    }
    Tag { name, attrs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Reader that hands out one byte at a time, to exercise incremental fills.
    struct OneByte<'a>(&'a [u8]);

    impl Read for OneByte<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    fn tokenize(input: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(input.as_bytes());
        let mut tokens = Vec::new();
        while let Some(tok) = tokenizer.next_token().unwrap() {
            tokens.push(tok);
        }
        tokens
    }

    fn raw_concat(tokens: &[Token]) -> String {
        let bytes: Vec<u8> = tokens.iter().flat_map(|t| t.raw.clone()).collect();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_round_trip_plain_document() {
        let input = "<!doctype html>\n<html><body><p class=\"x\">hi &amp; bye</p><!-- note --></body></html>";
        let tokens = tokenize(input);
        assert_eq!(raw_concat(&tokens), input);
    }

    #[test]
    fn test_classification() {
        let tokens = tokenize("<!doctype html><p>hi</p><!-- c --><br/>");
        let kinds: Vec<_> = tokens
            .iter()
            .map(|t| match &t.kind {
                TokenKind::StartTag(tag) => format!("start:{}", tag.name),
                TokenKind::EndTag(name) => format!("end:{}", name),
                TokenKind::SelfClosingTag(tag) => format!("self:{}", tag.name),
                TokenKind::Text => "text".to_string(),
                TokenKind::Comment => "comment".to_string(),
                TokenKind::Doctype => "doctype".to_string(),
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["doctype", "start:p", "text", "end:p", "comment", "self:br"]
        );
    }

    #[test]
    fn test_offsets_track_the_stream() {
        let tokens = tokenize("ab<i>c</i>");
        let offsets: Vec<_> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![0, 2, 5, 6]);
    }

    #[test]
    fn test_attribute_forms() {
        let tokens = tokenize(r#"<sql ignore id="p" src='mem' limit=10>"#);
        match &tokens[0].kind {
            TokenKind::StartTag(tag) => {
                assert_eq!(tag.name, "sql");
                assert_eq!(
                    tag.attrs,
                    vec![
                        ("ignore".to_string(), String::new()),
                        ("id".to_string(), "p".to_string()),
                        ("src".to_string(), "mem".to_string()),
                        ("limit".to_string(), "10".to_string()),
                    ]
                );
                assert_eq!(tag.attr("id"), Some("p"));
                assert_eq!(tag.attr("missing"), None);
            }
            other => panic!("expected start tag, got {:?}", other),
        }
    }

    #[test]
    fn test_gt_inside_quoted_attribute() {
        let input = r#"<p title="a>b">x</p>"#;
        let tokens = tokenize(input);
        assert_eq!(raw_concat(&tokens), input);
        match &tokens[0].kind {
            TokenKind::StartTag(tag) => assert_eq!(tag.attr("title"), Some("a>b")),
            other => panic!("expected start tag, got {:?}", other),
        }
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let tokens = tokenize("a < b and <2 more");
        assert!(tokens
            .iter()
            .all(|t| matches!(t.kind, TokenKind::Text)));
        assert_eq!(raw_concat(&tokens), "a < b and <2 more");
    }

    #[test]
    fn test_unterminated_tag_becomes_text() {
        let tokens = tokenize("before<p class=\"x");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Text);
        assert_eq!(raw_concat(&tokens), "before<p class=\"x");
    }

    #[test]
    fn test_lone_open_bracket_at_eof() {
        let tokens = tokenize("abc<");
        assert_eq!(raw_concat(&tokens), "abc<");
    }

    #[test]
    fn test_tag_names_lowercased() {
        let tokens = tokenize("<SQL ID=\"p\"></SQL>");
        match &tokens[0].kind {
            TokenKind::StartTag(tag) => {
                assert_eq!(tag.name, "sql");
                assert_eq!(tag.attr("id"), Some("p"));
            }
            other => panic!("expected start tag, got {:?}", other),
        }
        assert_eq!(tokens[1].kind, TokenKind::EndTag("sql".to_string()));
    }

    #[test]
    fn test_one_byte_reads() {
        let input = "<html><body><sql id=\"p\">SELECT * FROM t</sql></body></html>";
        let mut tokenizer = Tokenizer::new(OneByte(input.as_bytes()));
        let mut tokens = Vec::new();
        while let Some(tok) = tokenizer.next_token().unwrap() {
            tokens.push(tok);
        }
        assert_eq!(raw_concat(&tokens), input);
        assert_eq!(tokens.len(), 7);
    }

    #[test]
    fn test_unclosed_comment_runs_to_eof() {
        let tokens = tokenize("x<!-- never closed");
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(raw_concat(&tokens), "x<!-- never closed");
    }
}
