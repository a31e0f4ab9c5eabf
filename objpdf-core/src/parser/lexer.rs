//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2

use super::byte_reader::ByteReader;
use super::{ParseError, ParseResult};
use bytes::Bytes;

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Comment text after `%`, up to the end of line
    Comment(Vec<u8>),

    /// Name object with `#XX` escapes already decoded, without the solidus
    Name(String),

    /// Raw content of a `( ... )` literal, escapes still in place
    StringLiteral(Vec<u8>),

    /// Decoded bytes of a `< ... >` hex string
    HexStringLiteral(Vec<u8>),

    /// Dictionary start <<
    BeginDictionary,

    /// Dictionary end >>
    EndDictionary,

    /// Left square bracket [
    BeginArray,

    /// Right square bracket ]
    EndArray,

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// Boolean: true or false
    Boolean(bool),

    /// Null object
    Null,

    /// `obj` keyword
    BeginObject,

    /// `endobj` keyword
    EndObject,

    /// `stream` keyword
    BeginStream,

    /// `endstream` keyword
    EndStream,

    /// `R` keyword closing an indirect reference
    Reference,

    /// `trailer` keyword
    Trailer,

    /// `startxref` keyword
    StartXRef,

    /// `xref` keyword
    XRef,

    /// `f` flag of a cross-reference row
    XRefFree,

    /// `n` flag of a cross-reference row
    XRefIndirect,
}

/// Payload-free discriminant of a [`Token`], used by [`Lexer::expect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Comment,
    Name,
    StringLiteral,
    HexStringLiteral,
    BeginDictionary,
    EndDictionary,
    BeginArray,
    EndArray,
    Integer,
    Real,
    Boolean,
    Null,
    BeginObject,
    EndObject,
    BeginStream,
    EndStream,
    Reference,
    Trailer,
    StartXRef,
    XRef,
    XRefFree,
    XRefIndirect,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Comment(_) => TokenKind::Comment,
            Token::Name(_) => TokenKind::Name,
            Token::StringLiteral(_) => TokenKind::StringLiteral,
            Token::HexStringLiteral(_) => TokenKind::HexStringLiteral,
            Token::BeginDictionary => TokenKind::BeginDictionary,
            Token::EndDictionary => TokenKind::EndDictionary,
            Token::BeginArray => TokenKind::BeginArray,
            Token::EndArray => TokenKind::EndArray,
            Token::Integer(_) => TokenKind::Integer,
            Token::Real(_) => TokenKind::Real,
            Token::Boolean(_) => TokenKind::Boolean,
            Token::Null => TokenKind::Null,
            Token::BeginObject => TokenKind::BeginObject,
            Token::EndObject => TokenKind::EndObject,
            Token::BeginStream => TokenKind::BeginStream,
            Token::EndStream => TokenKind::EndStream,
            Token::Reference => TokenKind::Reference,
            Token::Trailer => TokenKind::Trailer,
            Token::StartXRef => TokenKind::StartXRef,
            Token::XRef => TokenKind::XRef,
            Token::XRefFree => TokenKind::XRefFree,
            Token::XRefIndirect => TokenKind::XRefIndirect,
        }
    }
}

/// PDF whitespace characters (ISO 32000-1 Table 1)
pub(crate) fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

/// PDF delimiter characters (ISO 32000-1 Table 2)
pub(crate) fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(ch: u8) -> bool {
    !is_whitespace(ch) && !is_delimiter(ch)
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

/// PDF Lexer for tokenizing PDF content
#[derive(Debug, Clone)]
pub struct Lexer {
    reader: ByteReader,
}

impl Lexer {
    /// Create a new lexer over a positioned byte cursor
    pub fn new(reader: ByteReader) -> Self {
        Self { reader }
    }

    /// Create a lexer at the start of `data`
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::new(ByteReader::new(data))
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    /// Total length of the underlying input
    pub fn len(&self) -> usize {
        self.reader.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.is_empty()
    }

    pub fn seek(&mut self, position: usize) -> ParseResult<()> {
        self.reader.seek(position)
    }

    pub fn reader(&self) -> &ByteReader {
        &self.reader
    }

    /// Save the current position for later restoration
    pub fn save_position(&self) -> usize {
        self.reader.position()
    }

    /// Restore a previously saved position
    pub fn restore_position(&mut self, saved: usize) -> ParseResult<()> {
        self.reader.seek(saved)
    }

    /// Peek the next non-comment token without consuming it
    pub fn peek(&mut self) -> ParseResult<Option<Token>> {
        let saved = self.save_position();
        let token = self.next_significant();
        self.restore_position(saved)?;
        token
    }

    /// Read the next non-comment token, failing at end of input
    pub fn read(&mut self) -> ParseResult<Token> {
        self.next_significant()?
            .ok_or_else(|| self.reader.eof_error())
    }

    /// Read the next token and require it to be of `kind`
    pub fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        let position = self.position();
        let token = self.read()?;
        if token.kind() == kind {
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("{kind:?}"),
                found: format!("{token:?}"),
                position,
                length: self.len(),
            })
        }
    }

    fn next_significant(&mut self) -> ParseResult<Option<Token>> {
        loop {
            match self.next_token()? {
                Some(Token::Comment(_)) => continue,
                other => return Ok(other),
            }
        }
    }

    /// Get the next token, comments included; `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Token>> {
        self.skip_whitespace();

        let ch = match self.reader.peek() {
            Some(ch) => ch,
            None => return Ok(None),
        };

        let token = match ch {
            b'%' => self.read_comment(),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string()?,
            b'<' => {
                if self.reader.peek_at(1) == Some(b'<') {
                    self.reader.advance();
                    self.reader.advance();
                    Token::BeginDictionary
                } else {
                    self.read_hex_string()?
                }
            }
            b'>' => {
                if self.reader.peek_at(1) == Some(b'>') {
                    self.reader.advance();
                    self.reader.advance();
                    Token::EndDictionary
                } else {
                    return Err(self.reader.syntax_error("Expected '>' after '>'"));
                }
            }
            b'[' => {
                self.reader.advance();
                Token::BeginArray
            }
            b']' => {
                self.reader.advance();
                Token::EndArray
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.read_number()?,
            _ if is_regular(ch) => self.read_keyword()?,
            _ => {
                return Err(self
                    .reader
                    .syntax_error(format!("Unexpected character: {}", ch as char)))
            }
        };

        Ok(Some(token))
    }

    /// Skip whitespace and return the number of bytes skipped
    pub fn skip_whitespace(&mut self) -> usize {
        let mut count = 0;
        while let Some(ch) = self.reader.peek() {
            if !is_whitespace(ch) {
                break;
            }
            self.reader.advance();
            count += 1;
        }
        count
    }

    /// Skip the end-of-line marker that follows the `stream` keyword
    pub fn skip_stream_eol(&mut self) {
        // Some writers put spaces between `stream` and the EOL
        while self.reader.peek() == Some(b' ') {
            self.reader.advance();
        }
        match self.reader.peek() {
            Some(b'\r') => {
                self.reader.advance();
                if self.reader.peek() == Some(b'\n') {
                    self.reader.advance();
                }
            }
            Some(b'\n') => self.reader.advance(),
            _ => {}
        }
    }

    /// Read exactly n raw bytes
    pub fn read_raw(&mut self, n: usize) -> ParseResult<Bytes> {
        self.reader.read_bytes(n)
    }

    /// Read a comment (from % to end of line)
    fn read_comment(&mut self) -> Token {
        self.reader.advance(); // consume '%'
        let mut comment = Vec::new();
        while let Some(ch) = self.reader.peek() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.reader.advance();
            comment.push(ch);
        }
        Token::Comment(comment)
    }

    /// Read a name object (e.g., /Type)
    fn read_name(&mut self) -> Token {
        self.reader.advance(); // consume '/'
        let mut name = String::new();

        while let Some(ch) = self.reader.peek() {
            if !is_regular(ch) {
                break;
            }
            self.reader.advance();

            // Handle hex codes in names (e.g., /A#20B means /A B)
            if ch == b'#' {
                let escaped = self
                    .reader
                    .peek()
                    .and_then(hex_value)
                    .zip(self.reader.peek_at(1).and_then(hex_value));
                if let Some((high, low)) = escaped {
                    self.reader.advance();
                    self.reader.advance();
                    name.push(((high << 4) | low) as char);
                    continue;
                }
            }
            name.push(ch as char);
        }

        Token::Name(name)
    }

    /// Read a literal string, keeping escapes for the parser to decode
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        self.reader.advance(); // consume '('
        let mut raw = Vec::new();
        let mut depth = 1usize;

        loop {
            let ch = self.reader.read_byte()?;
            match ch {
                b'\\' => {
                    let next = self.reader.read_byte()?;
                    match next {
                        // Line continuation: the backslash and the EOL vanish
                        b'\r' => {
                            if self.reader.peek() == Some(b'\n') {
                                self.reader.advance();
                            }
                        }
                        b'\n' => {}
                        _ => {
                            raw.push(b'\\');
                            raw.push(next);
                        }
                    }
                }
                b'(' => {
                    depth += 1;
                    raw.push(ch);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    raw.push(ch);
                }
                _ => raw.push(ch),
            }
        }

        Ok(Token::StringLiteral(raw))
    }

    /// Read a hexadecimal string `<...>`
    fn read_hex_string(&mut self) -> ParseResult<Token> {
        self.reader.advance(); // consume '<'
        let mut nibbles = Vec::new();

        loop {
            let ch = self.reader.read_byte()?;
            if ch == b'>' {
                break;
            }
            if is_whitespace(ch) {
                continue;
            }
            match hex_value(ch) {
                Some(value) => nibbles.push(value),
                None => {
                    return Err(self
                        .reader
                        .syntax_error(format!("Invalid character in hex string: {}", ch as char)))
                }
            }
        }

        // Pad with 0 if odd number of digits
        if nibbles.len() % 2 != 0 {
            nibbles.push(0);
        }

        let bytes = nibbles
            .chunks(2)
            .map(|pair| (pair[0] << 4) | pair[1])
            .collect();
        Ok(Token::HexStringLiteral(bytes))
    }

    /// Read a number (integer or real)
    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.reader.position();
        let mut lexeme = String::new();
        while let Some(ch) = self.reader.peek() {
            if !matches!(ch, b'0'..=b'9' | b'+' | b'-' | b'.') {
                break;
            }
            self.reader.advance();
            lexeme.push(ch as char);
        }

        parse_number(&lexeme).ok_or_else(|| ParseError::MalformedNumber {
            lexeme,
            position: start,
            length: self.reader.len(),
        })
    }

    /// Read a keyword
    fn read_keyword(&mut self) -> ParseResult<Token> {
        let start = self.reader.position();
        let mut word = Vec::new();
        while let Some(ch) = self.reader.peek() {
            if !is_regular(ch) {
                break;
            }
            self.reader.advance();
            word.push(ch);
        }

        let token = match word.as_slice() {
            b"true" => Token::Boolean(true),
            b"false" => Token::Boolean(false),
            b"null" => Token::Null,
            b"obj" => Token::BeginObject,
            b"endobj" => Token::EndObject,
            b"stream" => Token::BeginStream,
            b"endstream" => Token::EndStream,
            b"R" => Token::Reference,
            b"trailer" => Token::Trailer,
            b"startxref" => Token::StartXRef,
            b"xref" => Token::XRef,
            b"f" => Token::XRefFree,
            b"n" => Token::XRefIndirect,
            _ => {
                return Err(ParseError::SyntaxError {
                    position: start,
                    length: self.reader.len(),
                    message: format!("Unknown keyword: {}", String::from_utf8_lossy(&word)),
                })
            }
        };
        Ok(token)
    }
}

/// Validate and convert a numeric lexeme
///
/// One optional leading sign, digits, at most one decimal point. A bare
/// leading point (`.5`, `-.5`) is read as if a `0` preceded it.
fn parse_number(lexeme: &str) -> Option<Token> {
    let (negative, body) = match lexeme.as_bytes().first()? {
        b'-' => (true, &lexeme[1..]),
        b'+' => (false, &lexeme[1..]),
        _ => (false, lexeme),
    };

    let digits = body.bytes().filter(u8::is_ascii_digit).count();
    let dots = body.bytes().filter(|b| *b == b'.').count();
    if digits == 0 || dots > 1 || digits + dots != body.len() {
        return None;
    }

    if dots == 0 {
        // The sign is parsed with the digits so that i64::MIN fits
        return match lexeme.parse::<i64>() {
            Ok(value) => Some(Token::Integer(value)),
            // Out-of-range integers degrade to reals rather than failing
            Err(_) => body
                .parse::<f64>()
                .ok()
                .map(|value| Token::Real(if negative { -value } else { value })),
        };
    }

    let normalized = if body.starts_with('.') {
        format!("0{body}")
    } else {
        body.to_string()
    };
    let value = normalized.parse::<f64>().ok()?;
    Some(Token::Real(if negative { -value } else { value }))
}
