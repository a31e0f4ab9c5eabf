//! PDF Object Parser
//!
//! Recursive descent over [`Lexer`] tokens. `n g R` references and
//! `n g obj` definitions are told apart from bare integers with a two-token
//! lookahead that rewinds when neither keyword follows.

use super::lexer::{Lexer, Token, TokenKind};
use super::{ParseError, ParseResult};
use crate::objects::{
    Dictionary, IndirectObject, Object, ObjectId, ObjectStream, PdfDate, PdfString, Stream,
    StringEncoding,
};
use bytes::Bytes;

/// Resolves references met while parsing, such as an indirect `/Length`
pub trait ReferenceResolver {
    fn resolve_integer(&mut self, id: ObjectId) -> ParseResult<Option<i64>>;
}

/// Result of a top-level parse: a plain value or an `obj ... endobj` definition
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Value(Object),
    Indirect(IndirectObject),
}

/// Object parser over a token stream
pub struct Parser<'r> {
    lexer: Lexer,
    resolver: Option<&'r mut dyn ReferenceResolver>,
    in_object_stream: bool,
}

impl<'r> Parser<'r> {
    pub fn new(lexer: Lexer) -> Self {
        Self {
            lexer,
            resolver: None,
            in_object_stream: false,
        }
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::new(Lexer::from_bytes(data))
    }

    /// Use `resolver` for references that must be known while parsing
    pub fn with_resolver(mut self, resolver: &'r mut dyn ReferenceResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Parsing the body of an object stream: a dictionary may end at end of input
    pub fn in_object_stream(mut self, enabled: bool) -> Self {
        self.in_object_stream = enabled;
        self
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer {
        &mut self.lexer
    }

    /// Parse the next value or indirect object definition
    pub fn parse(&mut self) -> ParseResult<Parsed> {
        self.parse_next(true)
    }

    /// Parse the next value; an object definition here is an error
    pub fn parse_value(&mut self) -> ParseResult<Object> {
        match self.parse_next(false)? {
            Parsed::Value(value) => Ok(value),
            Parsed::Indirect(object) => Err(self.syntax_error(format!(
                "unexpected object definition {}",
                object.id()
            ))),
        }
    }

    /// Parse an `n g obj ... endobj` definition
    pub fn parse_indirect(&mut self) -> ParseResult<IndirectObject> {
        let position = self.lexer.position();
        match self.parse_next(true)? {
            Parsed::Indirect(object) => Ok(object),
            Parsed::Value(value) => Err(ParseError::UnexpectedToken {
                expected: "indirect object".to_string(),
                found: value.type_name().to_string(),
                position,
                length: self.lexer.len(),
            }),
        }
    }

    fn parse_next(&mut self, allow_definition: bool) -> ParseResult<Parsed> {
        let position = self.lexer.position();
        let token = self.lexer.read()?;

        let value = match token {
            Token::Integer(n) => return self.parse_after_integer(n, allow_definition),
            Token::Real(r) => Object::Real(r),
            Token::Boolean(b) => Object::Boolean(b),
            Token::Null => Object::Null,
            Token::Name(name) => Object::Name(name),
            Token::StringLiteral(raw) => string_or_date(PdfString::from_literal_lexeme(&raw)),
            Token::HexStringLiteral(bytes) => Object::String(PdfString::from_hex(bytes)),
            Token::BeginArray => self.parse_array()?,
            Token::BeginDictionary => self.parse_dictionary_or_stream()?,
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "object".to_string(),
                    found: format!("{other:?}"),
                    position,
                    length: self.lexer.len(),
                })
            }
        };

        Ok(Parsed::Value(value))
    }

    /// Lookahead after an integer: `g R`, `g obj`, or a bare integer
    fn parse_after_integer(&mut self, number: i64, allow_definition: bool) -> ParseResult<Parsed> {
        let after_first = self.lexer.save_position();

        if let Ok(Some(Token::Integer(generation))) = self.lexer.peek() {
            self.lexer.read()?;
            match self.lexer.peek() {
                Ok(Some(Token::Reference)) => {
                    self.lexer.read()?;
                    let id = self.object_id(number, generation)?;
                    return Ok(Parsed::Value(Object::Reference(id)));
                }
                Ok(Some(Token::BeginObject)) if allow_definition => {
                    self.lexer.read()?;
                    let id = self.object_id(number, generation)?;
                    return self.parse_definition(id);
                }
                _ => {}
            }
        }

        self.lexer.restore_position(after_first)?;
        Ok(Parsed::Value(Object::Integer(number)))
    }

    fn parse_definition(&mut self, id: ObjectId) -> ParseResult<Parsed> {
        let value = self.parse_value()?;
        // endobj is optional
        if matches!(self.lexer.peek(), Ok(Some(Token::EndObject))) {
            self.lexer.read()?;
        }
        Ok(Parsed::Indirect(IndirectObject::new(id, value)))
    }

    fn object_id(&self, number: i64, generation: i64) -> ParseResult<ObjectId> {
        match (u32::try_from(number), u16::try_from(generation)) {
            (Ok(number), Ok(generation)) => Ok(ObjectId::new(number, generation)),
            _ => Err(self.syntax_error(format!(
                "invalid object id {number} {generation}"
            ))),
        }
    }

    fn parse_array(&mut self) -> ParseResult<Object> {
        let mut elements = Vec::new();
        loop {
            match self.lexer.peek()? {
                Some(Token::EndArray) => {
                    self.lexer.read()?;
                    break;
                }
                None => return Err(self.lexer.reader().eof_error()),
                Some(_) => elements.push(self.parse_value()?),
            }
        }
        Ok(Object::Array(elements))
    }

    fn parse_dictionary_or_stream(&mut self) -> ParseResult<Object> {
        let dict = self.parse_dictionary()?;
        if !matches!(self.lexer.peek(), Ok(Some(Token::BeginStream))) {
            return Ok(Object::Dictionary(dict));
        }
        self.parse_stream(dict)
    }

    fn parse_dictionary(&mut self) -> ParseResult<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            let position = self.lexer.position();
            match self.lexer.peek()? {
                Some(Token::EndDictionary) => {
                    self.lexer.read()?;
                    break;
                }
                None if self.in_object_stream => break,
                None => return Err(self.lexer.reader().eof_error()),
                Some(Token::Name(key)) => {
                    self.lexer.read()?;
                    let value = self.parse_value()?;
                    dict.set(key, value);
                }
                Some(other) => {
                    return Err(ParseError::SyntaxError {
                        position,
                        length: self.lexer.len(),
                        message: format!("dictionary key must be a name, found {other:?}"),
                    })
                }
            }
        }
        Ok(dict)
    }

    fn parse_stream(&mut self, mut dict: Dictionary) -> ParseResult<Object> {
        let position = self.lexer.position();
        self.lexer.expect(TokenKind::BeginStream)?;

        let length = self.stream_length(&dict, position)?;
        self.lexer.skip_stream_eol();
        let raw = self.lexer.read_raw(length)?;
        self.lexer.expect(TokenKind::EndStream)?;

        // An indirect length is replaced by its value
        dict.set("Length", length as i64);
        let is_object_stream = dict.get_name("Type") == Some("ObjStm");
        let stream = Stream::new(dict, raw);

        if is_object_stream {
            Ok(Object::ObjectStream(ObjectStream::from_stream(stream)?))
        } else {
            Ok(Object::Stream(stream))
        }
    }

    fn stream_length(&mut self, dict: &Dictionary, position: usize) -> ParseResult<usize> {
        let length = match dict.get("Length") {
            Some(Object::Integer(n)) => Some(*n),
            Some(Object::Reference(id)) => match self.resolver.as_deref_mut() {
                Some(resolver) => resolver.resolve_integer(*id)?,
                None => None,
            },
            _ => None,
        };

        length
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(ParseError::MissingStreamLength {
                position,
                length: self.lexer.len(),
            })
    }

    fn syntax_error(&self, message: String) -> ParseError {
        ParseError::SyntaxError {
            position: self.lexer.position(),
            length: self.lexer.len(),
            message,
        }
    }
}

/// A literal starting with `D:` becomes a date when it parses as one
fn string_or_date(string: PdfString) -> Object {
    if string.encoding() == StringEncoding::Literal && string.as_bytes().starts_with(b"D:") {
        if let Some(date) = std::str::from_utf8(string.as_bytes())
            .ok()
            .and_then(PdfDate::parse)
        {
            return Object::Date(date);
        }
    }
    Object::String(string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(input: &'static [u8]) -> Parsed {
        Parser::from_bytes(input).parse().unwrap()
    }

    fn value(input: &'static [u8]) -> Object {
        Parser::from_bytes(input).parse_value().unwrap()
    }

    struct MapResolver(HashMap<ObjectId, i64>);

    impl ReferenceResolver for MapResolver {
        fn resolve_integer(&mut self, id: ObjectId) -> ParseResult<Option<i64>> {
            Ok(self.0.get(&id).copied())
        }
    }

    #[test]
    fn test_reference() {
        assert_eq!(
            parse(b"3 7 R"),
            Parsed::Value(Object::Reference(ObjectId::new(3, 7)))
        );
    }

    #[test]
    fn test_bare_integer() {
        assert_eq!(parse(b"32"), Parsed::Value(Object::Integer(32)));
    }

    #[test]
    fn test_two_integers_rewind() {
        let mut parser = Parser::from_bytes(&b"12 34 /Next"[..]);
        assert_eq!(parser.parse_value().unwrap(), Object::Integer(12));
        assert_eq!(parser.parse_value().unwrap(), Object::Integer(34));
        assert_eq!(parser.parse_value().unwrap(), Object::name("Next"));
    }

    #[test]
    fn test_integer_array_with_references() {
        assert_eq!(
            value(b"[1 2 0 R 3]"),
            Object::Array(vec![
                Object::Integer(1),
                Object::Reference(ObjectId::new(2, 0)),
                Object::Integer(3),
            ])
        );
    }

    #[test]
    fn test_object_definition_with_stream() {
        match parse(b"3 7 obj <</Length 1>> stream\n1\nendstream") {
            Parsed::Indirect(object) => {
                assert_eq!(object.id(), ObjectId::new(3, 7));
                let stream = object.value().as_stream().unwrap();
                assert_eq!(stream.raw_data().as_ref(), b"1");
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_definition_with_endobj() {
        let mut parser = Parser::from_bytes(&b"1 0 obj\n<</Type /Catalog>>\nendobj\n2 0 obj 5 endobj"[..]);
        let first = parser.parse_indirect().unwrap();
        assert_eq!(first.value().as_dict().unwrap().get_name("Type"), Some("Catalog"));
        let second = parser.parse_indirect().unwrap();
        assert_eq!(second.value(), &Object::Integer(5));
    }

    #[test]
    fn test_nested_definition_is_rejected() {
        assert!(Parser::from_bytes(&b"[1 0 obj 2 endobj]"[..]).parse_value().is_err());
    }

    #[test]
    fn test_dictionary_values() {
        let dict = value(b"<</Type /Page /Count 3 /Scale 1.5 /Kids [4 0 R] /Open true /Gone null>>");
        let dict = dict.as_dict().unwrap();
        assert_eq!(dict.get_name("Type"), Some("Page"));
        assert_eq!(dict.get_integer("Count"), Some(3));
        assert_eq!(dict.get("Scale"), Some(&Object::Real(1.5)));
        assert_eq!(dict.get("Open"), Some(&Object::Boolean(true)));
        assert!(!dict.contains_key("Gone"));
    }

    #[test]
    fn test_dictionary_key_must_be_name() {
        let result = Parser::from_bytes(&b"<< 1 2 >>"[..]).parse_value();
        assert!(matches!(result, Err(ParseError::SyntaxError { .. })));
    }

    #[test]
    fn test_unterminated_dictionary() {
        let result = Parser::from_bytes(&b"<</A 1"[..]).parse_value();
        assert!(matches!(result, Err(ParseError::UnexpectedEndOfInput { .. })));

        let tolerant = Parser::from_bytes(&b"<</A 1"[..])
            .in_object_stream(true)
            .parse_value()
            .unwrap();
        assert_eq!(tolerant.as_dict().unwrap().get_integer("A"), Some(1));
    }

    #[test]
    fn test_string_and_date() {
        assert_eq!(
            value(br"(Hello\r\n(World))"),
            Object::String(PdfString::new(b"Hello\r\n(World)".to_vec(), StringEncoding::Literal))
        );
        assert!(matches!(value(b"(D:20230615143045Z)"), Object::Date(_)));
        assert!(matches!(value(b"(D:garbage)"), Object::String(_)));
        assert!(matches!(value(b"<443A32303233>"), Object::String(_)));
    }

    #[test]
    fn test_missing_stream_length() {
        let result = Parser::from_bytes(&b"<</Filter /FlateDecode>> stream\nabc\nendstream"[..]).parse_value();
        assert!(matches!(result, Err(ParseError::MissingStreamLength { .. })));
    }

    #[test]
    fn test_indirect_length_without_resolver() {
        let result = Parser::from_bytes(&b"<</Length 9 0 R>> stream\nabc\nendstream"[..]).parse_value();
        assert!(matches!(result, Err(ParseError::MissingStreamLength { .. })));
    }

    #[test]
    fn test_indirect_length_with_resolver() {
        let mut resolver = MapResolver(HashMap::from([(ObjectId::new(9, 0), 3)]));
        let object = Parser::from_bytes(&b"<</Length 9 0 R>> stream\r\nabc\nendstream"[..])
            .with_resolver(&mut resolver)
            .parse_value()
            .unwrap();
        let stream = object.as_stream().unwrap();
        assert_eq!(stream.raw_data().as_ref(), b"abc");
        assert_eq!(stream.dict().get_integer("Length"), Some(3));
    }

    #[test]
    fn test_wrong_length_misses_endstream() {
        let result = Parser::from_bytes(&b"<</Length 2>> stream\nabcdef\nendstream"[..]).parse_value();
        assert!(result.is_err());
    }

    #[test]
    fn test_object_stream_promotion() {
        let input = b"<</Type /ObjStm /N 1 /First 4 /Length 8>> stream\n1 0 true\nendstream";
        let object = Parser::from_bytes(&input[..]).parse_value().unwrap();
        let container = object.as_object_stream().unwrap();
        assert_eq!(container.len(), 1);
        assert_eq!(
            container.object_at(0).unwrap().unwrap().value(),
            &Object::Boolean(true)
        );
    }

    #[test]
    fn test_object_stream_without_n_fails() {
        let input = b"<</Type /ObjStm /First 4 /Length 8>> stream\n1 0 true\nendstream";
        let result = Parser::from_bytes(&input[..]).parse_value();
        assert!(matches!(result, Err(ParseError::MissingKey(_))));
    }

    #[test]
    fn test_leading_comments_are_skipped() {
        assert_eq!(value(b"% note\n/Name"), Object::name("Name"));
    }

    #[test]
    fn test_unexpected_token() {
        let result = Parser::from_bytes(&b"endobj"[..]).parse_value();
        assert!(matches!(result, Err(ParseError::UnexpectedToken { .. })));
    }
}
