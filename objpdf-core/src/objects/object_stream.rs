//! Object streams (ISO 32000-1 Section 7.5.7)

use crate::objects::{Dictionary, IndirectObject, ObjectId, Stream};
use crate::parser::{Lexer, ParseError, ParseResult, Parser, Token};
use bytes::Bytes;
use once_cell::unsync::OnceCell;
use tracing::debug;

/// A stream whose decoded payload packs `N` indirect objects
///
/// The payload starts with `N` pairs of `number offset`; offsets are
/// relative to `/First`.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    stream: Stream,
    count: usize,
    first: usize,
    header: OnceCell<Vec<(u32, usize)>>,
}

impl ObjectStream {
    /// Wrap a stream, requiring `/N` and `/First`
    pub fn from_stream(stream: Stream) -> ParseResult<Self> {
        let count = required_count(stream.dict(), "N")?;
        let first = required_count(stream.dict(), "First")?;
        Ok(Self {
            stream,
            count,
            first,
            header: OnceCell::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    pub fn dict(&self) -> &Dictionary {
        self.stream.dict()
    }

    pub fn into_stream(self) -> Stream {
        self.stream
    }

    /// Ids of the packed objects in header order
    pub fn ids(&self) -> ParseResult<Vec<ObjectId>> {
        Ok(self
            .header()?
            .iter()
            .map(|(number, _)| ObjectId::new(*number, 0))
            .collect())
    }

    /// The object at position `index` of the header
    pub fn object_at(&self, index: usize) -> ParseResult<Option<IndirectObject>> {
        let header = self.header()?;
        let Some(&(number, offset)) = header.get(index) else {
            return Ok(None);
        };

        let data = self.stream.decoded_data()?;
        let start = self.first.saturating_add(offset);
        // Bound the member by the next offset so trailing integers of the
        // following member cannot be mistaken for a reference
        let end = header
            .iter()
            .map(|(_, other)| self.first.saturating_add(*other))
            .filter(|other| *other > start)
            .min()
            .unwrap_or(data.len())
            .min(data.len());
        if start > end {
            return Err(ParseError::InvalidXRef {
                position: start,
                length: data.len(),
                message: format!("object stream member {number} lies outside the payload"),
            });
        }

        let mut parser = Parser::new(Lexer::from_bytes(data.slice(start..end))).in_object_stream(true);
        let value = parser.parse_value()?;
        Ok(Some(IndirectObject::new(ObjectId::new(number, 0), value)))
    }

    /// The packed object with the given number, if present
    pub fn object_by_number(&self, number: u32) -> ParseResult<Option<IndirectObject>> {
        match self.header()?.iter().position(|(n, _)| *n == number) {
            Some(index) => self.object_at(index),
            None => Ok(None),
        }
    }

    fn header(&self) -> ParseResult<&Vec<(u32, usize)>> {
        self.header.get_or_try_init(|| {
            let data = self.stream.decoded_data()?;
            parse_header(&data, self.count, self.first)
        })
    }
}

impl PartialEq for ObjectStream {
    fn eq(&self, other: &Self) -> bool {
        self.stream == other.stream
    }
}

fn required_count(dict: &Dictionary, key: &str) -> ParseResult<usize> {
    dict.get_integer(key)
        .and_then(|value| usize::try_from(value).ok())
        .ok_or_else(|| ParseError::MissingKey(key.to_string()))
}

fn parse_header(data: &Bytes, count: usize, first: usize) -> ParseResult<Vec<(u32, usize)>> {
    if first > data.len() {
        return Err(ParseError::InvalidXRef {
            position: first,
            length: data.len(),
            message: "/First points past the end of the object stream".to_string(),
        });
    }

    // Each `number offset` pair takes at least three bytes plus a separator
    let capacity = (first + 1) / 4;
    if count > capacity {
        return Err(ParseError::SyntaxError {
            position: first,
            length: data.len(),
            message: format!(
                "object stream declares {count} objects but its {first}-byte header holds at most {capacity}"
            ),
        });
    }

    let mut lexer = Lexer::from_bytes(data.slice(..first));
    let mut header = Vec::with_capacity(count);
    for _ in 0..count {
        let position = lexer.position();
        let number = header_integer(&mut lexer)?;
        let offset = header_integer(&mut lexer)?;
        let number = u32::try_from(number).map_err(|_| ParseError::SyntaxError {
            position,
            length: data.len(),
            message: format!("invalid object number {number} in object stream header"),
        })?;
        let offset = usize::try_from(offset).map_err(|_| ParseError::SyntaxError {
            position,
            length: data.len(),
            message: format!("invalid offset {offset} in object stream header"),
        })?;
        header.push((number, offset));
    }

    debug!(count, first, "Parsed object stream header");
    Ok(header)
}

fn header_integer(lexer: &mut Lexer) -> ParseResult<u64> {
    let position = lexer.position();
    match lexer.read()? {
        Token::Integer(value) if value >= 0 => Ok(value as u64),
        other => Err(ParseError::UnexpectedToken {
            expected: "non-negative integer".to_string(),
            found: format!("{other:?}"),
            position,
            length: lexer.len(),
        }),
    }
}
