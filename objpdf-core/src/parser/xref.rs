//! PDF Cross-Reference Table
//!
//! Locates the last `startxref`, reads table or stream sections and merges
//! every revision reachable through `/Prev` (ISO 32000-1 Section 7.5.4).

use super::lexer::{Lexer, Token, TokenKind};
use super::object_parser::Parser;
use super::trailer::Trailer;
use super::xref_stream::parse_xref_stream;
use super::{ByteReader, ParseError, ParseOptions, ParseResult};
use crate::objects::Object;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Where an object lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    Free { next: u32, generation: u16 },
    /// Stored directly at a byte offset
    Indirect { offset: usize, generation: u16 },
    /// Packed inside an object stream
    Compressed { container: u32, index: u32 },
}

impl XRefEntry {
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { generation, .. } | XRefEntry::Indirect { generation, .. } => {
                *generation
            }
            XRefEntry::Compressed { .. } => 0,
        }
    }

    pub fn is_in_use(&self) -> bool {
        !matches!(self, XRefEntry::Free { .. })
    }
}

/// Object number to entry index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
}

impl XRefTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    /// Insert only when the number is not present yet; returns whether it was inserted
    pub fn merge_entry(&mut self, number: u32, entry: XRefEntry) -> bool {
        if self.entries.contains_key(&number) {
            return false;
        }
        self.entries.insert(number, entry);
        true
    }

    /// Fold an older section into this one; entries already present win
    pub fn merge(&mut self, older: XRefTable) {
        for (number, entry) in older.entries {
            self.merge_entry(number, entry);
        }
    }

    /// Overwrite an entry
    pub fn set(&mut self, number: u32, entry: XRefEntry) {
        self.entries.insert(number, entry);
    }

    pub fn contains(&self, number: u32) -> bool {
        self.entries.contains_key(&number)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &XRefEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }
}

/// Read every revision of the file, newest first
///
/// The returned trailer is the newest one; the table merges all revisions
/// with the newest entry for each number winning.
pub fn read_xref(data: &Bytes, options: &ParseOptions) -> ParseResult<(XRefTable, Trailer)> {
    let start = find_startxref(data, options.tail_scan_bytes)?;

    let mut table = XRefTable::new();
    let mut newest: Option<Trailer> = None;
    let mut visited = HashSet::new();
    let mut next = Some(start);

    while let Some(offset) = next.take() {
        if !visited.insert(offset) {
            warn!(offset, "Cross-reference chain revisits an offset, stopping");
            break;
        }
        if visited.len() > options.max_revisions {
            warn!(
                max_revisions = options.max_revisions,
                "Cross-reference chain too long, ignoring older revisions"
            );
            break;
        }

        match read_revision(data, offset) {
            Ok((section, trailer)) => {
                debug!(offset, entries = section.len(), "Read cross-reference revision");
                table.merge(section);
                next = trailer.prev();
                if newest.is_none() {
                    newest = Some(trailer);
                }
            }
            Err(e) if newest.is_some() => {
                warn!(offset, error = %e, "Unreadable older revision, ignoring it");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    let trailer = newest.ok_or_else(|| ParseError::InvalidXRef {
        position: start,
        length: data.len(),
        message: "no readable trailer".to_string(),
    })?;
    trailer.validate()?;
    Ok((table, trailer))
}

/// Offset named by the last `startxref` in the file tail
pub fn find_startxref(data: &Bytes, window: usize) -> ParseResult<usize> {
    let reader = ByteReader::new(data.clone());
    let position = reader
        .find_in_tail(b"startxref", window)
        .last()
        .copied()
        .ok_or_else(|| ParseError::InvalidXRef {
            position: data.len().saturating_sub(window),
            length: data.len(),
            message: "startxref not found".to_string(),
        })?;

    let mut lexer = Lexer::new(ByteReader::at(data.clone(), position)?);
    lexer.expect(TokenKind::StartXRef)?;
    match lexer.read()? {
        Token::Integer(offset) if offset >= 0 && (offset as usize) < data.len() => {
            Ok(offset as usize)
        }
        other => Err(ParseError::InvalidXRef {
            position,
            length: data.len(),
            message: format!("startxref points nowhere: {other:?}"),
        }),
    }
}

/// Read the section at `offset`, in whichever form it is written
fn read_revision(data: &Bytes, offset: usize) -> ParseResult<(XRefTable, Trailer)> {
    let mut lexer = Lexer::new(ByteReader::at(data.clone(), offset)?);
    match lexer.peek()? {
        Some(Token::XRef) => {
            let (mut table, trailer) = read_table_section(lexer)?;
            if let Some(stream_offset) = trailer.xref_stm() {
                // Hybrid-reference file: the stream's rows come after the table's
                let (stream_table, _) = read_stream_section(data, stream_offset)?;
                table.merge(stream_table);
            }
            Ok((table, trailer))
        }
        Some(Token::Integer(_)) => read_stream_section(data, offset),
        other => Err(ParseError::InvalidXRef {
            position: offset,
            length: data.len(),
            message: format!("expected xref or a cross-reference stream, found {other:?}"),
        }),
    }
}

fn read_table_section(lexer: Lexer) -> ParseResult<(XRefTable, Trailer)> {
    let mut parser = Parser::new(lexer);
    parser.lexer_mut().expect(TokenKind::XRef)?;
    let mut table = XRefTable::new();

    loop {
        let position = parser.lexer().position();
        match parser.lexer_mut().read()? {
            Token::Integer(start) => {
                let count = read_count(parser.lexer_mut())?;
                let start = u32::try_from(start).map_err(|_| ParseError::InvalidXRef {
                    position,
                    length: parser.lexer().len(),
                    message: format!("invalid subsection start {start}"),
                })?;
                read_subsection(parser.lexer_mut(), &mut table, start, count)?;
            }
            Token::Trailer => break,
            other => {
                return Err(ParseError::InvalidXRef {
                    position,
                    length: parser.lexer().len(),
                    message: format!("expected subsection or trailer, found {other:?}"),
                })
            }
        }
    }

    let position = parser.lexer().position();
    match parser.parse_value()? {
        Object::Dictionary(dict) => Ok((table, Trailer::new(dict))),
        other => Err(ParseError::InvalidXRef {
            position,
            length: parser.lexer().len(),
            message: format!("trailer is a {}", other.type_name()),
        }),
    }
}

fn read_subsection(lexer: &mut Lexer, table: &mut XRefTable, start: u32, count: u32) -> ParseResult<()> {
    for i in 0..count {
        let number = start.saturating_add(i);
        let offset = read_count(lexer)?;
        let generation = read_count(lexer)?;
        let position = lexer.position();
        match lexer.read()? {
            Token::XRefFree => {}
            Token::XRefIndirect if offset == 0 => {
                warn!(number, "Skipping in-use xref row with offset 0");
            }
            Token::XRefIndirect => {
                let generation =
                    u16::try_from(generation).map_err(|_| ParseError::InvalidXRef {
                        position,
                        length: lexer.len(),
                        message: format!("generation {generation} of object {number} is out of range"),
                    })?;
                table.merge_entry(
                    number,
                    XRefEntry::Indirect {
                        offset: offset as usize,
                        generation,
                    },
                );
            }
            other => {
                return Err(ParseError::InvalidXRef {
                    position,
                    length: lexer.len(),
                    message: format!("expected f or n, found {other:?}"),
                })
            }
        }
    }
    Ok(())
}

fn read_count(lexer: &mut Lexer) -> ParseResult<u32> {
    let position = lexer.position();
    match lexer.read()? {
        Token::Integer(value) if (0..=u32::MAX as i64).contains(&value) => Ok(value as u32),
        other => Err(ParseError::InvalidXRef {
            position,
            length: lexer.len(),
            message: format!("expected a non-negative integer, found {other:?}"),
        }),
    }
}

fn read_stream_section(data: &Bytes, offset: usize) -> ParseResult<(XRefTable, Trailer)> {
    let mut parser = Parser::new(Lexer::new(ByteReader::at(data.clone(), offset)?));
    let object = parser.parse_indirect()?;
    let id = object.id();
    match object.into_value() {
        Object::Stream(stream) => {
            let table = parse_xref_stream(&stream, offset, data.len())?;
            let (dict, _) = stream.into_parts();
            Ok((table, Trailer::new(dict)))
        }
        other => Err(ParseError::ObjectResolution {
            id,
            position: offset,
            message: format!("expected a cross-reference stream, found a {}", other.type_name()),
        }),
    }
}
