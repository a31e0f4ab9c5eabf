//! Seekable byte cursor
//!
//! Every reader in the parser works on an in-memory copy of the file. The
//! buffer is a [`Bytes`] handle, so several cursors can walk the same input
//! without copying it.

use super::{ParseError, ParseResult};
use bytes::Bytes;

/// Position-tracking cursor over a shared byte buffer
#[derive(Debug, Clone)]
pub struct ByteReader {
    data: Bytes,
    position: usize,
}

impl ByteReader {
    /// Create a cursor at the start of `data`
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    /// Create a cursor positioned at `position`
    pub fn at(data: Bytes, position: usize) -> ParseResult<Self> {
        let mut reader = Self::new(data);
        reader.seek(position)?;
        Ok(reader)
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Move the cursor to an absolute byte offset
    pub fn seek(&mut self, position: usize) -> ParseResult<()> {
        if position > self.data.len() {
            return Err(ParseError::UnexpectedEndOfInput {
                position,
                length: self.data.len(),
            });
        }
        self.position = position;
        Ok(())
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    /// Peek `offset` bytes past the cursor
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.position + offset).copied()
    }

    pub fn read_byte(&mut self) -> ParseResult<u8> {
        let byte = self.peek().ok_or_else(|| self.eof_error())?;
        self.position += 1;
        Ok(byte)
    }

    /// Skip one byte if present
    pub fn advance(&mut self) {
        if self.position < self.data.len() {
            self.position += 1;
        }
    }

    /// Read exactly `n` bytes without copying the underlying buffer
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<Bytes> {
        let end = self
            .position
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.eof_error())?;
        let bytes = self.data.slice(self.position..end);
        self.position = end;
        Ok(bytes)
    }

    /// Check whether the unread input starts with `prefix`
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.data
            .get(self.position..)
            .is_some_and(|rest| rest.starts_with(prefix))
    }

    /// Offsets of every occurrence of `pattern` within the last `window` bytes
    pub fn find_in_tail(&self, pattern: &[u8], window: usize) -> Vec<usize> {
        if pattern.is_empty() || self.data.len() < pattern.len() {
            return Vec::new();
        }
        let start = self.data.len().saturating_sub(window);
        self.data[start..]
            .windows(pattern.len())
            .enumerate()
            .filter(|(_, candidate)| *candidate == pattern)
            .map(|(i, _)| start + i)
            .collect()
    }

    pub(crate) fn eof_error(&self) -> ParseError {
        ParseError::UnexpectedEndOfInput {
            position: self.position,
            length: self.data.len(),
        }
    }

    pub(crate) fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::SyntaxError {
            position: self.position,
            length: self.data.len(),
            message: message.into(),
        }
    }
}
