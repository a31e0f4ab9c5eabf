//! Packs indirect objects into object streams (ISO 32000-1 Section 7.5.7)

use super::serialize::write_value;
use crate::compression::{self, CompressionLevel};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Collects object definitions for one `/Type /ObjStm` container
#[derive(Debug, Default)]
pub struct ObjectStreamBuilder {
    entries: Vec<(u32, usize)>,
    body: Vec<u8>,
}

impl ObjectStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object; returns its index inside the container
    pub fn add(&mut self, id: ObjectId, value: &Object) -> Result<u32> {
        if id.generation() != 0 {
            return Err(PdfError::InvalidStructure(format!(
                "object {id} has a non-zero generation and cannot be packed"
            )));
        }
        if matches!(value, Object::Stream(_) | Object::ObjectStream(_)) {
            return Err(PdfError::InvalidStructure(format!(
                "stream object {id} cannot be packed"
            )));
        }

        let index = self.entries.len() as u32;
        self.entries.push((id.number(), self.body.len()));
        write_value(&mut self.body, value);
        self.body.push(b'\n');
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Header of `number offset` pairs, a newline, then the bodies
    pub fn build(self, level: CompressionLevel) -> Result<Stream> {
        let header = self
            .entries
            .iter()
            .map(|(number, offset)| format!("{number} {offset}"))
            .collect::<Vec<_>>()
            .join(" ");

        let mut payload = Vec::with_capacity(header.len() + 1 + self.body.len());
        payload.extend_from_slice(header.as_bytes());
        payload.push(b'\n');
        payload.extend_from_slice(&self.body);

        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("ObjStm"));
        dict.set("N", self.entries.len() as i64);
        dict.set("First", (header.len() + 1) as i64);

        if level.is_compressed() {
            dict.set("Filter", Object::name("FlateDecode"));
            payload = compression::compress(&payload, level)?;
        }
        Ok(Stream::new(dict, payload))
    }
}
