//! XRef Stream Writer for PDF 1.5+
//!
//! Builds the single cross-reference stream that closes every written file
//! (ISO 32000-1:2008 Section 7.5.8).

use crate::compression::{self, CompressionLevel};
use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use crate::parser::XRefEntry;
use std::collections::BTreeMap;

/// Writer for XRef streams
#[derive(Debug)]
pub struct XRefStreamWriter {
    /// Entries keyed by object number
    entries: BTreeMap<u32, XRefEntry>,
    /// Object ID for this XRef stream
    stream_id: ObjectId,
    /// Trailer entries copied into the stream dictionary
    trailer: Dictionary,
}

impl XRefStreamWriter {
    /// Create a writer holding only the object 0 free-list head
    pub fn new(stream_id: ObjectId) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            0,
            XRefEntry::Free {
                next: 0,
                generation: 0xFF,
            },
        );
        Self {
            entries,
            stream_id,
            trailer: Dictionary::new(),
        }
    }

    /// Copy `Root`, `Info`, `ID` and `Encrypt` from a trailer dictionary
    pub fn set_trailer_info(&mut self, trailer: &Dictionary) {
        for key in ["Root", "Info", "ID", "Encrypt"] {
            if let Some(value) = trailer.get(key) {
                self.trailer.set(key, value.clone());
            }
        }
    }

    pub fn add_entry(&mut self, number: u32, entry: XRefEntry) {
        self.entries.insert(number, entry);
    }

    pub fn add_in_use_entry(&mut self, id: ObjectId, offset: u64) {
        self.add_entry(
            id.number(),
            XRefEntry::Indirect {
                offset: offset as usize,
                generation: id.generation(),
            },
        );
    }

    pub fn add_compressed_entry(&mut self, number: u32, container: u32, index: u32) {
        self.add_entry(number, XRefEntry::Compressed { container, index });
    }

    /// Calculate minimum bytes needed to represent a value
    fn bytes_needed(value: u64) -> usize {
        if value == 0 {
            1
        } else {
            ((value.ilog2() / 8) + 1) as usize
        }
    }

    fn fields(entry: &XRefEntry) -> [u64; 3] {
        match *entry {
            XRefEntry::Free { next, generation } => [0, next as u64, generation as u64],
            XRefEntry::Indirect { offset, generation } => [1, offset as u64, generation as u64],
            XRefEntry::Compressed { container, index } => [2, container as u64, index as u64],
        }
    }

    /// Per-field byte widths covering every entry
    pub fn widths(&self) -> [usize; 3] {
        let mut widths = [1usize; 3];
        for entry in self.entries.values() {
            for (width, value) in widths.iter_mut().zip(Self::fields(entry)) {
                *width = (*width).max(Self::bytes_needed(value));
            }
        }
        widths
    }

    /// `/Index` pairs: one per run of consecutive object numbers
    pub fn index(&self) -> Vec<(u32, u32)> {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for &number in self.entries.keys() {
            match runs.last_mut() {
                Some((start, count)) if *start + *count == number => *count += 1,
                _ => runs.push((number, 1)),
            }
        }
        runs
    }

    /// Encode entries into binary data
    pub fn encode_entries(&self) -> Vec<u8> {
        let widths = self.widths();
        let mut data = Vec::with_capacity(self.entries.len() * widths.iter().sum::<usize>());
        for entry in self.entries.values() {
            for (value, width) in Self::fields(entry).into_iter().zip(widths) {
                Self::write_field(&mut data, value, width);
            }
        }
        data
    }

    /// Write a field with the specified width
    fn write_field(data: &mut Vec<u8>, value: u64, width: usize) {
        for i in (0..width).rev() {
            data.push(((value >> (i * 8)) & 0xFF) as u8);
        }
    }

    /// Create the XRef stream dictionary
    pub fn create_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();

        dict.set("Type", Object::name("XRef"));
        let size = self.entries.keys().next_back().copied().unwrap_or(0) as i64 + 1;
        dict.set("Size", size);

        let index: Vec<Object> = self
            .index()
            .into_iter()
            .flat_map(|(start, count)| [Object::Integer(start as i64), Object::Integer(count as i64)])
            .collect();
        dict.set("Index", index);

        let widths: Vec<Object> = self
            .widths()
            .into_iter()
            .map(|w| Object::Integer(w as i64))
            .collect();
        dict.set("W", widths);

        for (key, value) in self.trailer.iter() {
            dict.set(key.clone(), value.clone());
        }
        dict
    }

    /// The complete stream, compressed at `level`
    pub fn build(&self, level: CompressionLevel) -> Result<Stream> {
        let mut dict = self.create_dictionary();
        let mut data = self.encode_entries();
        if level.is_compressed() {
            data = compression::compress(&data, level)?;
            dict.set("Filter", Object::name("FlateDecode"));
        }
        Ok(Stream::new(dict, data))
    }

    /// Get the number of entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Get the stream object ID
    pub fn stream_id(&self) -> ObjectId {
        self.stream_id
    }
}
