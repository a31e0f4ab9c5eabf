use crate::objects::Dictionary;
use crate::parser::filters::{FilterError, FilterPipeline};
use bytes::Bytes;
use once_cell::unsync::OnceCell;
use std::fmt;

/// Dictionary plus an opaque payload
///
/// The payload is decoded on first request and the outcome, success or
/// failure, is kept for the lifetime of the instance.
#[derive(Clone)]
pub struct Stream {
    dict: Dictionary,
    raw: Bytes,
    decoded: OnceCell<Result<Bytes, FilterError>>,
}

impl Stream {
    /// Create a stream; `/Length` is set from the payload
    pub fn new(dict: Dictionary, raw: impl Into<Bytes>) -> Self {
        let raw = raw.into();
        let mut dict = dict;
        dict.set("Length", raw.len() as i64);
        Self {
            dict,
            raw,
            decoded: OnceCell::new(),
        }
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// Mutable access to the dictionary; forgets any cached decode
    pub fn dict_mut(&mut self) -> &mut Dictionary {
        self.decoded = OnceCell::new();
        &mut self.dict
    }

    /// Payload exactly as stored in the file
    pub fn raw_data(&self) -> &Bytes {
        &self.raw
    }

    /// Replace the payload, keeping `/Length` in step
    pub fn set_raw_data(&mut self, raw: impl Into<Bytes>) {
        self.raw = raw.into();
        self.dict.set("Length", self.raw.len() as i64);
        self.decoded = OnceCell::new();
    }

    /// Filter chain declared by the dictionary
    pub fn filters(&self) -> Result<FilterPipeline, FilterError> {
        FilterPipeline::from_dict(&self.dict)
    }

    /// Decoded payload, computed at most once
    pub fn decoded_data(&self) -> Result<Bytes, FilterError> {
        self.decoded
            .get_or_init(|| self.filters()?.decode(&self.raw))
            .clone()
    }

    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    pub fn into_parts(self) -> (Dictionary, Bytes) {
        (self.dict, self.raw)
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.dict == other.dict && self.raw == other.raw
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("dict", &self.dict)
            .field("raw_len", &self.raw.len())
            .field("decoded", &self.is_decoded())
            .finish()
    }
}
