//! PDF Trailer
//!
//! Trailer dictionary according to ISO 32000-1 Section 7.5.5

use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};

/// The root dictionary of a revision
#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    dict: Dictionary,
}

impl Trailer {
    pub fn new(dict: Dictionary) -> Self {
        Self { dict }
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    pub fn dict_mut(&mut self) -> &mut Dictionary {
        &mut self.dict
    }

    pub fn into_dict(self) -> Dictionary {
        self.dict
    }

    /// Check the keys a usable final trailer must carry
    pub fn validate(&self) -> ParseResult<()> {
        self.root()
            .map(|_| ())
            .ok_or_else(|| ParseError::MissingKey("Root".to_string()))
    }

    pub fn size(&self) -> Option<i64> {
        self.dict.get_integer("Size")
    }

    /// The document catalog reference
    pub fn root(&self) -> Option<ObjectId> {
        self.dict.get_reference("Root")
    }

    /// The `/Info` entry, either a reference or an inline dictionary
    pub fn info(&self) -> Option<&Object> {
        self.dict.get("Info")
    }

    pub fn encrypt(&self) -> Option<&Object> {
        self.dict.get("Encrypt")
    }

    pub fn is_encrypted(&self) -> bool {
        self.dict.contains_key("Encrypt")
    }

    /// File identifier array
    pub fn id(&self) -> Option<&Vec<Object>> {
        self.dict.get_array("ID")
    }

    /// Byte offset of the previous revision's cross-reference section
    pub fn prev(&self) -> Option<usize> {
        self.offset("Prev")
    }

    /// Cross-reference stream offset of a hybrid-reference file
    pub fn xref_stm(&self) -> Option<usize> {
        self.offset("XRefStm")
    }

    fn offset(&self, key: &str) -> Option<usize> {
        self.dict
            .get_integer(key)
            .and_then(|offset| usize::try_from(offset).ok())
    }
}
