//! PDF Parser Module
//!
//! Reads the file structure of a PDF: header, tokens, objects, the
//! cross-reference chain and the lazily populated object cache.

pub mod byte_reader;
pub mod cache;
pub mod filters;
pub mod header;
pub mod lexer;
pub mod object_parser;
pub mod trailer;
pub mod xref;
pub mod xref_stream;

use crate::objects::ObjectId;

pub use self::byte_reader::ByteReader;
pub use self::cache::{ObjectCache, ResolveMode};
pub use self::filters::{Filter, FilterError, FilterPipeline};
pub use self::header::PdfVersion;
pub use self::lexer::{Lexer, Token, TokenKind};
pub use self::object_parser::{Parsed, Parser, ReferenceResolver};
pub use self::trailer::Trailer;
pub use self::xref::{XRefEntry, XRefTable};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing %PDF- header")]
    MissingHeader,

    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    #[error("Unexpected end of input at byte {position} of {length}")]
    UnexpectedEndOfInput { position: usize, length: usize },

    #[error("Unexpected token at byte {position} of {length}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
        length: usize,
    },

    #[error("Malformed number '{lexeme}' at byte {position} of {length}")]
    MalformedNumber {
        lexeme: String,
        position: usize,
        length: usize,
    },

    #[error("Syntax error at byte {position} of {length}: {message}")]
    SyntaxError {
        position: usize,
        length: usize,
        message: String,
    },

    #[error("Stream without a resolvable /Length at byte {position} of {length}")]
    MissingStreamLength { position: usize, length: usize },

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Invalid cross-reference data at byte {position} of {length}: {message}")]
    InvalidXRef {
        position: usize,
        length: usize,
        message: String,
    },

    #[error("Object identity mismatch: expected {expected}, found {found}")]
    ObjectIdentityMismatch { expected: ObjectId, found: ObjectId },

    #[error("Cannot resolve object {id} (read position {position}): {message}")]
    ObjectResolution {
        id: ObjectId,
        position: usize,
        message: String,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Options controlling how tolerant the reader is of damaged files
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Fail when the object found at an xref location carries another id
    pub strict_object_ids: bool,
    /// Maximum number of revisions followed through `/Prev`
    pub max_revisions: usize,
    /// How many trailing bytes are scanned for `startxref`
    pub tail_scan_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::strict()
    }
}

impl ParseOptions {
    /// Validate every resolved object id
    pub fn strict() -> Self {
        Self {
            strict_object_ids: true,
            max_revisions: 64,
            tail_scan_bytes: 1024,
        }
    }

    /// Accept objects whose header disagrees with the xref entry
    pub fn lenient() -> Self {
        Self {
            strict_object_ids: false,
            ..Self::strict()
        }
    }
}
