//! # objpdf
//!
//! Read, edit and rewrite the object graph of PDF files.
//!
//! ## Features
//!
//! - **Parsing**: tokenizer, recursive-descent object parser and a reader for
//!   cross-reference tables and streams across incremental revisions
//! - **Lazy resolution**: objects are parsed on first access, including
//!   objects packed inside object streams
//! - **Filters**: FlateDecode with PNG predictors and the Identity crypt
//!   filter; unsupported filters fail before producing any output
//! - **Writing**: one consolidated revision closed by a cross-reference
//!   stream, with optional object stream packing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use objpdf::{CompressionLevel, Document, Result, WriterConfig};
//!
//! # fn main() -> Result<()> {
//! let mut doc = Document::load("input.pdf")?;
//!
//! let info = doc.info()?;
//! println!("Title: {:?}", info.title);
//! println!("Objects: {}", doc.object_count()?);
//!
//! doc.set_author("Jane Roe")?;
//! let config = WriterConfig::default()
//!     .with_compression(CompressionLevel::Smallest)
//!     .with_object_streams(true);
//! doc.save_to_path("output.pdf", &config)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Working with objects
//!
//! ```rust,no_run
//! use objpdf::{Document, Object, ObjectId};
//!
//! # fn main() -> objpdf::Result<()> {
//! let mut doc = Document::load("input.pdf")?;
//! if let Some(object) = doc.get_object(ObjectId::new(1, 0))? {
//!     if let Some(dict) = object.value().as_dict() {
//!         println!("Type: {:?}", dict.get_name("Type"));
//!     }
//! }
//! let id = doc.add_object(Object::name("Extra"));
//! println!("Added {id}");
//! # Ok(())
//! # }
//! ```

pub mod compression;
pub mod document;
pub mod error;
pub mod objects;
pub mod parser;
pub mod writer;

#[cfg(test)]
mod test_helpers;

pub use compression::CompressionLevel;
pub use document::{Document, DocumentInfo};
pub use error::{PdfError, Result};
pub use objects::{
    Dictionary, IndirectObject, Object, ObjectId, ObjectStream, PdfDate, PdfString, Stream,
    StringEncoding,
};
pub use parser::{ParseError, ParseOptions, PdfVersion};
pub use writer::{PdfWriter, WriterConfig};

/// Current version of objpdf
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Supported PDF versions
pub mod pdf_version {
    /// Versions accepted when reading
    pub const SUPPORTED_VERSIONS: &[&str] =
        &["1.0", "1.1", "1.2", "1.3", "1.4", "1.5", "1.6", "1.7"];
    /// Lowest version written, since output always carries a cross-reference stream
    pub const MIN_WRITE_VERSION: &str = "1.5";
}
