//! PDF writing functionality

mod object_stream_writer;
mod pdf_writer;
pub mod serialize;
mod xref_stream_writer;

pub use object_stream_writer::ObjectStreamBuilder;
pub use pdf_writer::{PdfWriter, WriterConfig};
pub use xref_stream_writer::XRefStreamWriter;
