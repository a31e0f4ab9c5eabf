mod date;
mod dictionary;
mod object_stream;
mod primitive;
mod stream;
mod string;

pub use date::PdfDate;
pub use dictionary::Dictionary;
pub use object_stream::ObjectStream;
pub use primitive::{IndirectObject, Object, ObjectId};
pub use stream::Stream;
pub use string::{PdfString, StringEncoding};
