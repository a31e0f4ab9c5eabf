use super::object_stream_writer::ObjectStreamBuilder;
use super::serialize::write_value;
use super::xref_stream_writer::XRefStreamWriter;
use crate::compression::{self, CompressionLevel};
use crate::document::Document;
use crate::error::Result;
use crate::objects::{Dictionary, IndirectObject, Object, ObjectId, Stream};
use crate::parser::{PdfVersion, XRefEntry};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

/// Cross-reference streams need PDF 1.5
const MIN_OUTPUT_VERSION: PdfVersion = PdfVersion { major: 1, minor: 5 };

/// Configuration for PDF writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Level used for every stream the writer encodes
    pub compression: CompressionLevel,
    /// Pack eligible objects into object streams
    pub pack_object_streams: bool,
    /// Maximum number of objects per object stream
    pub objects_per_stream: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: CompressionLevel::Optimal,
            pack_object_streams: false,
            objects_per_stream: 100,
        }
    }
}

impl WriterConfig {
    pub fn with_compression(mut self, level: CompressionLevel) -> Self {
        self.compression = level;
        self
    }

    pub fn with_object_streams(mut self, enabled: bool) -> Self {
        self.pack_object_streams = enabled;
        self
    }
}

/// Writes a document as one consolidated revision closed by an xref stream
pub struct PdfWriter<W: Write> {
    writer: W,
    config: WriterConfig,
    entries: BTreeMap<u32, XRefEntry>,
    current_position: u64,
}

impl<W: Write> PdfWriter<W> {
    pub fn new_with_writer(writer: W) -> Self {
        Self::with_config(writer, WriterConfig::default())
    }

    pub fn with_config(writer: W, config: WriterConfig) -> Self {
        Self {
            writer,
            config,
            entries: BTreeMap::new(),
            current_position: 0,
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn write_document(&mut self, document: &mut Document) -> Result<()> {
        self.entries.clear();
        self.current_position = 0;

        let version = document.version().max(MIN_OUTPUT_VERSION);
        self.write_header(version)?;

        let objects = document.live_objects()?;
        let encrypted = document.is_encrypted();
        let mut trailer = document.trailer().dict().clone();
        let mut next_number = objects
            .iter()
            .map(|object| object.id().number())
            .max()
            .unwrap_or(0)
            + 1;

        let pack = self.config.pack_object_streams && !encrypted;
        if self.config.pack_object_streams && encrypted {
            warn!("Document is encrypted, writing objects without object streams");
        }
        let encrypt_id = trailer.get_reference("Encrypt");

        let mut packed: Vec<Rc<IndirectObject>> = Vec::new();
        for object in objects {
            let packable = pack
                && object.id().generation() == 0
                && !matches!(object.value(), Object::Stream(_) | Object::ObjectStream(_))
                && Some(object.id()) != encrypt_id;
            if packable {
                packed.push(object);
                continue;
            }

            match object.value() {
                Object::Stream(stream) => {
                    let stream = self.prepare_stream(object.id(), stream, encrypted)?;
                    self.write_object(object.id(), &Object::Stream(stream))?;
                }
                value => self.write_object(object.id(), value)?,
            }
        }

        // A direct /Info dictionary becomes an indirect object of its own
        if let Some(Object::Dictionary(info)) = trailer.get("Info").cloned() {
            let info_id = ObjectId::new(next_number, 0);
            next_number += 1;
            self.write_object(info_id, &Object::Dictionary(info))?;
            trailer.set("Info", info_id);
        }

        let per_stream = self.config.objects_per_stream.max(1);
        for chunk in packed.chunks(per_stream) {
            let container = next_number;
            next_number += 1;
            self.write_object_stream(container, chunk)?;
        }

        let xref_id = ObjectId::new(next_number, 0);
        let xref_position = self.current_position;
        self.write_xref_stream(xref_id, &trailer)?;

        self.write_bytes(format!("startxref\n{xref_position}\n%%EOF\n").as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Byte offsets recorded so far, by object number
    pub fn entries(&self) -> &BTreeMap<u32, XRefEntry> {
        &self.entries
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self, version: PdfVersion) -> Result<()> {
        self.write_bytes(format!("%PDF-{version}\n").as_bytes())?;
        // Binary comment to ensure file is treated as binary
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])?;
        Ok(())
    }

    fn write_object(&mut self, id: ObjectId, object: &Object) -> Result<()> {
        self.entries.insert(
            id.number(),
            XRefEntry::Indirect {
                offset: self.current_position as usize,
                generation: id.generation(),
            },
        );

        let mut body = format!("{} {} obj\n", id.number(), id.generation()).into_bytes();
        write_value(&mut body, object);
        body.extend_from_slice(b"\nendobj\n");
        self.write_bytes(&body)
    }

    fn write_object_stream(&mut self, container: u32, objects: &[Rc<IndirectObject>]) -> Result<()> {
        let mut builder = ObjectStreamBuilder::new();
        for object in objects {
            let index = builder.add(object.id(), object.value())?;
            self.entries.insert(
                object.id().number(),
                XRefEntry::Compressed { container, index },
            );
        }
        debug!(container, count = builder.len(), "Writing object stream");

        let stream = builder.build(self.config.compression)?;
        self.write_object(ObjectId::new(container, 0), &Object::Stream(stream))
    }

    fn write_xref_stream(&mut self, id: ObjectId, trailer: &Dictionary) -> Result<()> {
        let mut xref = XRefStreamWriter::new(id);
        for (number, entry) in &self.entries {
            xref.add_entry(*number, *entry);
        }
        // The stream's own row points at the offset it is about to be written at
        xref.add_in_use_entry(id, self.current_position);
        xref.set_trailer_info(trailer);
        debug!(entries = xref.entry_count(), %id, "Writing cross-reference stream");

        let stream = xref.build(self.config.compression)?;
        self.write_object(id, &Object::Stream(stream))
    }

    /// Re-encode a stream at the configured level, or copy it untouched
    /// when its payload cannot be decoded
    fn prepare_stream(&self, id: ObjectId, stream: &Stream, encrypted: bool) -> Result<Stream> {
        if encrypted {
            return Ok(stream.clone());
        }
        let decoded = match stream.decoded_data() {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(%id, error = %e, "Copying stream with its original filters");
                return Ok(stream.clone());
            }
        };

        let mut dict = stream.dict().clone();
        dict.remove("Filter");
        dict.remove("DecodeParms");

        let level = self.config.compression;
        if level.is_compressed() {
            let data = compression::compress(&decoded, level)?;
            dict.set("Filter", Object::name("FlateDecode"));
            Ok(Stream::new(dict, data))
        } else {
            Ok(Stream::new(dict, decoded))
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }
}

impl PdfWriter<BufWriter<File>> {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::create(path, WriterConfig::default())
    }

    pub fn create(path: impl AsRef<Path>, config: WriterConfig) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_config(BufWriter::new(file), config))
    }
}
