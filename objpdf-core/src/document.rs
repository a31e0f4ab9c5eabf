use crate::error::Result;
use crate::objects::{Dictionary, IndirectObject, Object, ObjectId, PdfDate, PdfString};
use crate::parser::xref::read_xref;
use crate::parser::{ObjectCache, ParseOptions, PdfVersion, ResolveMode, Trailer, XRefTable};
use crate::writer::{PdfWriter, WriterConfig};
use bytes::Bytes;
use std::io::{Read, Write};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

/// Longest reference chain [`Document::resolve`] follows
const MAX_REFERENCE_DEPTH: usize = 32;

/// A PDF document opened for reading, editing and rewriting.
///
/// Objects are parsed lazily the first time they are requested and kept for
/// the lifetime of the document.
///
/// # Example
///
/// ```rust,no_run
/// use objpdf::{Document, WriterConfig};
///
/// let mut doc = Document::load("input.pdf")?;
/// doc.set_title("Quarterly report")?;
/// doc.save_to_path("output.pdf", &WriterConfig::default())?;
/// # Ok::<(), objpdf::PdfError>(())
/// ```
#[derive(Debug)]
pub struct Document {
    version: PdfVersion,
    trailer: Trailer,
    objects: ObjectCache,
}

/// Entries of the document information dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<PdfDate>,
    pub modification_date: Option<PdfDate>,
}

impl Document {
    /// Read a whole document from `reader`
    pub fn open<R: Read>(reader: R) -> Result<Self> {
        Self::open_with_options(reader, ParseOptions::default())
    }

    pub fn open_with_options<R: Read>(mut reader: R, options: ParseOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(data, options)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    pub fn from_bytes_with_options(data: impl Into<Bytes>, options: ParseOptions) -> Result<Self> {
        let data = data.into();
        let version = PdfVersion::from_header(&data)?;
        let (xref, trailer) = read_xref(&data, &options)?;
        debug!(%version, entries = xref.len(), "Opened document");

        Ok(Self {
            version,
            trailer,
            objects: ObjectCache::new(data, xref, options),
        })
    }

    pub fn version(&self) -> PdfVersion {
        self.version
    }

    /// Trailer of the newest revision
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    /// Cross-reference entries merged over every revision
    pub fn xref_table(&self) -> &XRefTable {
        self.objects.xref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer.is_encrypted()
    }

    /// Look up an object; `None` when no live entry exists for `id`
    pub fn get_object(&mut self, id: ObjectId) -> Result<Option<Rc<IndirectObject>>> {
        Ok(self.objects.get(id)?)
    }

    /// Install or replace an object
    pub fn set_object(&mut self, object: IndirectObject) {
        self.objects.set(object);
    }

    /// Store `value` under the next free object number
    pub fn add_object(&mut self, value: impl Into<Object>) -> ObjectId {
        let id = self.objects.allocate_id();
        self.objects.set(IndirectObject::new(id, value));
        id
    }

    /// Follow references until a direct value is reached
    ///
    /// A dangling reference resolves to `None`.
    pub fn resolve(&mut self, object: &Object) -> Result<Option<Object>> {
        let mut current = object.clone();
        for _ in 0..MAX_REFERENCE_DEPTH {
            let Object::Reference(id) = current else {
                return Ok(Some(current));
            };
            match self.objects.get(id)? {
                Some(target) => current = target.value().clone(),
                None => return Ok(None),
            }
        }
        warn!(start = ?object, "Reference chain too deep, giving up");
        Ok(None)
    }

    /// The document catalog named by the trailer's `/Root`
    pub fn catalog(&mut self) -> Result<Option<Dictionary>> {
        let Some(root) = self.trailer.root() else {
            return Ok(None);
        };
        Ok(self
            .objects
            .get(root)?
            .and_then(|object| object.value().as_dict().cloned()))
    }

    /// Every live object, excluding object stream containers and
    /// cross-reference streams
    pub fn live_objects(&mut self) -> Result<Vec<Rc<IndirectObject>>> {
        let mut live = Vec::new();
        for id in self.objects.ids() {
            let Some(object) = self.objects.get_with(id, ResolveMode::AllowResolve, false)? else {
                continue;
            };
            let structural = match object.value() {
                Object::ObjectStream(_) => true,
                Object::Stream(stream) => stream.dict().get_name("Type") == Some("XRef"),
                _ => false,
            };
            if !structural {
                live.push(object);
            }
        }
        Ok(live)
    }

    pub fn object_count(&mut self) -> Result<usize> {
        Ok(self.live_objects()?.len())
    }

    /// Read the document information dictionary
    pub fn info(&mut self) -> Result<DocumentInfo> {
        let Some(dict) = self.info_dictionary()? else {
            return Ok(DocumentInfo::default());
        };

        Ok(DocumentInfo {
            title: self.text_entry(&dict, "Title")?,
            author: self.text_entry(&dict, "Author")?,
            subject: self.text_entry(&dict, "Subject")?,
            keywords: self.text_entry(&dict, "Keywords")?,
            creator: self.text_entry(&dict, "Creator")?,
            producer: self.text_entry(&dict, "Producer")?,
            creation_date: self.date_entry(&dict, "CreationDate")?,
            modification_date: self.date_entry(&dict, "ModDate")?,
        })
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.set_text("Title", title.into())
    }

    pub fn set_author(&mut self, author: impl Into<String>) -> Result<()> {
        self.set_text("Author", author.into())
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<()> {
        self.set_text("Subject", subject.into())
    }

    pub fn set_keywords(&mut self, keywords: impl Into<String>) -> Result<()> {
        self.set_text("Keywords", keywords.into())
    }

    pub fn set_creator(&mut self, creator: impl Into<String>) -> Result<()> {
        self.set_text("Creator", creator.into())
    }

    pub fn set_producer(&mut self, producer: impl Into<String>) -> Result<()> {
        self.set_text("Producer", producer.into())
    }

    pub fn set_creation_date(&mut self, date: impl Into<PdfDate>) -> Result<()> {
        self.set_info_field("CreationDate", Some(Object::Date(date.into())))
    }

    pub fn set_modification_date(&mut self, date: impl Into<PdfDate>) -> Result<()> {
        self.set_info_field("ModDate", Some(Object::Date(date.into())))
    }

    /// Set the modification date to now
    pub fn update_modification_date(&mut self) -> Result<()> {
        self.set_modification_date(PdfDate::now())
    }

    /// Set or, with `None`, remove one entry of the information dictionary
    ///
    /// A document without `/Info` gets a new indirect dictionary; a direct
    /// `/Info` dictionary in the trailer is edited in place.
    pub fn set_info_field(&mut self, key: &str, value: Option<Object>) -> Result<()> {
        let value = value.unwrap_or(Object::Null);

        match self.trailer.info().cloned() {
            Some(Object::Reference(id)) => {
                let mut dict = match self.objects.get(id)? {
                    Some(object) => match object.value().as_dict() {
                        Some(dict) => dict.clone(),
                        None => {
                            warn!(%id, found = object.value().type_name(), "Info is not a dictionary, replacing it");
                            Dictionary::new()
                        }
                    },
                    None => Dictionary::new(),
                };
                dict.set(key, value);
                self.objects.set(IndirectObject::new(id, dict));
            }
            Some(Object::Dictionary(mut dict)) => {
                dict.set(key, value);
                self.trailer.dict_mut().set("Info", dict);
            }
            _ => {
                let mut dict = Dictionary::new();
                dict.set(key, value);
                let id = self.add_object(dict);
                debug!(%id, "Created information dictionary");
                self.trailer.dict_mut().set("Info", id);
            }
        }
        Ok(())
    }

    /// Write the document to `writer` as a single revision
    pub fn save<W: Write>(&mut self, writer: W, config: &WriterConfig) -> Result<()> {
        PdfWriter::with_config(writer, config.clone()).write_document(self)
    }

    pub fn save_to_path(&mut self, path: impl AsRef<Path>, config: &WriterConfig) -> Result<()> {
        PdfWriter::create(path, config.clone())?.write_document(self)
    }

    pub fn to_bytes(&mut self, config: &WriterConfig) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.save(&mut buffer, config)?;
        Ok(buffer)
    }

    fn info_dictionary(&mut self) -> Result<Option<Dictionary>> {
        let Some(info) = self.trailer.info().cloned() else {
            return Ok(None);
        };
        Ok(match self.resolve(&info)? {
            Some(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        })
    }

    fn set_text(&mut self, key: &str, text: String) -> Result<()> {
        self.set_info_field(key, Some(Object::String(PdfString::from_text(&text))))
    }

    fn text_entry(&mut self, dict: &Dictionary, key: &str) -> Result<Option<String>> {
        let Some(value) = dict.get(key) else {
            return Ok(None);
        };
        Ok(match self.resolve(value)? {
            Some(Object::String(s)) => Some(s.text()),
            Some(Object::Date(date)) => Some(date.to_pdf_string()),
            Some(Object::Name(name)) => Some(name),
            _ => None,
        })
    }

    fn date_entry(&mut self, dict: &Dictionary, key: &str) -> Result<Option<PdfDate>> {
        let Some(value) = dict.get(key) else {
            return Ok(None);
        };
        Ok(match self.resolve(value)? {
            Some(Object::Date(date)) => Some(date),
            Some(Object::String(s)) => PdfDate::parse(&s.text()),
            _ => None,
        })
    }
}
