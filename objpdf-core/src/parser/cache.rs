//! Lazy object resolution
//!
//! Objects are parsed on first access from the location the cross-reference
//! table gives, and memoized. Objects packed in an object stream are
//! reached through their container, which is itself fetched in
//! [`ResolveMode::NoResolve`] so that resolving the container can never
//! recurse back into the container.

use super::byte_reader::ByteReader;
use super::lexer::Lexer;
use super::object_parser::{Parser, ReferenceResolver};
use super::xref::{XRefEntry, XRefTable};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{IndirectObject, Object, ObjectId};
use bytes::Bytes;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// Whether references met during a parse may go back through the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    AllowResolve,
    /// Only plain indirect entries are read, directly from the file
    NoResolve,
}

/// Object store backed by the file bytes and the merged xref table
#[derive(Debug)]
pub struct ObjectCache {
    data: Bytes,
    xref: XRefTable,
    objects: HashMap<ObjectId, Rc<IndirectObject>>,
    options: ParseOptions,
}

impl ObjectCache {
    pub fn new(data: Bytes, xref: XRefTable, options: ParseOptions) -> Self {
        Self {
            data,
            xref,
            objects: HashMap::new(),
            options,
        }
    }

    pub fn xref(&self) -> &XRefTable {
        &self.xref
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Resolve and memoize `id`; `None` when the table does not know it
    pub fn get(&mut self, id: ObjectId) -> ParseResult<Option<Rc<IndirectObject>>> {
        self.get_with(id, ResolveMode::AllowResolve, true)
    }

    pub fn get_with(
        &mut self,
        id: ObjectId,
        mode: ResolveMode,
        cache: bool,
    ) -> ParseResult<Option<Rc<IndirectObject>>> {
        if let Some(object) = self.objects.get(&id) {
            return Ok(Some(Rc::clone(object)));
        }

        let Some(entry) = self.xref.get(id.number()).copied() else {
            return Ok(None);
        };

        let object = match entry {
            XRefEntry::Free { .. } => return Ok(None),
            XRefEntry::Indirect { generation, .. } if generation != id.generation() => {
                return Ok(None)
            }
            // Placeholder registered by `set` whose object is gone
            XRefEntry::Indirect { offset: 0, .. } => return Ok(None),
            XRefEntry::Indirect { offset, .. } => self.parse_at(id, offset, mode)?,
            XRefEntry::Compressed { .. } if id.generation() != 0 => return Ok(None),
            XRefEntry::Compressed { container, index } => self.unpack(id, container, index)?,
        };

        let object = Rc::new(object);
        if cache {
            self.objects.insert(id, Rc::clone(&object));
        }
        Ok(Some(object))
    }

    /// Install or replace an object
    ///
    /// An id the table does not know gets an indirect entry with a
    /// placeholder offset; the writer assigns real offsets.
    pub fn set(&mut self, object: IndirectObject) {
        let id = object.id();
        let known = self
            .xref
            .get(id.number())
            .is_some_and(|entry| entry.is_in_use() && entry.generation() == id.generation());
        if !known {
            self.xref.set(
                id.number(),
                XRefEntry::Indirect {
                    offset: 0,
                    generation: id.generation(),
                },
            );
        }
        self.objects.insert(id, Rc::new(object));
    }

    /// Next unused object number, generation 0
    pub fn allocate_id(&self) -> ObjectId {
        let cached = self.objects.keys().map(ObjectId::number).max().unwrap_or(0);
        ObjectId::new(self.xref.max_object_number().max(cached) + 1, 0)
    }

    /// Every in-use id of the table, in object-number order
    pub fn ids(&self) -> Vec<ObjectId> {
        self.xref
            .iter()
            .filter_map(|(number, entry)| match entry {
                XRefEntry::Indirect { generation, .. } => Some(ObjectId::new(*number, *generation)),
                XRefEntry::Compressed { .. } => Some(ObjectId::new(*number, 0)),
                XRefEntry::Free { .. } => None,
            })
            .collect()
    }

    pub fn is_cached(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    fn parse_at(&mut self, id: ObjectId, offset: usize, mode: ResolveMode) -> ParseResult<IndirectObject> {
        let lexer = Lexer::new(ByteReader::at(self.data.clone(), offset)?);
        let object = match mode {
            ResolveMode::AllowResolve => Parser::new(lexer).with_resolver(self).parse_indirect()?,
            ResolveMode::NoResolve => {
                let mut direct = DirectResolver {
                    data: &self.data,
                    xref: &self.xref,
                };
                Parser::new(lexer).with_resolver(&mut direct).parse_indirect()?
            }
        };
        self.check_identity(id, object)
    }

    fn unpack(&mut self, id: ObjectId, container: u32, index: u32) -> ParseResult<IndirectObject> {
        let container_id = ObjectId::new(container, 0);
        let position = match self.xref.get(container) {
            Some(XRefEntry::Indirect { offset, .. }) => *offset,
            other => {
                return Err(ParseError::ObjectResolution {
                    id,
                    position: 0,
                    message: format!(
                        "container {container} must be stored directly, its entry is {other:?}"
                    ),
                })
            }
        };

        // A NoResolve parse of a container equals an AllowResolve one, since
        // only its /Length can hold a reference, so it is kept with its header
        let holder = self
            .get_with(container_id, ResolveMode::NoResolve, true)?
            .ok_or_else(|| ParseError::ObjectResolution {
                id,
                position,
                message: format!("container {container_id} cannot be read"),
            })?;
        let Object::ObjectStream(objects) = holder.value() else {
            return Err(ParseError::ObjectResolution {
                id,
                position,
                message: format!(
                    "container {container_id} is a {}, not an object stream",
                    holder.value().type_name()
                ),
            });
        };

        debug!(%id, container, index, "Unpacking object from object stream");
        let object = objects
            .object_at(index as usize)?
            .ok_or_else(|| ParseError::ObjectResolution {
                id,
                position,
                message: format!("index {index} is out of range for container {container_id}"),
            })?;
        self.check_identity(id, object)
    }

    fn check_identity(&self, requested: ObjectId, object: IndirectObject) -> ParseResult<IndirectObject> {
        if object.id() == requested {
            return Ok(object);
        }
        if self.options.strict_object_ids {
            return Err(ParseError::ObjectIdentityMismatch {
                expected: requested,
                found: object.id(),
            });
        }
        warn!(expected = %requested, found = %object.id(), "Object identity mismatch, using the requested id");
        Ok(IndirectObject::new(requested, object.into_value()))
    }
}

impl ReferenceResolver for ObjectCache {
    // Length objects are plain integers, so nothing they contain needs resolving
    fn resolve_integer(&mut self, id: ObjectId) -> ParseResult<Option<i64>> {
        Ok(self
            .get_with(id, ResolveMode::NoResolve, true)?
            .and_then(|object| object.value().as_integer()))
    }
}

/// Reads integers stored at plain indirect entries, bypassing the cache
struct DirectResolver<'a> {
    data: &'a Bytes,
    xref: &'a XRefTable,
}

impl ReferenceResolver for DirectResolver<'_> {
    fn resolve_integer(&mut self, id: ObjectId) -> ParseResult<Option<i64>> {
        let offset = match self.xref.get(id.number()) {
            Some(XRefEntry::Indirect { offset, generation })
                if *offset > 0 && *generation == id.generation() =>
            {
                *offset
            }
            _ => return Ok(None),
        };
        let lexer = Lexer::new(ByteReader::at(self.data.clone(), offset)?);
        let object = Parser::new(lexer).parse_indirect()?;
        Ok(object.value().as_integer())
    }
}
