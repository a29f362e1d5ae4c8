//! Full-state snapshot buffers.
//!
//! A snapshot carries every entity that holds at least one component of a
//! caller-chosen set, together with the complete field values of those
//! components. Every buffer (snapshot or delta) starts with the same header
//! and a self-describing schema table, so a reader needs no knowledge of the
//! writer's Rust types:
//!
//! ```text
//! header   : magic "BOTF" | version u8 | kind u8 | tick u64
//! schema   : count u16 | { name str | field_count u8 | { name str | type u8 }* }*
//! snapshot : entity_count u32 | { entity u64 | count u16 | { schema u16 | values }* }*
//! ```
//!
//! Multi-byte integers are little-endian; see [`crate::codec`].

use std::collections::BTreeMap;

use crate::codec::{count, FieldSchema, FieldValue, WireError, WireReader, WireWriter};
use crate::component::{ComponentInfo, ComponentTypeId};
use crate::entity::EntityId;
use crate::world::World;

/// Leading bytes of every buffer.
pub const MAGIC: [u8; 4] = *b"BOTF";

/// Current wire format version.
pub const WIRE_VERSION: u8 = 1;

/// Component values of one entity on the reader side, keyed by component
/// name.
pub type EntityFields = BTreeMap<String, Vec<FieldValue>>;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Which decoder a buffer is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BufferKind {
    Snapshot = 1,
    Delta = 2,
}

impl BufferKind {
    fn label(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Delta => "delta",
        }
    }
}

pub(crate) fn write_header(w: &mut WireWriter, kind: BufferKind, tick: u64) {
    w.bytes(&MAGIC);
    w.u8(WIRE_VERSION);
    w.u8(kind as u8);
    w.u64(tick);
}

/// Validate the header and return the tick it carries.
pub(crate) fn read_header(r: &mut WireReader<'_>, expected: BufferKind) -> Result<u64, WireError> {
    let magic = r.array::<4>()?;
    if magic != MAGIC {
        return Err(WireError::BadMagic { found: magic });
    }
    let version = r.u8()?;
    if version != WIRE_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let kind = r.u8()?;
    if kind != expected as u8 {
        return Err(WireError::UnexpectedKind {
            expected: expected.label(),
            found: kind,
        });
    }
    r.u64()
}

// ---------------------------------------------------------------------------
// Schema table
// ---------------------------------------------------------------------------

/// One entry of a buffer's schema table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

impl From<&ComponentInfo> for ComponentSchema {
    fn from(info: &ComponentInfo) -> Self {
        Self {
            name: info.name.to_owned(),
            fields: info.fields.iter().map(FieldSchema::from).collect(),
        }
    }
}

/// Drop repeated ids and ids the world does not know, keeping first-seen
/// order.
pub(crate) fn normalize(world: &World, components: &[ComponentTypeId]) -> Vec<ComponentTypeId> {
    let mut out: Vec<ComponentTypeId> = Vec::with_capacity(components.len());
    for &id in components {
        if world.component_info(id).is_some() && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

pub(crate) fn schema_table(world: &World, components: &[ComponentTypeId]) -> Vec<ComponentSchema> {
    components
        .iter()
        .filter_map(|&id| world.component_info(id))
        .map(ComponentSchema::from)
        .collect()
}

pub(crate) fn write_schema(w: &mut WireWriter, schemas: &[ComponentSchema]) -> Result<(), WireError> {
    w.u16(count("components", schemas.len())?);
    for schema in schemas {
        w.str(&schema.name)?;
        w.u8(count("fields", schema.fields.len())?);
        for field in &schema.fields {
            w.str(&field.name)?;
            w.u8(field.ty.tag());
        }
    }
    Ok(())
}

pub(crate) fn read_schema(r: &mut WireReader<'_>) -> Result<Vec<ComponentSchema>, WireError> {
    let count = r.u16()?;
    let mut schemas = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = r.str()?;
        let field_count = r.u8()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let name = r.str()?;
            let ty = crate::codec::FieldType::from_tag(r.u8()?)?;
            fields.push(FieldSchema { name, ty });
        }
        schemas.push(ComponentSchema { name, fields });
    }
    Ok(schemas)
}

/// Resolve a schema index read from a record.
pub(crate) fn schema_at(schemas: &[ComponentSchema], index: u16) -> Result<&ComponentSchema, WireError> {
    schemas.get(index as usize).ok_or(WireError::SchemaIndex {
        index,
        len: schemas.len(),
    })
}

pub(crate) fn write_values(w: &mut WireWriter, values: &[FieldValue]) -> Result<(), WireError> {
    values.iter().try_for_each(|value| w.value(value))
}

pub(crate) fn read_values(r: &mut WireReader<'_>, schema: &ComponentSchema) -> Result<Vec<FieldValue>, WireError> {
    schema.fields.iter().map(|field| r.value(field.ty)).collect()
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Encode the complete state of `components` for every entity holding at
/// least one of them, in ascending entity index order.
///
/// # Errors
///
/// [`WireError::StringTooLong`] if a string field (or a component or field
/// name) exceeds the wire limit, and [`WireError::CountOverflow`] if a count
/// does not fit its prefix. Values are never truncated.
pub fn encode_snapshot(world: &World, components: &[ComponentTypeId], tick: u64) -> Result<Vec<u8>, WireError> {
    let components = normalize(world, components);
    let schemas = schema_table(world, &components);
    let entities = world.query_any(&components);

    let mut w = WireWriter::new();
    write_header(&mut w, BufferKind::Snapshot, tick);
    write_schema(&mut w, &schemas)?;
    w.u32(count("entities", entities.len())?);
    for entity in entities {
        // The schema count fit a u16, so every slot index does too.
        let held: Vec<(u16, Vec<FieldValue>)> = components
            .iter()
            .enumerate()
            .filter_map(|(slot, &id)| world.read_fields(entity, id).map(|values| (slot as u16, values)))
            .collect();
        w.u64(entity.to_raw());
        w.u16(count("components", held.len())?);
        for (slot, values) in held {
            w.u16(slot);
            write_values(&mut w, &values)?;
        }
    }
    Ok(w.finish())
}

/// A snapshot buffer decoded into plain maps.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSnapshot {
    pub tick: u64,
    pub schemas: Vec<ComponentSchema>,
    pub entities: BTreeMap<EntityId, EntityFields>,
}

/// Decode a buffer produced by [`encode_snapshot`].
pub fn decode_snapshot(buf: &[u8]) -> Result<DecodedSnapshot, WireError> {
    let mut r = WireReader::new(buf);
    let tick = read_header(&mut r, BufferKind::Snapshot)?;
    let schemas = read_schema(&mut r)?;
    let entity_count = r.u32()?;

    let mut entities = BTreeMap::new();
    for _ in 0..entity_count {
        let entity = EntityId::from_raw(r.u64()?);
        let count = r.u16()?;
        let mut fields = EntityFields::new();
        for _ in 0..count {
            let schema = schema_at(&schemas, r.u16()?)?;
            let values = read_values(&mut r, schema)?;
            fields.insert(schema.name.clone(), values);
        }
        entities.insert(entity, fields);
    }
    r.expect_end()?;

    Ok(DecodedSnapshot {
        tick,
        schemas,
        entities,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
