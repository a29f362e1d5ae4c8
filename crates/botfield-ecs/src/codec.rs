//! Binary wire primitives shared by snapshots and deltas.
//!
//! Every component field is one of a small set of [`FieldType`]s. Values
//! travel as [`FieldValue`]s and are written little-endian by [`WireWriter`]
//! and read back by [`WireReader`]. Strings are length-prefixed with a single
//! byte, so they are limited to 255 bytes of UTF-8; writing a longer one is
//! an error, never a silent truncation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Longest string (in UTF-8 bytes) a [`FieldValue::Str`] may carry.
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

// ---------------------------------------------------------------------------
// WireError
// ---------------------------------------------------------------------------

/// Errors produced while encoding or decoding wire buffers, or applying them
/// to a replica.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    /// The buffer ended before a complete value could be read.
    #[error("buffer truncated: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    /// The buffer does not start with the expected magic bytes.
    #[error("bad magic bytes {found:?}")]
    BadMagic { found: [u8; 4] },

    /// The buffer was written by an incompatible format version.
    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u8),

    /// A snapshot was handed to the delta decoder or vice versa.
    #[error("expected a {expected} buffer, found kind tag {found}")]
    UnexpectedKind { expected: &'static str, found: u8 },

    /// A field type tag outside the known set.
    #[error("unknown field type tag {0}")]
    UnknownFieldType(u8),

    /// A delta operation tag outside the known set.
    #[error("unknown delta op tag {0}")]
    UnknownOp(u8),

    /// A string longer than [`MAX_STRING_LEN`] bytes.
    #[error("string of {len} bytes exceeds the {MAX_STRING_LEN}-byte limit")]
    StringTooLong { len: usize },

    /// A count does not fit its length prefix.
    #[error("{count} {what} exceed the wire limit of {max}")]
    CountOverflow {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// String bytes were not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// Bytes remained after the final record.
    #[error("{0} trailing bytes after final record")]
    TrailingBytes(usize),

    /// A record referenced a component outside the buffer's schema table.
    #[error("component index {index} out of range (schema has {len} entries)")]
    SchemaIndex { index: u16, len: usize },

    /// A field value did not match its declared type.
    #[error("field '{field}' of component '{component}' expected {expected:?}")]
    FieldType {
        component: String,
        field: String,
        expected: FieldType,
    },

    /// A component arrived with a different number of fields than expected.
    #[error("component '{component}' has {found} fields, expected {expected}")]
    FieldCount {
        component: String,
        expected: usize,
        found: usize,
    },

    /// A delta referenced an entity the reader never saw in a snapshot or
    /// earlier delta. The reader has missed a snapshot.
    #[error("delta references unknown entity {0}")]
    UnknownEntity(EntityId),

    /// A delta wrote or detached a component the reader does not hold.
    #[error("delta touches component '{component}' not attached to {entity} on the reader")]
    NotAttached { entity: EntityId, component: String },

    /// A delta arrived before any snapshot established a baseline.
    #[error("delta applied before any snapshot")]
    NoBaseline,
}

/// Convert a length to the integer type of its prefix.
pub fn count<T>(what: &'static str, n: usize) -> Result<T, WireError>
where
    T: TryFrom<usize> + Bounded,
{
    T::try_from(n).map_err(|_| WireError::CountOverflow {
        what,
        count: n,
        max: T::MAX_COUNT,
    })
}

/// Unsigned prefix types used for counts.
pub trait Bounded {
    const MAX_COUNT: usize;
}

impl Bounded for u8 {
    const MAX_COUNT: usize = u8::MAX as usize;
}

impl Bounded for u16 {
    const MAX_COUNT: usize = u16::MAX as usize;
}

impl Bounded for u32 {
    const MAX_COUNT: usize = u32::MAX as usize;
}

/// Reject strings that would not survive the wire unchanged.
pub fn check_str(s: &str) -> Result<(), WireError> {
    if s.len() > MAX_STRING_LEN {
        Err(WireError::StringTooLong { len: s.len() })
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FieldType / FieldDef
// ---------------------------------------------------------------------------

/// The scalar types a component field may have on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldType {
    I8 = 0,
    I16 = 1,
    I32 = 2,
    U8 = 3,
    U16 = 4,
    U32 = 5,
    F32 = 6,
    F64 = 7,
    /// Short UTF-8 string, at most [`MAX_STRING_LEN`] bytes.
    Str = 8,
    /// Reference to another entity.
    Entity = 9,
}

impl FieldType {
    /// Wire tag for this type.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, WireError> {
        Ok(match tag {
            0 => Self::I8,
            1 => Self::I16,
            2 => Self::I32,
            3 => Self::U8,
            4 => Self::U16,
            5 => Self::U32,
            6 => Self::F32,
            7 => Self::F64,
            8 => Self::Str,
            9 => Self::Entity,
            other => return Err(WireError::UnknownFieldType(other)),
        })
    }
}

/// Static description of one component field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
}

/// Owned field description, as carried in a buffer's schema table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub ty: FieldType,
}

impl From<&FieldDef> for FieldSchema {
    fn from(def: &FieldDef) -> Self {
        Self {
            name: def.name.to_owned(),
            ty: def.ty,
        }
    }
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A single typed field value.
///
/// Equality compares floats by bit pattern, so `decode(encode(v)) == v` holds
/// for every value including NaN payloads and signed zeros.
#[derive(Clone, Serialize, Deserialize)]
pub enum FieldValue {
    I8(i8),
    I16(i16),
    I32(i32),
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
    F64(f64),
    Str(String),
    Entity(EntityId),
}

impl FieldValue {
    /// The [`FieldType`] this value encodes as.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::I8(_) => FieldType::I8,
            Self::I16(_) => FieldType::I16,
            Self::I32(_) => FieldType::I32,
            Self::U8(_) => FieldType::U8,
            Self::U16(_) => FieldType::U16,
            Self::U32(_) => FieldType::U32,
            Self::F32(_) => FieldType::F32,
            Self::F64(_) => FieldType::F64,
            Self::Str(_) => FieldType::Str,
            Self::Entity(_) => FieldType::Entity,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::U8(a), Self::U8(b)) => a == b,
            (Self::U16(a), Self::U16(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Entity(a), Self::Entity(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(v) => write!(f, "{v}i8"),
            Self::I16(v) => write!(f, "{v}i16"),
            Self::I32(v) => write!(f, "{v}i32"),
            Self::U8(v) => write!(f, "{v}u8"),
            Self::U16(v) => write!(f, "{v}u16"),
            Self::U32(v) => write!(f, "{v}u32"),
            Self::F32(v) => write!(f, "{v}f32"),
            Self::F64(v) => write!(f, "{v}f64"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Entity(v) => write!(f, "{v:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// WireField -- Rust field types that map onto FieldType
// ---------------------------------------------------------------------------

/// A Rust type usable as a component field.
pub trait WireField: Sized {
    /// The wire type of this field.
    const TYPE: FieldType;
    /// Convert to a [`FieldValue`].
    fn to_value(&self) -> FieldValue;
    /// Convert back; `None` if the value has a different type.
    fn from_value(value: &FieldValue) -> Option<Self>;
}

macro_rules! impl_wire_field {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl WireField for $ty {
                const TYPE: FieldType = FieldType::$variant;

                fn to_value(&self) -> FieldValue {
                    FieldValue::$variant(self.clone())
                }

                fn from_value(value: &FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_wire_field! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    f32 => F32,
    f64 => F64,
    String => Str,
    EntityId => Entity,
}

// ---------------------------------------------------------------------------
// WireWriter
// ---------------------------------------------------------------------------

/// Little-endian byte sink.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a length-prefixed string.
    ///
    /// # Errors
    ///
    /// [`WireError::StringTooLong`] if `s` exceeds [`MAX_STRING_LEN`] bytes.
    /// Nothing is written in that case.
    pub fn str(&mut self, s: &str) -> Result<(), WireError> {
        check_str(s)?;
        self.u8(s.len() as u8);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Write a field value without a type tag (the schema carries the type).
    pub fn value(&mut self, value: &FieldValue) -> Result<(), WireError> {
        match value {
            FieldValue::I8(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I16(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U8(v) => self.u8(*v),
            FieldValue::U16(v) => self.u16(*v),
            FieldValue::U32(v) => self.u32(*v),
            FieldValue::F32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            FieldValue::F64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Str(v) => self.str(v)?,
            FieldValue::Entity(v) => self.u64(v.to_raw()),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// WireReader
// ---------------------------------------------------------------------------

/// Cursor over a byte slice that reads what [`WireWriter`] wrote.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let slice = self.slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn slice(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let remaining = self.buf.len() - self.offset;
        if remaining < len {
            return Err(WireError::Truncated {
                offset: self.offset,
                needed: len - remaining,
            });
        }
        let out = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    pub fn u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub fn u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        self.take()
    }

    pub fn str(&mut self) -> Result<String, WireError> {
        let len = self.u8()? as usize;
        let bytes = self.slice(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidUtf8)
    }

    /// Read a value of the given type.
    pub fn value(&mut self, ty: FieldType) -> Result<FieldValue, WireError> {
        Ok(match ty {
            FieldType::I8 => FieldValue::I8(i8::from_le_bytes(self.take()?)),
            FieldType::I16 => FieldValue::I16(i16::from_le_bytes(self.take()?)),
            FieldType::I32 => FieldValue::I32(i32::from_le_bytes(self.take()?)),
            FieldType::U8 => FieldValue::U8(self.u8()?),
            FieldType::U16 => FieldValue::U16(self.u16()?),
            FieldType::U32 => FieldValue::U32(self.u32()?),
            FieldType::F32 => FieldValue::F32(f32::from_le_bytes(self.take()?)),
            FieldType::F64 => FieldValue::F64(f64::from_le_bytes(self.take()?)),
            FieldType::Str => FieldValue::Str(self.str()?),
            FieldType::Entity => FieldValue::Entity(EntityId::from_raw(self.u64()?)),
        })
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Fail if any bytes are left unread.
    pub fn expect_end(&self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
