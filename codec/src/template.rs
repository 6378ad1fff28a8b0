//! Message templates describing the layout of a bit-packed message.
//!
//! A [MessageTemplate] is an ordered tree of field descriptors stored in a flat arena: every
//! field lives in a single `Vec` and both the top-level fields and the children of a struct
//! field are referenced by [FieldId]. Once built, a template is never mutated by a reader, so a
//! single template can be shared (by reference or behind an `Arc`) by any number of
//! [crate::Deserializer]s, each keeping its own traversal state in a [crate::Walker].
//!
//! # Example
//!
//! ```
//! use bitwire_codec::{Count, DataType, MessageTemplate};
//!
//! let mut template = MessageTemplate::new(7, "Move");
//! template.add_field(None, "entity", DataType::U32, Count::Fixed(1)).unwrap();
//! let waypoints = template.add_struct(None, "waypoints", Count::Dynamic { bits: 8 }).unwrap();
//! template.add_field(Some(waypoints), "x", DataType::F32, Count::Fixed(1)).unwrap();
//! template.add_field(Some(waypoints), "y", DataType::F32, Count::Fixed(1)).unwrap();
//! template.add_field(None, "name", DataType::S8, Count::Dynamic { bits: 8 }).unwrap();
//!
//! assert_eq!(template.roots().len(), 3);
//! assert_eq!(template.children(Some(waypoints)).len(), 2);
//! ```

use crate::Error;
use std::{fmt, str::FromStr};

/// Primitive type tag carried by both template fields and typed reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// A single bit, read as `bool`.
    Bit,
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
    /// IEEE-754 single precision.
    F32,
    /// IEEE-754 double precision.
    F64,
}

impl DataType {
    /// Returns the number of bits a value of this type occupies on the wire.
    pub const fn bits(self) -> usize {
        match self {
            Self::Bit => 1,
            Self::U8 | Self::S8 => 8,
            Self::U16 | Self::S16 => 16,
            Self::U32 | Self::S32 | Self::F32 => 32,
            Self::U64 | Self::S64 | Self::F64 => 64,
        }
    }

    /// Returns the name used for this type in message descriptions.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bit => "bit",
            Self::U8 => "u8",
            Self::S8 => "s8",
            Self::U16 => "u16",
            Self::S16 => "s16",
            Self::U32 => "u32",
            Self::S32 => "s32",
            Self::U64 => "u64",
            Self::S64 => "s64",
            Self::F32 => "float",
            Self::F64 => "double",
        }
    }

    /// Returns true if a string can be stored in a field of this type.
    pub const fn is_char(self) -> bool {
        matches!(self, Self::U8 | Self::S8)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "bit" => Self::Bit,
            "u8" => Self::U8,
            "s8" => Self::S8,
            "u16" => Self::U16,
            "s16" => Self::S16,
            "u32" => Self::U32,
            "s32" => Self::S32,
            "u64" => Self::U64,
            "s64" => Self::S64,
            "float" => Self::F32,
            "double" => Self::F64,
            _ => return Err(Error::InvalidTemplate(format!("unknown type: {s}"))),
        };
        Ok(ty)
    }
}

/// Number of repetitions of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Count {
    /// The field repeats a fixed number of times.
    Fixed(u32),
    /// The number of repetitions is read from the stream as a `bits`-wide prefix.
    Dynamic { bits: u32 },
}

/// Kind of a template field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A field holding values of a primitive type.
    Basic(DataType),
    /// A field grouping child fields.
    Struct,
}

/// Index of a field within its [MessageTemplate].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(usize);

impl FieldId {
    /// Returns the index of the field in its template's arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for FieldId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Descriptor of a single template field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDesc {
    name: String,
    kind: FieldKind,
    count: Count,
    children: Vec<FieldId>,
}

impl FieldDesc {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn count(&self) -> Count {
        self.count
    }

    /// Returns the primitive type of a basic field, or `None` for a struct.
    pub fn data_type(&self) -> Option<DataType> {
        match self.kind {
            FieldKind::Basic(ty) => Some(ty),
            FieldKind::Struct => None,
        }
    }

    /// Returns true if the repetition count of this field is read from the stream.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.count, Count::Dynamic { .. })
    }

    /// Returns the children of a struct field (empty for basic fields).
    pub fn children(&self) -> &[FieldId] {
        &self.children
    }
}

/// Description of a message: its metadata and the ordered fields it is made of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageTemplate {
    id: u32,
    name: String,
    reliable: bool,
    in_order: bool,
    priority: u32,
    fields: Vec<FieldDesc>,
    roots: Vec<FieldId>,
}

impl MessageTemplate {
    /// Creates an empty template for the message with the given `id` and `name`.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            reliable: false,
            in_order: false,
            priority: 0,
            fields: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Marks the message as requiring reliable delivery.
    pub fn with_reliable(mut self, reliable: bool) -> Self {
        self.reliable = reliable;
        self
    }

    /// Marks the message as requiring in-order delivery.
    pub fn with_in_order(mut self, in_order: bool) -> Self {
        self.in_order = in_order;
        self
    }

    /// Sets the send priority of the message.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reliable(&self) -> bool {
        self.reliable
    }

    pub fn in_order(&self) -> bool {
        self.in_order
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Appends a basic field holding values of type `ty` to `parent` (or to the top level).
    pub fn add_field(
        &mut self,
        parent: Option<FieldId>,
        name: impl Into<String>,
        ty: DataType,
        count: Count,
    ) -> Result<FieldId, Error> {
        self.insert(parent, name.into(), FieldKind::Basic(ty), count)
    }

    /// Appends a struct field to `parent` (or to the top level).
    ///
    /// Children are added by passing the returned [FieldId] as `parent`.
    pub fn add_struct(
        &mut self,
        parent: Option<FieldId>,
        name: impl Into<String>,
        count: Count,
    ) -> Result<FieldId, Error> {
        self.insert(parent, name.into(), FieldKind::Struct, count)
    }

    fn insert(
        &mut self,
        parent: Option<FieldId>,
        name: String,
        kind: FieldKind,
        count: Count,
    ) -> Result<FieldId, Error> {
        if let Count::Dynamic { bits } = count {
            if bits == 0 || bits > u32::BITS {
                return Err(Error::InvalidTemplate(format!(
                    "count width of {name} must be in [1, 32]: {bits}"
                )));
            }
        }
        if let Some(parent) = parent {
            match self.fields.get(parent.0) {
                Some(desc) if desc.kind == FieldKind::Struct => {}
                Some(desc) => {
                    return Err(Error::InvalidTemplate(format!(
                        "parent of {name} is not a struct: {}",
                        desc.name
                    )))
                }
                None => {
                    return Err(Error::InvalidTemplate(format!(
                        "parent of {name} does not exist: {}",
                        parent.0
                    )))
                }
            }
        }

        let id = FieldId(self.fields.len());
        self.fields.push(FieldDesc {
            name,
            kind,
            count,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.fields[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Returns the descriptor of a field, or `None` if `id` does not belong to this template.
    pub fn field(&self, id: FieldId) -> Option<&FieldDesc> {
        self.fields.get(id.0)
    }

    /// Returns the top-level fields in order.
    pub fn roots(&self) -> &[FieldId] {
        &self.roots
    }

    /// Returns the children of `parent`, or the top-level fields if `parent` is `None`.
    pub fn children(&self, parent: Option<FieldId>) -> &[FieldId] {
        match parent {
            Some(parent) => self
                .fields
                .get(parent.0)
                .map(|desc| desc.children.as_slice())
                .unwrap_or(&[]),
            None => &self.roots,
        }
    }

    /// Returns the first field (in insertion order) with the given name.
    pub fn find(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|desc| desc.name == name)
            .map(FieldId)
    }

    /// Returns the total number of fields, at any depth.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the template has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the descriptor of a field created by this template.
    pub(crate) fn desc(&self, id: FieldId) -> &FieldDesc {
        &self.fields[id.0]
    }
}
