//! Component types, registration and column storage.
//!
//! Every component type used in the ECS implements [`Component`] and must be
//! registered in a [`ComponentRegistry`] before use. Registration produces a
//! [`ComponentTypeId`] that keys the component's [`Column`] and is used for
//! query matching.
//!
//! Tag components are components with no fields; they share the same storage
//! and interface as data components. The [`data_component!`] and
//! [`tag_component!`](crate::tag_component) macros declare both kinds.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::codec::{FieldDef, FieldValue};
use crate::EcsError;

// ---------------------------------------------------------------------------
// Component trait
// ---------------------------------------------------------------------------

/// A named, independently attachable per-entity attribute.
///
/// `to_fields` and `from_fields` convert between the typed struct and the
/// dynamic [`FieldValue`] form used by the uniform store interface and the
/// wire codec. The field order always matches [`FIELDS`](Self::FIELDS).
pub trait Component: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Registered name, stable across runs and used on the wire.
    const NAME: &'static str;
    /// Field layout. Empty for tag components.
    const FIELDS: &'static [FieldDef];

    /// Convert to dynamic field values.
    fn to_fields(&self) -> Vec<FieldValue>;

    /// Rebuild from dynamic field values.
    fn from_fields(fields: &[FieldValue]) -> Result<Self, EcsError>;

    /// Whether this is a tag (field-less) component.
    fn is_tag() -> bool {
        Self::FIELDS.is_empty()
    }
}

/// Declare a data component: a struct with public wire-typed fields.
///
/// ```
/// botfield_ecs::data_component! {
///     /// Hit points.
///     pub struct Health("health") { current: u16, max: u16 }
/// }
/// ```
#[macro_export]
macro_rules! data_component {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident ($label:literal) {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )*
        }

        impl $crate::component::Component for $name {
            const NAME: &'static str = $label;
            const FIELDS: &'static [$crate::codec::FieldDef] = &[
                $( $crate::codec::FieldDef {
                    name: stringify!($field),
                    ty: <$ty as $crate::codec::WireField>::TYPE,
                }, )*
            ];

            fn to_fields(&self) -> ::std::vec::Vec<$crate::codec::FieldValue> {
                ::std::vec![ $( $crate::codec::WireField::to_value(&self.$field) ),* ]
            }

            fn from_fields(
                fields: &[$crate::codec::FieldValue],
            ) -> ::std::result::Result<Self, $crate::EcsError> {
                if fields.len() != <Self as $crate::component::Component>::FIELDS.len() {
                    return Err($crate::EcsError::FieldMismatch {
                        component: $label,
                        details: format!(
                            "expected {} fields, got {}",
                            <Self as $crate::component::Component>::FIELDS.len(),
                            fields.len()
                        ),
                    });
                }
                let mut iter = fields.iter();
                Ok(Self {
                    $( $field: {
                        let value = iter.next().ok_or_else(|| $crate::EcsError::FieldMismatch {
                            component: $label,
                            details: format!("missing field '{}'", stringify!($field)),
                        })?;
                        <$ty as $crate::codec::WireField>::from_value(value).ok_or_else(|| {
                            $crate::EcsError::FieldMismatch {
                                component: $label,
                                details: format!(
                                    "field '{}' expected {:?}, got {:?}",
                                    stringify!($field),
                                    <$ty as $crate::codec::WireField>::TYPE,
                                    value
                                ),
                            }
                        })?
                    }, )*
                })
            }
        }
    };
}

/// Declare a tag component: a unit struct with no fields.
#[macro_export]
macro_rules! tag_component {
    ( $(#[$meta:meta])* $vis:vis struct $name:ident ($label:literal); ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $name;

        impl $crate::component::Component for $name {
            const NAME: &'static str = $label;
            const FIELDS: &'static [$crate::codec::FieldDef] = &[];

            fn to_fields(&self) -> ::std::vec::Vec<$crate::codec::FieldValue> {
                ::std::vec::Vec::new()
            }

            fn from_fields(
                fields: &[$crate::codec::FieldValue],
            ) -> ::std::result::Result<Self, $crate::EcsError> {
                if fields.is_empty() {
                    Ok($name)
                } else {
                    Err($crate::EcsError::FieldMismatch {
                        component: $label,
                        details: format!("tag takes no fields, got {}", fields.len()),
                    })
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Opaque, lightweight identifier for a registered component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    /// Position of this component in registration order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Unique ID assigned at registration time.
    pub id: ComponentTypeId,
    /// Registered name ([`Component::NAME`]).
    pub name: &'static str,
    /// Field layout ([`Component::FIELDS`]).
    pub fields: &'static [FieldDef],
    /// Rust `TypeId` for runtime type checking.
    pub type_id: TypeId,
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Registry mapping Rust types and names to [`ComponentTypeId`]s.
///
/// A type can only be registered once; subsequent registrations of the same
/// Rust `TypeId` return the existing [`ComponentTypeId`].
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<&'static str, ComponentTypeId>,
    /// Indexed by ComponentTypeId.0.
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type.
    ///
    /// # Panics
    ///
    /// Panics if a different type is already registered under the same name.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }
        assert!(
            !self.by_name.contains_key(T::NAME),
            "component name '{}' is already registered for a different type",
            T::NAME
        );

        let id = ComponentTypeId(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            id,
            name: T::NAME,
            fields: T::FIELDS,
            type_id: rust_type_id,
        });
        self.by_type.insert(rust_type_id, id);
        self.by_name.insert(T::NAME, id);
        id
    }

    /// Look up a component type by its Rust type.
    pub fn lookup<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Look up a component type by its registered name.
    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    /// Get the [`ComponentInfo`] for a registered component type ID.
    pub fn get_info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.0 as usize)
    }

    /// All registered components in registration order.
    pub fn infos(&self) -> &[ComponentInfo] {
        &self.infos
    }

    /// Total number of registered component types.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether any component types have been registered.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Returns the names of all registered component types, sorted.
    pub fn registered_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Column storage
// ---------------------------------------------------------------------------

/// Type-erased view of a [`Column`], used by the world for entity-wide
/// operations (destroy) and by the dynamic field interface.
pub(crate) trait ErasedColumn: Send + Sync {
    fn contains(&self, index: u32) -> bool;
    /// Clear the slot. Returns whether it was occupied.
    fn remove(&mut self, index: u32) -> bool;
    fn read_fields(&self, index: u32) -> Option<Vec<FieldValue>>;
    fn insert_fields(&mut self, index: u32, fields: &[FieldValue]) -> Result<(), EcsError>;
    fn members(&self) -> &BTreeSet<u32>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense per-index storage for one component type plus its membership set.
///
/// A slot holds `Some` exactly while the entity at that index is attached, so
/// a detached entity can never be handed a stale value.
pub(crate) struct Column<T> {
    slots: Vec<Option<T>>,
    members: BTreeSet<u32>,
}

impl<T: Component> Column<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            members: BTreeSet::new(),
        }
    }

    pub(crate) fn get(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize).and_then(Option::as_mut)
    }

    /// Insert or replace. Returns the previous value.
    pub(crate) fn insert(&mut self, index: u32, value: T) -> Option<T> {
        let idx = index as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        self.members.insert(index);
        self.slots[idx].replace(value)
    }

    pub(crate) fn take(&mut self, index: u32) -> Option<T> {
        let value = self.slots.get_mut(index as usize).and_then(Option::take);
        if value.is_some() {
            self.members.remove(&index);
        }
        value
    }
}

impl<T: Component> ErasedColumn for Column<T> {
    fn contains(&self, index: u32) -> bool {
        self.members.contains(&index)
    }

    fn remove(&mut self, index: u32) -> bool {
        self.take(index).is_some()
    }

    fn read_fields(&self, index: u32) -> Option<Vec<FieldValue>> {
        self.get(index).map(Component::to_fields)
    }

    fn insert_fields(&mut self, index: u32, fields: &[FieldValue]) -> Result<(), EcsError> {
        let value = T::from_fields(fields)?;
        self.insert(index, value);
        Ok(())
    }

    fn members(&self) -> &BTreeSet<u32> {
        &self.members
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
