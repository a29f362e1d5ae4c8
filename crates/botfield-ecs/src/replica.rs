//! Reader-side state rebuilt from snapshot and delta buffers.
//!
//! A [`Replica`] is what a renderer or test harness holds: a plain map from
//! entity to component name to field values. It never touches a [`World`];
//! the buffers are its only input.
//!
//! [`World`]: crate::world::World

use std::collections::BTreeMap;

use crate::codec::{FieldDef, FieldValue, WireError};
use crate::component::Component;
use crate::entity::EntityId;
use crate::observer::{self, DeltaOp};
use crate::snapshot::{self, EntityFields};

/// Downstream view of a subscribed component set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replica {
    tick: Option<u64>,
    entities: BTreeMap<EntityId, EntityFields>,
}

impl Replica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire state with a snapshot. Entities absent from the
    /// snapshot disappear.
    pub fn decode_snapshot(&mut self, buf: &[u8]) -> Result<(), WireError> {
        let decoded = snapshot::decode_snapshot(buf)?;
        self.tick = Some(decoded.tick);
        self.entities = decoded.entities;
        Ok(())
    }

    /// Apply a delta on top of the last snapshot.
    ///
    /// The delta is applied atomically: on any error the replica is left
    /// exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`WireError::NoBaseline`] if no snapshot has been decoded yet.
    /// - [`WireError::UnknownEntity`] if a write, detach or despawn names an
    ///   entity the replica does not hold (a snapshot was missed).
    /// - [`WireError::NotAttached`] if a write or detach names a component
    ///   the entity does not hold.
    pub fn apply_delta(&mut self, buf: &[u8]) -> Result<(), WireError> {
        if self.tick.is_none() {
            return Err(WireError::NoBaseline);
        }
        let delta = observer::decode_delta(buf)?;
        let mut next = self.entities.clone();

        for op in delta.ops {
            match op {
                DeltaOp::Despawn { entity } => {
                    next.remove(&entity).ok_or(WireError::UnknownEntity(entity))?;
                }
                DeltaOp::Attach {
                    entity,
                    component,
                    values,
                } => {
                    let name = &snapshot::schema_at(&delta.schemas, component)?.name;
                    next.entry(entity).or_default().insert(name.clone(), values);
                }
                DeltaOp::Detach { entity, component } => {
                    let name = &snapshot::schema_at(&delta.schemas, component)?.name;
                    let fields = next.get_mut(&entity).ok_or(WireError::UnknownEntity(entity))?;
                    fields.remove(name).ok_or_else(|| WireError::NotAttached {
                        entity,
                        component: name.clone(),
                    })?;
                    if fields.is_empty() {
                        next.remove(&entity);
                    }
                }
                DeltaOp::Write {
                    entity,
                    component,
                    values,
                } => {
                    let name = &snapshot::schema_at(&delta.schemas, component)?.name;
                    let slot = next
                        .get_mut(&entity)
                        .ok_or(WireError::UnknownEntity(entity))?
                        .get_mut(name)
                        .ok_or_else(|| WireError::NotAttached {
                            entity,
                            component: name.clone(),
                        })?;
                    *slot = values;
                }
            }
        }

        self.entities = next;
        self.tick = Some(delta.tick);
        Ok(())
    }

    /// Tick of the last applied buffer; `None` before the first snapshot.
    pub fn tick(&self) -> Option<u64> {
        self.tick
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    pub fn entity(&self, entity: EntityId) -> Option<&EntityFields> {
        self.entities.get(&entity)
    }

    /// Raw field values of one component.
    pub fn get(&self, entity: EntityId, component: &str) -> Option<&[FieldValue]> {
        self.entities.get(&entity)?.get(component).map(Vec::as_slice)
    }

    /// Read a component back into its Rust type.
    ///
    /// Fails with [`WireError::FieldCount`] or [`WireError::FieldType`] if
    /// the received values do not match `C`'s field layout.
    pub fn read<C: Component>(&self, entity: EntityId) -> Result<Option<C>, WireError> {
        let Some(values) = self.get(entity, C::NAME) else {
            return Ok(None);
        };
        let count_error = || WireError::FieldCount {
            component: C::NAME.to_owned(),
            expected: C::FIELDS.len(),
            found: values.len(),
        };
        if values.len() != C::FIELDS.len() {
            return Err(count_error());
        }
        let type_error = |def: &FieldDef| WireError::FieldType {
            component: C::NAME.to_owned(),
            field: def.name.to_owned(),
            expected: def.ty,
        };
        if let Some(def) = C::FIELDS
            .iter()
            .zip(values)
            .find_map(|(def, value)| (value.field_type() != def.ty).then_some(def))
        {
            return Err(type_error(def));
        }
        C::from_fields(values).map(Some).map_err(|_| count_error())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
