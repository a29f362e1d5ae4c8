//! Incremental (delta) encoding for a subscribed component set.
//!
//! An [`Observer`] keeps a shadow copy of what its downstream reader has been
//! sent. Each [`encode_delta`](Observer::encode_delta) diffs the world against
//! that shadow, emits the difference as a list of [`DeltaOp`]s and advances the
//! shadow. The store knows nothing about observers; writes made through
//! `get_mut` show up because values are compared, not mutations hooked.
//!
//! Delta body layout (after the shared header and schema table):
//!
//! ```text
//! op_count u32 | { op u8 | entity u64 | [schema u16 | [values]] }*
//! ```

use std::collections::BTreeMap;

use crate::codec::{count, FieldValue, WireError, WireReader, WireWriter};
use crate::component::ComponentTypeId;
use crate::entity::EntityId;
use crate::snapshot::{self, BufferKind, ComponentSchema};
use crate::world::World;

type Shadow = BTreeMap<EntityId, BTreeMap<ComponentTypeId, Vec<FieldValue>>>;

// ---------------------------------------------------------------------------
// DeltaOp
// ---------------------------------------------------------------------------

/// One change carried by a delta buffer. `component` indexes the buffer's
/// schema table.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaOp {
    /// The entity was destroyed.
    Despawn { entity: EntityId },
    /// The component was attached (the entity may be new to the reader).
    Attach {
        entity: EntityId,
        component: u16,
        values: Vec<FieldValue>,
    },
    /// The component was detached.
    Detach { entity: EntityId, component: u16 },
    /// An attached component's values changed.
    Write {
        entity: EntityId,
        component: u16,
        values: Vec<FieldValue>,
    },
}

impl DeltaOp {
    const DESPAWN: u8 = 0;
    const ATTACH: u8 = 1;
    const DETACH: u8 = 2;
    const WRITE: u8 = 3;

    fn encode(&self, w: &mut WireWriter) -> Result<(), WireError> {
        match self {
            Self::Despawn { entity } => {
                w.u8(Self::DESPAWN);
                w.u64(entity.to_raw());
            }
            Self::Attach {
                entity,
                component,
                values,
            } => {
                w.u8(Self::ATTACH);
                w.u64(entity.to_raw());
                w.u16(*component);
                snapshot::write_values(w, values)?;
            }
            Self::Detach { entity, component } => {
                w.u8(Self::DETACH);
                w.u64(entity.to_raw());
                w.u16(*component);
            }
            Self::Write {
                entity,
                component,
                values,
            } => {
                w.u8(Self::WRITE);
                w.u64(entity.to_raw());
                w.u16(*component);
                snapshot::write_values(w, values)?;
            }
        }
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>, schemas: &[ComponentSchema]) -> Result<Self, WireError> {
        let tag = r.u8()?;
        let entity = EntityId::from_raw(r.u64()?);
        Ok(match tag {
            Self::DESPAWN => Self::Despawn { entity },
            Self::ATTACH | Self::WRITE => {
                let component = r.u16()?;
                let values = snapshot::read_values(r, snapshot::schema_at(schemas, component)?)?;
                if tag == Self::ATTACH {
                    Self::Attach {
                        entity,
                        component,
                        values,
                    }
                } else {
                    Self::Write {
                        entity,
                        component,
                        values,
                    }
                }
            }
            Self::DETACH => {
                let component = r.u16()?;
                snapshot::schema_at(schemas, component)?;
                Self::Detach { entity, component }
            }
            other => return Err(WireError::UnknownOp(other)),
        })
    }
}

/// A delta buffer decoded into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDelta {
    pub tick: u64,
    pub schemas: Vec<ComponentSchema>,
    pub ops: Vec<DeltaOp>,
}

/// Decode a buffer produced by [`Observer::encode_delta`].
pub fn decode_delta(buf: &[u8]) -> Result<DecodedDelta, WireError> {
    let mut r = WireReader::new(buf);
    let tick = snapshot::read_header(&mut r, BufferKind::Delta)?;
    let schemas = snapshot::read_schema(&mut r)?;
    let count = r.u32()?;
    let ops = (0..count)
        .map(|_| DeltaOp::decode(&mut r, &schemas))
        .collect::<Result<Vec<_>, _>>()?;
    r.expect_end()?;
    Ok(DecodedDelta { tick, schemas, ops })
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Change tracker for one downstream reader.
#[derive(Debug, Clone)]
pub struct Observer {
    components: Vec<ComponentTypeId>,
    shadow: Shadow,
}

impl Observer {
    /// Watch `components`. Nothing has been sent yet, so the first delta
    /// attaches everything currently present.
    pub fn new(world: &World, components: &[ComponentTypeId]) -> Self {
        Self {
            components: snapshot::normalize(world, components),
            shadow: Shadow::new(),
        }
    }

    /// The watched component set, deduplicated, in subscription order.
    pub fn components(&self) -> &[ComponentTypeId] {
        &self.components
    }

    /// Encode a full snapshot of the watched set and make it the new
    /// baseline for subsequent deltas.
    ///
    /// # Errors
    ///
    /// As [`snapshot::encode_snapshot`]. The baseline is unchanged on error.
    pub fn encode_snapshot(&mut self, world: &World, tick: u64) -> Result<Vec<u8>, WireError> {
        let buf = snapshot::encode_snapshot(world, &self.components, tick)?;
        self.shadow = self.capture(world);
        Ok(buf)
    }

    /// Encode every change to the watched set since the previous snapshot or
    /// delta taken through this observer.
    ///
    /// # Errors
    ///
    /// [`WireError::StringTooLong`] or [`WireError::CountOverflow`] if a
    /// change cannot be written without loss. The shadow is not advanced, so
    /// the failed changes are retried by the next delta.
    pub fn encode_delta(&mut self, world: &World, tick: u64) -> Result<Vec<u8>, WireError> {
        let current = self.capture(world);
        let ops = self.diff(world, &current);

        let mut w = WireWriter::new();
        snapshot::write_header(&mut w, BufferKind::Delta, tick);
        snapshot::write_schema(&mut w, &snapshot::schema_table(world, &self.components))?;
        w.u32(count("delta ops", ops.len())?);
        for op in &ops {
            op.encode(&mut w)?;
        }
        self.shadow = current;
        tracing::trace!(tick, ops = ops.len(), "encoded delta");
        Ok(w.finish())
    }

    fn capture(&self, world: &World) -> Shadow {
        world
            .query_any(&self.components)
            .into_iter()
            .map(|entity| {
                let held = self
                    .components
                    .iter()
                    .filter_map(|&id| world.read_fields(entity, id).map(|values| (id, values)))
                    .collect();
                (entity, held)
            })
            .collect()
    }

    /// Ops that turn the shadow into `current`, in ascending entity order and
    /// subscription order within an entity. An entity that left the capture
    /// is despawned only if the world no longer has it; one that merely lost
    /// every watched component gets detaches.
    fn diff(&self, world: &World, current: &Shadow) -> Vec<DeltaOp> {
        let mut entities: Vec<EntityId> = self.shadow.keys().chain(current.keys()).copied().collect();
        entities.sort_unstable();
        entities.dedup();

        let empty = BTreeMap::new();
        let mut ops = Vec::new();
        for entity in entities {
            let before = self.shadow.get(&entity);
            let after = current.get(&entity);
            if before.is_some() && after.is_none() && !world.is_alive(entity) {
                ops.push(DeltaOp::Despawn { entity });
                continue;
            }
            let before = before.unwrap_or(&empty);
            let after = after.unwrap_or(&empty);
            for (slot, id) in self.components.iter().enumerate() {
                // A set too large for u16 slots fails when its schema is written.
                let component = slot as u16;
                match (before.get(id), after.get(id)) {
                    (None, Some(values)) => ops.push(DeltaOp::Attach {
                        entity,
                        component,
                        values: values.clone(),
                    }),
                    (Some(_), None) => ops.push(DeltaOp::Detach { entity, component }),
                    (Some(old), Some(new)) if old != new => ops.push(DeltaOp::Write {
                        entity,
                        component,
                        values: new.clone(),
                    }),
                    _ => {}
                }
            }
        }
        ops
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
