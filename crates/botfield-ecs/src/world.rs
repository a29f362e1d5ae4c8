//! The [`World`] is the top-level container for the ECS. It owns the entity
//! allocator, the component registry, and one column per registered
//! component type.

use std::collections::BTreeSet;

use crate::codec::FieldValue;
use crate::component::{Column, Component, ComponentInfo, ComponentRegistry, ComponentTypeId, ErasedColumn};
use crate::entity::{EntityAllocator, EntityId};
use crate::EcsError;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The top-level ECS container.
///
/// Provides the primary API for entity lifecycle and component access: a
/// typed interface (`attach::<T>`, `get::<T>`, ...) and a uniform dynamic one
/// keyed by [`ComponentTypeId`] and [`FieldValue`]s. Both operate on the same
/// columns, so tags and data components are queried and serialized alike.
pub struct World {
    /// Entity ID allocator.
    pub(crate) allocator: EntityAllocator,
    /// Component type registry.
    pub(crate) registry: ComponentRegistry,
    /// One column per registered component, indexed by `ComponentTypeId.0`.
    columns: Vec<Box<dyn ErasedColumn>>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.allocator.alive_count())
            .field("component_count", &self.columns.len())
            .finish()
    }
}

impl World {
    /// Create a new, empty world with no registered components.
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            registry: ComponentRegistry::new(),
            columns: Vec::new(),
        }
    }

    /// Read-only access to the component registry.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Register a component type and allocate its column.
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        let id = self.registry.register::<T>();
        if id.index() == self.columns.len() {
            self.columns.push(Box::new(Column::<T>::new()));
        }
        id
    }

    /// The [`ComponentTypeId`] of `T`, if registered.
    pub fn component_type_id<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.registry.lookup::<T>()
    }

    /// Resolve registered names to ids, preserving order.
    pub fn resolve_names(&self, names: &[&str]) -> Result<Vec<ComponentTypeId>, EcsError> {
        names
            .iter()
            .map(|name| {
                self.registry
                    .lookup_by_name(name)
                    .ok_or_else(|| EcsError::UnknownComponent {
                        name: (*name).to_owned(),
                        registered: self.registry.registered_names().join(", "),
                    })
            })
            .collect()
    }

    // -- internal column access ---------------------------------------------

    fn column<T: Component>(&self) -> Option<&Column<T>> {
        let id = self.registry.lookup::<T>()?;
        self.columns[id.index()].as_any().downcast_ref::<Column<T>>()
    }

    fn column_mut<T: Component>(&mut self) -> Result<&mut Column<T>, EcsError> {
        let id = self
            .registry
            .lookup::<T>()
            .ok_or(EcsError::UnregisteredComponent { name: T::NAME })?;
        self.columns[id.index()]
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .ok_or(EcsError::UnregisteredComponent { name: T::NAME })
    }

    fn erased(&self, id: ComponentTypeId) -> Result<&dyn ErasedColumn, EcsError> {
        self.columns
            .get(id.index())
            .map(|c| c.as_ref())
            .ok_or(EcsError::UnregisteredComponent { name: "<unknown id>" })
    }

    fn erased_mut(&mut self, id: ComponentTypeId) -> Result<&mut Box<dyn ErasedColumn>, EcsError> {
        self.columns
            .get_mut(id.index())
            .ok_or(EcsError::UnregisteredComponent { name: "<unknown id>" })
    }

    fn ensure_alive(&self, entity: EntityId) -> Result<(), EcsError> {
        if self.allocator.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::StaleEntity { entity })
        }
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Allocate a new entity with no components.
    pub fn spawn(&mut self) -> EntityId {
        let entity = self.allocator.allocate();
        tracing::trace!(%entity, "spawned");
        entity
    }

    /// Destroy an entity, clearing every column for its slot and recycling
    /// the ID.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        for column in &mut self.columns {
            column.remove(entity.index());
        }
        self.allocator.deallocate(entity);
        tracing::trace!(%entity, "despawned");
        Ok(())
    }

    /// Whether `entity` is currently alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// All live entities in ascending index order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.allocator.iter_alive()
    }

    // -- typed component access ---------------------------------------------

    /// Attach `value` to `entity`, replacing any existing value.
    ///
    /// Fails loudly on a dead entity rather than resurrecting its slot.
    pub fn attach<T: Component>(&mut self, entity: EntityId, value: T) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        self.column_mut::<T>()?.insert(entity.index(), value);
        Ok(())
    }

    /// Detach `T` from `entity`, returning the old value if it was attached.
    pub fn detach<T: Component>(&mut self, entity: EntityId) -> Result<Option<T>, EcsError> {
        self.ensure_alive(entity)?;
        Ok(self.column_mut::<T>()?.take(entity.index()))
    }

    /// Overwrite an already-attached component.
    ///
    /// Writing a component the entity does not hold is an error; use
    /// [`attach`](Self::attach) to add one.
    pub fn write<T: Component>(&mut self, entity: EntityId, value: T) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        let slot = self
            .column_mut::<T>()?
            .get_mut(entity.index())
            .ok_or(EcsError::NotAttached {
                entity,
                component: T::NAME,
            })?;
        *slot = value;
        Ok(())
    }

    /// Read a component. `None` for dead entities and unattached components.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.column::<T>()?.get(entity.index())
    }

    /// Mutable access to an attached component.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.column_mut::<T>().ok()?.get_mut(entity.index())
    }

    /// Whether `entity` currently holds `T`.
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.get::<T>(entity).is_some()
    }

    // -- dynamic component access -------------------------------------------

    /// Attach a component given as field values.
    pub fn attach_fields(
        &mut self,
        entity: EntityId,
        component: ComponentTypeId,
        fields: &[FieldValue],
    ) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        self.erased_mut(component)?.insert_fields(entity.index(), fields)
    }

    /// Overwrite an attached component given as field values.
    pub fn write_fields(
        &mut self,
        entity: EntityId,
        component: ComponentTypeId,
        fields: &[FieldValue],
    ) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        let name = self.component_name(component);
        let column = self.erased_mut(component)?;
        if !column.contains(entity.index()) {
            return Err(EcsError::NotAttached { entity, component: name });
        }
        column.insert_fields(entity.index(), fields)
    }

    /// Detach a component by id. Returns whether it was attached.
    pub fn detach_by_id(&mut self, entity: EntityId, component: ComponentTypeId) -> Result<bool, EcsError> {
        self.ensure_alive(entity)?;
        Ok(self.erased_mut(component)?.remove(entity.index()))
    }

    /// Read a component as field values. Tags read as an empty vector.
    pub fn read_fields(&self, entity: EntityId, component: ComponentTypeId) -> Option<Vec<FieldValue>> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.erased(component).ok()?.read_fields(entity.index())
    }

    /// Whether `entity` holds the component with the given id.
    pub fn has_id(&self, entity: EntityId, component: ComponentTypeId) -> bool {
        self.allocator.is_alive(entity)
            && self
                .erased(component)
                .map(|c| c.contains(entity.index()))
                .unwrap_or(false)
    }

    /// Metadata for a registered component.
    pub fn component_info(&self, component: ComponentTypeId) -> Option<&ComponentInfo> {
        self.registry.get_info(component)
    }

    fn component_name(&self, component: ComponentTypeId) -> &'static str {
        self.registry
            .get_info(component)
            .map(|info| info.name)
            .unwrap_or("<unknown id>")
    }

    // -- query index --------------------------------------------------------

    /// Entities holding every component in `components`, in ascending index
    /// order.
    ///
    /// Membership sets are updated eagerly on attach/detach, so results
    /// reflect changes made earlier in the same tick. An empty component set
    /// or an unregistered id matches nothing.
    pub fn query_ids(&self, components: &[ComponentTypeId]) -> Vec<EntityId> {
        let mut columns: Vec<&BTreeSet<u32>> = Vec::with_capacity(components.len());
        for &id in components {
            match self.columns.get(id.index()) {
                Some(column) => columns.push(column.members()),
                None => return Vec::new(),
            }
        }
        // Drive iteration from the smallest membership set.
        columns.sort_by_key(|members| members.len());
        let Some((driver, rest)) = columns.split_first() else {
            return Vec::new();
        };
        driver
            .iter()
            .copied()
            .filter(|index| rest.iter().all(|members| members.contains(index)))
            .filter_map(|index| self.allocator.current(index))
            .collect()
    }

    /// Entities holding at least one component in `components`, in ascending
    /// index order.
    pub fn query_any(&self, components: &[ComponentTypeId]) -> Vec<EntityId> {
        let mut indices = BTreeSet::new();
        for &id in components {
            if let Some(column) = self.columns.get(id.index()) {
                indices.extend(column.members().iter().copied());
            }
        }
        indices
            .into_iter()
            .filter_map(|index| self.allocator.current(index))
            .collect()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
