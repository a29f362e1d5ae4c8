//! Typed queries over the world's query index.
//!
//! A [`Query`] is a tuple of component types. [`World::query`] returns the ids
//! of every entity holding all of them, in ascending index order;
//! [`World::query_values`] additionally clones the matched components out so
//! a system can read them and then write back through `&mut World` without
//! holding a borrow across the loop.

use crate::component::{Component, ComponentTypeId};
use crate::entity::EntityId;
use crate::world::World;

// ---------------------------------------------------------------------------
// Query trait -- describes a tuple of component types
// ---------------------------------------------------------------------------

/// Trait for a tuple of component types: `(A,)`, `(A, B)`, ...
pub trait Query {
    /// Cloned per-row output.
    type Item;
    /// Collect all required component type IDs. `None` if any is unregistered.
    fn type_ids(world: &World) -> Option<Vec<ComponentTypeId>>;
    /// Fetch one row.
    fn fetch(world: &World, entity: EntityId) -> Option<Self::Item>;
}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Query for ($($name,)+) {
            type Item = ($($name,)+);

            fn type_ids(world: &World) -> Option<Vec<ComponentTypeId>> {
                Some(vec![$(world.component_type_id::<$name>()?),+])
            }

            fn fetch(world: &World, entity: EntityId) -> Option<Self::Item> {
                Some(($(world.get::<$name>(entity)?.clone(),)+))
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);

// ---------------------------------------------------------------------------
// World query methods
// ---------------------------------------------------------------------------

impl World {
    /// Ids of all entities matching `Q`, in ascending index order.
    ///
    /// ```
    /// use botfield_ecs::prelude::*;
    ///
    /// botfield_ecs::tag_component! { struct Hot("hot"); }
    ///
    /// let mut world = World::new();
    /// world.register_component::<Hot>();
    /// let e = world.spawn();
    /// world.attach(e, Hot).unwrap();
    /// assert_eq!(world.query::<(Hot,)>(), vec![e]);
    /// ```
    pub fn query<Q: Query>(&self) -> Vec<EntityId> {
        match Q::type_ids(self) {
            Some(ids) => self.query_ids(&ids),
            None => Vec::new(),
        }
    }

    /// Matching entities together with clones of their `Q` components.
    pub fn query_values<Q: Query>(&self) -> Vec<(EntityId, Q::Item)> {
        self.query::<Q>()
            .into_iter()
            .filter_map(|entity| Q::fetch(self, entity).map(|item| (entity, item)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::world::World;

    crate::data_component! {
        struct Pos("pos") { x: f32, y: f32 }
    }

    crate::data_component! {
        struct Vel("vel") { dx: f32, dy: f32 }
    }

    crate::tag_component! {
        struct Frozen("frozen");
    }

    fn setup_world() -> World {
        let mut world = World::new();
        world.register_component::<Pos>();
        world.register_component::<Vel>();
        world.register_component::<Frozen>();
        world
    }

    #[test]
    fn query_matching_only() {
        let mut world = setup_world();
        let e1 = world.spawn();
        world.attach(e1, Pos { x: 1.0, y: 2.0 }).unwrap();
        world.attach(e1, Vel { dx: 3.0, dy: 4.0 }).unwrap();
        let e2 = world.spawn();
        world.attach(e2, Pos { x: 10.0, y: 20.0 }).unwrap();

        let results = world.query_values::<(Pos, Vel)>();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, e1);
        assert_eq!(results[0].1 .0, Pos { x: 1.0, y: 2.0 });
        assert_eq!(results[0].1 .1, Vel { dx: 3.0, dy: 4.0 });
    }

    #[test]
    fn query_mixes_tags_and_data() {
        let mut world = setup_world();
        let a = world.spawn();
        let b = world.spawn();
        world.attach(a, Pos { x: 0.0, y: 0.0 }).unwrap();
        world.attach(b, Pos { x: 0.0, y: 0.0 }).unwrap();
        world.attach(b, Frozen).unwrap();

        assert_eq!(world.query::<(Pos, Frozen)>(), vec![b]);
        assert_eq!(world.query::<(Frozen,)>(), vec![b]);
    }

    #[test]
    fn query_with_unregistered_type_is_empty() {
        crate::tag_component! {
            struct Stranger("stranger");
        }
        let mut world = setup_world();
        let e = world.spawn();
        world.attach(e, Pos { x: 0.0, y: 0.0 }).unwrap();
        assert!(world.query::<(Pos, Stranger)>().is_empty());
    }

    #[test]
    fn write_back_after_query_values() {
        let mut world = setup_world();
        let e = world.spawn();
        world.attach(e, Pos { x: 0.0, y: 0.0 }).unwrap();
        world.attach(e, Vel { dx: 1.0, dy: 2.0 }).unwrap();

        for (entity, (pos, vel)) in world.query_values::<(Pos, Vel)>() {
            world
                .write(
                    entity,
                    Pos {
                        x: pos.x + vel.dx,
                        y: pos.y + vel.dy,
                    },
                )
                .unwrap();
        }
        assert_eq!(world.get::<Pos>(e), Some(&Pos { x: 1.0, y: 2.0 }));
    }
}
