//! Consumption: consumers destroy the consumables they touch.
//!
//! Items are visited in index order and each goes to the lowest-index
//! consumer overlapping it, so an item is consumed at most once per tic. A
//! consumer destroyed earlier in the same tic (it was itself consumable)
//! consumes nothing.

use botfield_ecs::entity::EntityId;

use super::collision::overlaps;
use super::SystemContext;
use crate::components::{Consumable, Consumer, Position, Size};
use crate::events::SimEvent;

pub fn run(ctx: &mut SystemContext<'_>) {
    let consumers = ctx.world.query_values::<(Consumer, Position, Size)>();
    if consumers.is_empty() {
        return;
    }

    for (item, (_, item_pos, item_size)) in ctx.world.query_values::<(Consumable, Position, Size)>() {
        let eater: Option<EntityId> = consumers
            .iter()
            .filter(|(consumer, _)| *consumer != item && ctx.world.is_alive(*consumer))
            .find(|(_, (_, pos, size))| overlaps(pos, size, &item_pos, &item_size))
            .map(|(consumer, _)| *consumer);

        let Some(consumer) = eater else {
            continue;
        };
        if let Err(err) = ctx.world.despawn(item) {
            panic!("consumable {item} vanished during consumption: {err}");
        }
        tracing::debug!(%consumer, %item, "consumed");
        ctx.events.push(SimEvent::Consumed { consumer, item });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::testing::Harness;

    fn spawn_disc(h: &mut Harness, x: f32, diameter: f32) -> EntityId {
        let e = h.world.spawn();
        h.world.attach(e, Position { x, y: 0.0 }).unwrap();
        h.world.attach(e, Size { diameter }).unwrap();
        e
    }

    #[test]
    fn consumer_eats_overlapping_item() {
        let mut h = Harness::new(50);
        let eater = spawn_disc(&mut h, 0.0, 1.0);
        h.world.attach(eater, Consumer).unwrap();
        let near = spawn_disc(&mut h, 0.5, 0.5);
        h.world.attach(near, Consumable).unwrap();
        let far = spawn_disc(&mut h, 5.0, 0.5);
        h.world.attach(far, Consumable).unwrap();
        h.run(run);

        assert!(!h.world.is_alive(near));
        assert!(h.world.is_alive(far));
        assert_eq!(h.events.drain(), vec![SimEvent::Consumed { consumer: eater, item: near }]);
    }

    #[test]
    fn lowest_index_consumer_wins() {
        let mut h = Harness::new(50);
        let first = spawn_disc(&mut h, -0.5, 1.0);
        let second = spawn_disc(&mut h, 0.5, 1.0);
        h.world.attach(first, Consumer).unwrap();
        h.world.attach(second, Consumer).unwrap();
        let item = spawn_disc(&mut h, 0.0, 0.5);
        h.world.attach(item, Consumable).unwrap();
        h.run(run);

        assert_eq!(h.events.drain(), vec![SimEvent::Consumed { consumer: first, item }]);
    }

    #[test]
    fn consumer_never_eats_itself() {
        let mut h = Harness::new(50);
        let e = spawn_disc(&mut h, 0.0, 1.0);
        h.world.attach(e, Consumer).unwrap();
        h.world.attach(e, Consumable).unwrap();
        h.run(run);
        assert!(h.world.is_alive(e));
        assert!(h.events.is_empty());
    }
}
