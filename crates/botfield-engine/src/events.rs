//! Events pushed by the tick pipeline.

use botfield_ecs::entity::EntityId;
use serde::{Deserialize, Serialize};

/// Something that happened during a tic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimEvent {
    /// Two entities overlapped. `a < b` always holds.
    Collision { a: EntityId, b: EntityId },
    /// `consumer` picked up `item`, which has been destroyed.
    Consumed { consumer: EntityId, item: EntityId },
}

impl SimEvent {
    /// A collision event with its pair in canonical order.
    pub fn collision(x: EntityId, y: EntityId) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self::Collision { a, b }
    }

    /// Whether this event names `entity`.
    pub fn involves(&self, entity: EntityId) -> bool {
        match *self {
            Self::Collision { a, b } => a == entity || b == entity,
            Self::Consumed { consumer, item } => consumer == entity || item == entity,
        }
    }
}
