//! Streaming world state to observers, and BLAKE3 state hashing.
//!
//! Three ways to get state out of a [`SimWorld`]:
//!
//! - [`SimWorld::encode_snapshot`]: a one-off full snapshot of any component
//!   set, named by registered component names.
//! - Subscriptions: [`SimWorld::subscribe`] creates an observer over a
//!   component set. [`SimWorld::encode_subscription_snapshot`] sends a full
//!   baseline, and every [`SimWorld::encode_delta`] after that carries only
//!   what changed since the previous buffer of the same subscription.
//!   Applying the baseline and every delta in order to a
//!   [`Replica`](botfield_ecs::replica::Replica) reproduces what a fresh
//!   snapshot would show.
//! - [`SimWorld::state_hash`]: a BLAKE3 digest of everything that affects
//!   future tics, for determinism checks.
//!
//! ```
//! use botfield_engine::prelude::*;
//!
//! let mut world = create_world(3, 50).unwrap();
//! let bot = spawn_bot(&mut world, BotSpec::at(0.0, 0.0).urge(Urge::Wander)).unwrap();
//!
//! let sub = world.subscribe(&["position", "wander"]).unwrap();
//! let mut replica = Replica::new();
//! replica.decode_snapshot(&world.encode_subscription_snapshot(sub).unwrap()).unwrap();
//!
//! world.advance_tics(5);
//! replica.apply_delta(&world.encode_delta(sub).unwrap()).unwrap();
//!
//! assert_eq!(replica.read::<Position>(bot).unwrap().as_ref(), world.read::<Position>(bot));
//! assert_eq!(replica.tick(), Some(5));
//! ```

use std::fmt;

use botfield_ecs::observer::Observer;
use botfield_ecs::snapshot;
use serde::{Deserialize, Serialize};

use crate::events::SimEvent;
use crate::world::SimWorld;
use crate::SimError;

/// Handle for one observer subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub(crate) u32);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl SimWorld {
    /// Full snapshot of every entity holding at least one of `components`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`](botfield_ecs::EcsError::UnknownComponent)
    /// for a name that is not registered; [`SimError::Wire`] if a value cannot
    /// be encoded without loss.
    pub fn encode_snapshot(&self, components: &[&str]) -> Result<Vec<u8>, SimError> {
        let ids = self.ecs().resolve_names(components)?;
        Ok(snapshot::encode_snapshot(self.ecs(), &ids, self.tic())?)
    }

    /// Start observing `components`. The first delta of a subscription that
    /// never sent a snapshot attaches everything currently present.
    pub fn subscribe(&mut self, components: &[&str]) -> Result<SubscriptionId, SimError> {
        let ids = self.ecs().resolve_names(components)?;
        let observer = Observer::new(self.ecs(), &ids);
        let id = self.add_subscription(observer);
        tracing::debug!(subscription = %id, ?components, "subscribed");
        Ok(id)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Result<(), SimError> {
        self.remove_subscription(id)
            .ok_or(SimError::UnknownSubscription(id))?;
        tracing::debug!(subscription = %id, "unsubscribed");
        Ok(())
    }

    /// Full snapshot of a subscription's component set. Becomes the baseline
    /// for its next delta.
    pub fn encode_subscription_snapshot(&mut self, id: SubscriptionId) -> Result<Vec<u8>, SimError> {
        let (observer, world, tic) = self.subscription(id)?;
        Ok(observer.encode_snapshot(world, tic)?)
    }

    /// Changes to a subscription's component set since its previous snapshot
    /// or delta.
    pub fn encode_delta(&mut self, id: SubscriptionId) -> Result<Vec<u8>, SimError> {
        let (observer, world, tic) = self.subscription(id)?;
        Ok(observer.encode_delta(world, tic)?)
    }

    /// BLAKE3 hex digest (64 lowercase hex chars) of the simulation state:
    /// every component of every entity, the tic counter, the RNG state and
    /// the pending events.
    ///
    /// Two worlds with equal hashes run identically from here on.
    ///
    /// # Errors
    ///
    /// [`SimError::Wire`] if the state cannot be encoded without loss.
    pub fn state_hash(&self) -> Result<String, SimError> {
        let world = self.ecs();
        let all: Vec<_> = world.registry().infos().iter().map(|info| info.id).collect();

        let mut hasher = blake3::Hasher::new();
        hasher.update(&snapshot::encode_snapshot(world, &all, self.tic())?);
        hasher.update(&self.rng_state().to_le_bytes());
        for event in self.peek_events() {
            let (tag, first, second) = match *event {
                SimEvent::Collision { a, b } => (0u8, a, b),
                SimEvent::Consumed { consumer, item } => (1u8, consumer, item),
            };
            hasher.update(&[tag]);
            hasher.update(&first.to_raw().to_le_bytes());
            hasher.update(&second.to_raw().to_le_bytes());
        }
        Ok(hasher.finalize().to_hex().to_string())
    }
}
