//! The simulation world and its fixed-tic driver.
//!
//! A [`SimWorld`] owns everything a run depends on: the component store, the
//! seeded RNG, the event queue, the tic counter and the observer
//! subscriptions. Between tics it is mutated only through [`prefab`]
//! constructors, [`command`]s and [`SimWorld::destroy`]; during a tic only
//! the system pipeline touches it.
//!
//! # Determinism
//!
//! Given the same configuration and the same sequence of spawn and command
//! calls, [`advance_tics`](SimWorld::advance_tics) produces identical state
//! and an identical event sequence, because:
//!
//! - systems run in a fixed order over queries that yield ascending entity
//!   indices;
//! - the RNG is private to the world and only systems draw from it;
//! - entity ids are recycled in FIFO order, a pure function of the spawn and
//!   destroy sequence.
//!
//! [`prefab`]: crate::prefab
//! [`command`]: crate::command

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use botfield_ecs::codec::FieldValue;
use botfield_ecs::component::Component;
use botfield_ecs::entity::EntityId;
use botfield_ecs::event::EventQueue;
use botfield_ecs::observer::Observer;
use botfield_ecs::rng::DeterministicRng;
use botfield_ecs::world::World;

use crate::components::{self, GridMarker, GridResolution, Pointer, PointerTile};
use crate::config::WorldConfig;
use crate::events::SimEvent;
use crate::pathfinding::{Grid, TileCoord};
use crate::snapshot::SubscriptionId;
use crate::systems::{self, SystemContext};
use crate::SimError;

/// Resolutions of the two grid-marker entities: the tile grid and the
/// sub-tile snap grid.
pub const GRID_RESOLUTIONS: [f32; 2] = [1.0, 0.25];

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Wall-clock timing of the last tic. Never feeds back into the simulation.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Time per system, in execution order.
    pub system_times: Vec<(&'static str, Duration)>,
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// SimWorld
// ---------------------------------------------------------------------------

/// A deterministic simulation.
pub struct SimWorld {
    ecs: World,
    rng: DeterministicRng,
    events: EventQueue<SimEvent>,
    config: WorldConfig,
    tic: u64,
    grid_markers: [EntityId; 2],
    pointer: EntityId,
    subscriptions: BTreeMap<SubscriptionId, Observer>,
    next_subscription: u32,
    last_diagnostics: TickDiagnostics,
}

impl std::fmt::Debug for SimWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimWorld")
            .field("tic", &self.tic)
            .field("entity_count", &self.ecs.entity_count())
            .field("pending_events", &self.events.len())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl SimWorld {
    /// Validate `config`, register every component and spawn the grid
    /// markers and the pointer.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] if the configuration is out of range.
    pub fn new(config: WorldConfig) -> Result<Self, SimError> {
        config.validate()?;

        let mut ecs = World::new();
        components::register_all(&mut ecs);

        let mut grid_markers = [EntityId::new(0, 0); 2];
        for (slot, value) in grid_markers.iter_mut().zip(GRID_RESOLUTIONS) {
            let marker = ecs.spawn();
            ecs.attach(marker, GridMarker)?;
            ecs.attach(marker, GridResolution { value })?;
            *slot = marker;
        }
        let pointer = ecs.spawn();
        ecs.attach(pointer, Pointer)?;
        ecs.attach(pointer, PointerTile { x: 0, y: 0 })?;

        tracing::debug!(seed = config.seed, tic_ms = config.tic_duration_ms, "world created");
        Ok(Self {
            ecs,
            rng: DeterministicRng::new(config.seed),
            events: EventQueue::new(),
            config,
            tic: 0,
            grid_markers,
            pointer,
            subscriptions: BTreeMap::new(),
            next_subscription: 0,
            last_diagnostics: TickDiagnostics::default(),
        })
    }

    // -- ticking -------------------------------------------------------------

    /// Run the system pipeline `n` times.
    pub fn advance_tics(&mut self, n: u64) {
        let _span = tracing::debug_span!("advance_tics", from = self.tic, n).entered();
        for _ in 0..n {
            self.run_one_tic();
        }
    }

    fn run_one_tic(&mut self) {
        let start = Instant::now();
        let mut ctx = SystemContext {
            world: &mut self.ecs,
            rng: &mut self.rng,
            events: &mut self.events,
            config: &self.config,
        };
        let system_times = systems::run_tic(&mut ctx);
        self.tic += 1;
        tracing::trace!(tic = self.tic, pending_events = self.events.len(), "tic complete");
        self.last_diagnostics = TickDiagnostics {
            system_times,
            total_time: start.elapsed(),
        };
    }

    // -- events --------------------------------------------------------------

    /// Take every pending event, oldest first, leaving the queue empty.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    /// Pending events without consuming them.
    pub fn peek_events(&self) -> &[SimEvent] {
        self.events.peek()
    }

    // -- reads ---------------------------------------------------------------

    /// Read a component. `None` for dead entities and unattached components.
    pub fn read<C: Component>(&self, entity: EntityId) -> Option<&C> {
        self.ecs.get::<C>(entity)
    }

    /// Read a component by registered name as wire field values.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`](botfield_ecs::EcsError::UnknownComponent)
    /// if no component is registered under `name`.
    pub fn read_fields(&self, entity: EntityId, name: &str) -> Result<Option<Vec<FieldValue>>, SimError> {
        let ids = self.ecs.resolve_names(&[name])?;
        Ok(ids.first().and_then(|&id| self.ecs.read_fields(entity, id)))
    }

    /// Read-only access to the component store.
    pub fn ecs(&self) -> &World {
        &self.ecs
    }

    pub(crate) fn ecs_mut(&mut self) -> &mut World {
        &mut self.ecs
    }

    pub(crate) fn rng_state(&self) -> u32 {
        self.rng.state()
    }

    /// A subscription's observer together with the store it watches.
    pub(crate) fn subscription(&mut self, id: SubscriptionId) -> Result<(&mut Observer, &World, u64), SimError> {
        let observer = self
            .subscriptions
            .get_mut(&id)
            .ok_or(SimError::UnknownSubscription(id))?;
        Ok((observer, &self.ecs, self.tic))
    }

    /// Shortest path between two tiles over the current passability grid,
    /// reduced to string-pulled waypoints. Empty when there is none.
    pub fn find_path(&self, from: TileCoord, to: TileCoord) -> Vec<TileCoord> {
        Grid::from_world(&self.ecs).find_path(from, to)
    }

    pub(crate) fn add_subscription(&mut self, observer: Observer) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.insert(id, observer);
        id
    }

    pub(crate) fn remove_subscription(&mut self, id: SubscriptionId) -> Option<Observer> {
        self.subscriptions.remove(&id)
    }

    // -- destruction ---------------------------------------------------------

    /// Destroy an entity and clear all of its components.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleEntity`](botfield_ecs::EcsError::StaleEntity) if it
    /// is already gone; [`SimError::Reserved`] for the grid markers and the
    /// pointer.
    pub fn destroy(&mut self, entity: EntityId) -> Result<(), SimError> {
        if self.grid_markers.contains(&entity) || entity == self.pointer {
            return Err(SimError::Reserved(entity));
        }
        self.ecs.despawn(entity)?;
        tracing::debug!(%entity, tic = self.tic, "entity destroyed");
        Ok(())
    }

    // -- accessors -----------------------------------------------------------

    /// Number of tics run so far.
    pub fn tic(&self) -> u64 {
        self.tic
    }

    pub fn tic_duration_ms(&self) -> u32 {
        self.config.tic_duration_ms
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The tile-grid and sub-tile-grid marker entities.
    pub fn grid_markers(&self) -> [EntityId; 2] {
        self.grid_markers
    }

    /// The entity carrying [`PointerTile`].
    pub fn pointer(&self) -> EntityId {
        self.pointer
    }

    /// Live entities, including the grid markers and the pointer.
    pub fn entity_count(&self) -> usize {
        self.ecs.entity_count()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
