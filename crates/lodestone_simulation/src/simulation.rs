//! The tick orchestrator: applies buffered player actions, then runs every
//! entity's per-kind update (spec.md §4.2).

use std::collections::HashSet;
use std::sync::Arc;

use lodestone_catalog::Catalog;
use lodestone_shared::{Direction, EntityId, PlayerAction, PlayerId};
use lodestone_world::ChunkStore;
use tracing::{debug, trace, warn};

use crate::entity::{Entity, EntityState};
use crate::registry::EntityRegistry;
use crate::update::update_entity;

/// Owns the world and the entity registry and drives the fixed-rate tick.
///
/// Lives entirely on the simulation worker thread (spec.md §5); nothing here
/// is shared across threads except by handing the whole struct (or an
/// `Arc<Mutex<_>>` around it, built one layer up in `lodestone_server`) to a
/// single owner at a time.
pub struct Simulation {
    /// Chunked terrain and resource placement.
    pub world: ChunkStore,
    registry: EntityRegistry,
    catalog: Arc<Catalog>,
    tick: u64,
}

impl Simulation {
    /// Builds a simulation over an already-generated/loaded world, resuming
    /// entity id allocation from `next_entity_id` and the tick counter from
    /// `starting_tick` (both read from `world_meta` on startup, spec.md §4.4).
    #[must_use]
    pub fn new(world: ChunkStore, catalog: Arc<Catalog>, next_entity_id: u64, starting_tick: u64) -> Self {
        Self { world, registry: EntityRegistry::new(next_entity_id), catalog, tick: starting_tick }
    }

    /// The current world tick, for `AUTH_RESPONSE`/`SYNC` and persistence.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The id that will be assigned to the next built entity, for persistence.
    #[must_use]
    pub fn next_entity_id(&self) -> u64 {
        self.registry.peek_next_id()
    }

    /// Read access to the entity registry, e.g. for `CHUNK_DATA` snapshots.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Mutable access to the entity registry, for PICKUP and
    /// TRANSFER_TO/TRANSFER_FROM (spec.md §4.6), which mutate entity buffers
    /// outside of the tick itself.
    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// Runs one fixed-rate tick (spec.md §4.2):
    /// 1. Increment the tick counter.
    /// 2. Clear the dirty-entities set.
    /// 3. Apply every buffered action (so their effects are visible to, and
    ///    marked dirty before, this tick's per-entity updates).
    /// 4. Update every entity by kind.
    ///
    /// Returns a [`TickReport`] distinguishing newly-built entities from
    /// merely-updated ones from destroyed ones, so the broadcast router can
    /// send `ENTITY_ADD`/`ENTITY_UPDATE`/`ENTITY_REMOVE` (spec.md §4.3) rather
    /// than a single undifferentiated "changed" set.
    pub fn tick(&mut self, actions: &[(PlayerId, PlayerAction)]) -> TickReport {
        self.tick += 1;
        let mut report = TickReport::default();

        for (actor, action) in actions {
            self.apply_action(*actor, action, &mut report);
        }

        for id in self.registry.all_ids() {
            let mut touched = HashSet::new();
            update_entity(id, &mut self.registry, &mut self.world, &self.catalog, &mut touched);
            for id in touched {
                if !report.added.contains(&id) {
                    report.updated.insert(id);
                }
            }
        }

        report
    }

    /// Applies one buffered `PLAYER_ACTION`. `actor` is unused for BUILD
    /// today (no per-player ownership, spec.md §3) but is threaded through
    /// for the audit-style `debug!` logging below.
    fn apply_action(&mut self, actor: PlayerId, action: &PlayerAction, report: &mut TickReport) {
        match action {
            PlayerAction::Build { entity_type, x, y, direction } => {
                if let Some(id) = self.build(entity_type, *x, *y, *direction) {
                    debug!(actor = actor.get(), entity = id.get(), kind = %entity_type, x, y, "built entity");
                    report.added.insert(id);
                } else {
                    debug!(actor = actor.get(), kind = %entity_type, x, y, "rejected illegal build");
                }
            }
            PlayerAction::Destroy { entity_id } => {
                if self.destroy(*entity_id) {
                    debug!(actor = actor.get(), entity = entity_id.get(), "destroyed entity");
                    report.added.remove(entity_id);
                    report.updated.remove(entity_id);
                    report.removed.insert(*entity_id);
                } else {
                    debug!(actor = actor.get(), entity = entity_id.get(), "ignored destroy of unknown entity");
                }
            }
            PlayerAction::Configure { entity_id, recipe } => {
                if self.configure(*entity_id, recipe.clone()) {
                    if !report.added.contains(entity_id) {
                        report.updated.insert(*entity_id);
                    }
                } else {
                    debug!(actor = actor.get(), entity = entity_id.get(), "ignored configure of non-assembler/unknown entity");
                }
            }
        }
    }

    /// Places a new entity if `(x, y)` is on a tile this kind may occupy
    /// (spec.md §4.5) and unoccupied. Invalid requests are silent no-ops
    /// (spec.md §7) — this is the normal outcome for a client racing another
    /// player, not an error.
    pub fn build(&mut self, entity_type: &str, x: i64, y: i64, direction: Direction) -> Option<EntityId> {
        let kind = self.catalog.entity_kind_id(entity_type)?;
        let tile = self.world.tile_at(x, y);
        let tile_name = self.catalog.tile(tile.tile_id).map(|t| t.name.as_str())?;
        if !self.catalog.can_place(entity_type, tile_name) {
            return None;
        }
        if self.registry.entity_at(x, y).is_some() {
            return None;
        }

        let state = initial_state(entity_type);
        self.registry.place(|id| Entity::new(id, kind, x, y, direction, state)).ok()
    }

    /// Removes an entity. Its buffered items dissolve with it (spec.md §9
    /// Open Question 2). Returns whether anything was removed.
    pub fn destroy(&mut self, entity_id: EntityId) -> bool {
        self.registry.remove(entity_id).is_ok()
    }

    /// Sets an ASSEMBLER's recipe selection. No-op (returns `false`) for any
    /// other kind, an unknown entity, or an unknown recipe name.
    pub fn configure(&mut self, entity_id: EntityId, recipe: Option<String>) -> bool {
        if let Some(name) = &recipe {
            if self.catalog.assembler_recipe(name).is_none() {
                warn!(entity = entity_id.get(), recipe = %name, "ignored configure with unknown recipe");
                return false;
            }
        }
        let Some(entity) = self.registry.get_mut(entity_id) else { return false };
        let EntityState::Assembler { recipe: slot, .. } = &mut entity.state else {
            trace!(entity = entity_id.get(), "ignored configure of non-assembler");
            return false;
        };
        *slot = recipe;
        true
    }
}

/// What changed during one [`Simulation::tick`], split the way spec.md §4.3's
/// `ENTITY_ADD` / `ENTITY_UPDATE` / `ENTITY_REMOVE` messages need it: an
/// entity built this tick is reported as added, never also as updated, even
/// if its own per-kind update pass touched it in the same tick; an entity
/// destroyed this tick is reported as removed and scrubbed from the other
/// two sets (built-then-destroyed in one tick nets to nothing).
#[derive(Debug, Default)]
pub struct TickReport {
    /// Entities placed this tick via `PLAYER_ACTION` BUILD.
    pub added: HashSet<EntityId>,
    /// Pre-existing entities whose state changed this tick (CONFIGURE or the
    /// per-kind update pass), excluding anything already in `added`.
    pub updated: HashSet<EntityId>,
    /// Entities destroyed this tick via `PLAYER_ACTION` DESTROY.
    pub removed: HashSet<EntityId>,
}

/// The freshly-built state for a catalog entity kind name. Anything not
/// listed here (player avatars, future kinds) has no simulation state of its
/// own and is out of scope for `build`.
fn initial_state(entity_type: &str) -> EntityState {
    match entity_type {
        "furnace" => EntityState::new_furnace(),
        "assembler" => EntityState::new_assembler(),
        "conveyor" => EntityState::new_conveyor(),
        "inserter" => EntityState::new_inserter(),
        "chest" => EntityState::new_chest(),
        _ => EntityState::new_miner(),
    }
}

#[cfg(test)]
mod tests {
    use lodestone_world::{ChunkBackingStore, ChunkCoord, WorldSeed};

    use super::*;

    /// Every tile is grass, so BUILD never has to reason about procedurally
    /// generated terrain — only about occupancy and catalog rules.
    struct AllGrassBackingStore {
        grass: lodestone_catalog::TileId,
    }

    impl ChunkBackingStore for AllGrassBackingStore {
        fn load_chunk(&self, coord: ChunkCoord) -> Option<lodestone_world::Chunk> {
            Some(lodestone_world::Chunk::filled(coord, self.grass))
        }

        fn save_chunk(&self, _chunk: &lodestone_world::Chunk) {}
    }

    fn sim() -> Simulation {
        let catalog = Arc::new(Catalog::load_defaults().expect("embedded catalog"));
        let grass = catalog.tile_id("grass").expect("embedded catalog has grass");
        let world = ChunkStore::new(WorldSeed::new(7), catalog.clone(), Box::new(AllGrassBackingStore { grass }));
        Simulation::new(world, catalog, 1, 0)
    }

    #[test]
    fn tick_increments_counter_and_clears_dirty_each_call() {
        let mut s = sim();
        assert_eq!(s.tick_count(), 0);
        s.tick(&[]);
        assert_eq!(s.tick_count(), 1);
        s.tick(&[]);
        assert_eq!(s.tick_count(), 2);
    }

    #[test]
    fn build_then_destroy_round_trips_occupancy() {
        let mut s = sim();
        let id = s.build("chest", 3, 3, Direction::North).expect("grass is placeable");
        assert!(s.registry().get(id).is_some());
        assert!(s.registry().entity_at(3, 3).is_some());

        assert!(s.destroy(id));
        assert!(s.registry().entity_at(3, 3).is_none());
    }

    #[test]
    fn build_rejects_duplicate_tile() {
        let mut s = sim();
        s.build("chest", 4, 4, Direction::North).expect("first build succeeds");
        assert!(s.build("chest", 4, 4, Direction::North).is_none());
    }

    #[test]
    fn configure_rejects_unknown_recipe_and_non_assemblers() {
        let mut s = sim();
        let chest = s.build("chest", 0, 0, Direction::North).unwrap();
        assert!(!s.configure(chest, Some("iron_gear".into())));

        let assembler = s.build("assembler", 1, 0, Direction::North).unwrap();
        assert!(!s.configure(assembler, Some("not_a_real_recipe".into())));
    }

    #[test]
    fn actions_apply_before_per_entity_update_within_the_same_tick() {
        let mut s = sim();
        let furnace = s.build("furnace", 10, 10, Direction::East).unwrap();
        let chest = s.build("chest", 11, 10, Direction::East).unwrap();

        if let EntityState::Furnace { output, .. } = &mut s.registry.get_mut(furnace).unwrap().state {
            output.push_back(crate::entity::BufferItem::new("iron_plate"));
        }

        s.tick(&[(PlayerId(0), PlayerAction::Destroy { entity_id: chest })]);

        assert!(s.registry().entity_at(11, 10).is_none());
        let EntityState::Furnace { output, .. } = &s.registry().get(furnace).unwrap().state else { panic!("still a furnace") };
        assert_eq!(output.len(), 1, "destroy was visible to this tick's update, so ejection had nowhere to go");
    }
}
