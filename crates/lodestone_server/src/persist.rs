//! Periodic and shutdown persistence flush (spec.md §4.4): dirty chunk
//! tiles, every placed entity, world metadata, and every known player's
//! position/inventory. Both the timer-driven flush and the final
//! shutdown flush call the same routine so there is exactly one place
//! that decides what "save everything" means.

use lodestone_catalog::Catalog;
use lodestone_persistence::{PersistenceStore, WorldMeta};
use lodestone_simulation::Simulation;

use crate::players::PlayerTable;

/// Writes every dirty chunk, the full entity set, world metadata, and
/// every known player to `persistence`.
pub fn flush_all(simulation: &mut Simulation, players: &PlayerTable, catalog: &Catalog, persistence: &PersistenceStore) {
    simulation.world.flush_dirty();

    let loaded_chunks = simulation.world.loaded_chunk_coords();
    if let Err(err) = persistence.save_all_entities(simulation.registry(), catalog, &loaded_chunks) {
        tracing::error!(error = %err, "failed to persist entity state");
    }

    let meta = WorldMeta { seed: 0, tick: simulation.tick_count(), next_entity_id: simulation.next_entity_id() };
    if let Err(err) = save_world_meta_preserving_seed(persistence, meta) {
        tracing::error!(error = %err, "failed to persist world metadata");
    }

    for (id, state) in players.iter() {
        if let Err(err) = persistence.save_player(id, &state.name, state.x, state.y, &state.inventory) {
            tracing::error!(player = id.get(), error = %err, "failed to persist player");
        }
    }
}

/// `WorldMeta.seed` never changes after world generation, but this module
/// has no reason to carry it around separately — it reads the
/// already-persisted seed back and writes it through unchanged rather
/// than threading a second copy through `Simulation`.
fn save_world_meta_preserving_seed(persistence: &PersistenceStore, meta: WorldMeta) -> lodestone_persistence::PersistenceResult<()> {
    let seed = persistence.load_world_meta()?.map_or(meta.seed, |existing| existing.seed);
    persistence.save_world_meta(WorldMeta { seed, ..meta })
}
