//! Routes `Simulation::tick`'s [`TickReport`] into `ENTITY_ADD`/
//! `ENTITY_UPDATE`/`ENTITY_REMOVE`, and chunk-scoped `PLAYER_MOVE` relay
//! (spec.md §4.3).

use lodestone_catalog::Catalog;
use lodestone_networking::{ConnectionId, SessionTable};
use lodestone_shared::Message;
use lodestone_simulation::{EntityRegistry, TickReport};
use lodestone_world::ChunkCoord;

/// Sends `ENTITY_ADD`/`ENTITY_UPDATE` for this tick's changes, and
/// `ENTITY_REMOVE` for anything it destroyed, to every session whose area
/// of interest covers the affected tile.
///
/// A destroyed entity is already gone from `registry` by the time this
/// runs, so its chunk can't be recovered here; `ENTITY_REMOVE` goes out to
/// every authenticated session instead of being AoI-filtered. The payload
/// is just an id, so the extra fan-out costs little and never tells an
/// out-of-range client anything it couldn't already infer from a prior ADD.
pub fn broadcast_tick_report(report: &TickReport, sessions: &SessionTable, registry: &EntityRegistry, catalog: &Catalog) {
    for &id in &report.added {
        if let Some(entity) = registry.get(id) {
            let chunk = ChunkCoord::from_tile_pos(entity.x, entity.y);
            broadcast_to_chunk(sessions, chunk, &Message::EntityAdd { entity: entity.to_wire(catalog) });
        }
    }
    for &id in &report.updated {
        if let Some(entity) = registry.get(id) {
            let chunk = ChunkCoord::from_tile_pos(entity.x, entity.y);
            broadcast_to_chunk(sessions, chunk, &Message::EntityUpdate { entity: entity.to_wire(catalog) });
        }
    }
    for &id in &report.removed {
        sessions.broadcast_if(None, lodestone_networking::Session::is_authenticated, &Message::EntityRemove { id });
    }
}

fn broadcast_to_chunk(sessions: &SessionTable, chunk: ChunkCoord, message: &Message) {
    sessions.broadcast_if(None, |session| session.subscribed_chunks().contains(&chunk), message);
}

/// Relays a moved player's new position to every other session sharing a
/// chunk with it (spec.md §4.3), excluding the mover itself.
pub fn broadcast_player_move(sessions: &SessionTable, mover: ConnectionId, chunk: ChunkCoord, message: &Message) {
    sessions.broadcast_if(Some(mover), |session| session.subscribed_chunks().contains(&chunk), message);
}
