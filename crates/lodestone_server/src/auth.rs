//! The AUTH handshake (spec.md §4.3): create-or-load the player, assign the
//! session its id, reply, then bring the new session up to date with
//! everyone already here before announcing it to them.

use lodestone_networking::{ConnectionId, SessionTable};
use lodestone_persistence::PersistenceStore;
use lodestone_shared::{Message, PlayerId};
use tracing::info;

use crate::players::PlayerTable;

/// Spawn position for a brand-new player. The Python original spawns
/// everyone at the origin; nothing in spec.md asks for anything smarter.
const SPAWN_X: f64 = 0.0;
const SPAWN_Y: f64 = 0.0;

/// Handles one `AUTH` message: create-or-load the player, assign the
/// session its id, and run the full handshake spec.md §4.3 describes —
/// `AUTH_RESPONSE`, the player's own `INVENTORY_UPDATE`, a `PLAYER_JOIN`
/// for every other connected player, then a `PLAYER_JOIN` broadcast to
/// everyone else announcing the newcomer.
///
/// Chunk subscription starts empty (spec.md §4.3): `AUTH` sends no
/// `CHUNK_DATA` of its own. The client's first `PLAYER_MOVE` triggers the
/// area-of-interest diff that actually populates it.
pub fn handle_auth(
    conn_id: ConnectionId,
    name: String,
    sessions: &SessionTable,
    players: &mut PlayerTable,
    persistence: &PersistenceStore,
    tick: u64,
) {
    let (player_id, x, y) = match persistence.find_player_by_name(&name) {
        Ok(Some((id, record))) => {
            let x = record.x;
            let y = record.y;
            players.insert_existing(id, record.name.clone(), x, y, record.inventory);
            (id, x, y)
        }
        Ok(None) => {
            let id = players.insert_new(name.clone(), SPAWN_X, SPAWN_Y, lodestone_inventory::Inventory::new());
            (id, SPAWN_X, SPAWN_Y)
        }
        Err(err) => {
            tracing::error!(%name, error = %err, "failed to look up player by name, treating as new");
            let id = players.insert_new(name.clone(), SPAWN_X, SPAWN_Y, lodestone_inventory::Inventory::new());
            (id, SPAWN_X, SPAWN_Y)
        }
    };

    sessions.with_session_mut(conn_id, |session| session.authenticate(player_id));
    sessions.index_player(conn_id, player_id);
    info!(connection = conn_id.get(), player = player_id.get(), %name, "player authenticated");

    sessions.send_to(conn_id, Message::AuthResponse { success: true, player_id, x, y, tick });

    if let Some(state) = players.get(player_id) {
        sessions.send_to(conn_id, Message::InventoryUpdate { slots: state.inventory.to_wire_slots() });
    }

    for existing_id in sessions.authenticated_player_ids() {
        if existing_id == player_id {
            continue;
        }
        if let Some(peer) = players.get(existing_id) {
            sessions.send_to(conn_id, Message::PlayerJoin { id: existing_id, name: peer.name.clone(), x: peer.x, y: peer.y });
        }
    }

    sessions.broadcast_if(Some(conn_id), |s| s.is_authenticated(), &Message::PlayerJoin { id: player_id, name, x, y });
}

/// Handles a session's disconnect (spec.md §4.3): persist the player and
/// broadcast `PLAYER_LEAVE`. The session itself is already removed from the
/// table by the time `Inbound::Disconnected` is produced.
pub fn handle_disconnect(player_id: PlayerId, sessions: &SessionTable, players: &PlayerTable, persistence: &PersistenceStore) {
    if let Some(state) = players.get(player_id) {
        if let Err(err) = persistence.save_player(player_id, &state.name, state.x, state.y, &state.inventory) {
            tracing::error!(player = player_id.get(), error = %err, "failed to persist player on disconnect");
        }
    }
    sessions.broadcast_if(None, |s| s.is_authenticated(), &Message::PlayerLeave { id: player_id });
}
