//! Routes one decoded [`Inbound`] event to the simulation worker's owned
//! state (spec.md §4.2/§4.3/§4.6). Everything here runs on the simulation
//! thread, between ticks — `PLAYER_MOVE`, `INVENTORY_ACTION` and
//! `CHUNK_REQUEST` all take effect immediately; only `PLAYER_ACTION`
//! (BUILD/DESTROY/CONFIGURE) is buffered for the next [`Simulation::tick`].

use lodestone_catalog::Catalog;
use lodestone_inventory::{craft, pickup, transfer_from, transfer_to};
use lodestone_networking::{router, ConnectionId, Inbound, SessionTable};
use lodestone_shared::{InventoryAction, Message, PlayerAction, PlayerId};
use lodestone_simulation::Simulation;
use lodestone_world::ChunkCoord;

use crate::auth;
use crate::broadcast;
use crate::players::PlayerTable;

/// Handles one [`Inbound`] event. `pending_actions` accumulates BUILD/
/// DESTROY/CONFIGURE requests for the next tick; everything else is
/// resolved here and now.
pub fn dispatch(
    event: Inbound,
    sessions: &SessionTable,
    players: &mut PlayerTable,
    simulation: &mut Simulation,
    catalog: &Catalog,
    persistence: &lodestone_persistence::PersistenceStore,
    pending_actions: &mut Vec<(PlayerId, PlayerAction)>,
    view_dist: i64,
) {
    match event {
        Inbound::Message(conn_id, message) => handle_message(conn_id, message, sessions, players, simulation, catalog, persistence, pending_actions, view_dist),
        Inbound::Disconnected(_conn_id, Some(player_id)) => {
            auth::handle_disconnect(player_id, sessions, players, persistence);
        }
        Inbound::Disconnected(_conn_id, None) => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_message(
    conn_id: ConnectionId,
    message: Message,
    sessions: &SessionTable,
    players: &mut PlayerTable,
    simulation: &mut Simulation,
    catalog: &Catalog,
    persistence: &lodestone_persistence::PersistenceStore,
    pending_actions: &mut Vec<(PlayerId, PlayerAction)>,
    view_dist: i64,
) {
    match message {
        Message::Auth { name } => {
            auth::handle_auth(conn_id, name, sessions, players, persistence, simulation.tick_count());
        }
        Message::PlayerMove { x, y, .. } => {
            handle_player_move(conn_id, x, y, sessions, players, simulation, catalog, view_dist);
        }
        Message::ChunkRequest { cx, cy } => {
            handle_chunk_request(conn_id, cx, cy, sessions, simulation, catalog);
        }
        Message::PlayerActionMsg { action } => {
            if let Some(player_id) = sessions.with_session_mut(conn_id, |s| s.player_id()).flatten() {
                pending_actions.push((player_id, action));
            }
        }
        Message::InventoryActionMsg { action } => {
            handle_inventory_action(conn_id, action, sessions, players, simulation, catalog);
        }
        Message::Sync { client_time, .. } => {
            sessions.send_to(
                conn_id,
                Message::Sync { client_time, server_time: Some(now_millis()), tick: Some(simulation.tick_count()) },
            );
        }
        // Every other variant is server-to-client only; a client sending one
        // is either a bug or hostile, and either way is silently ignored
        // (spec.md §7: malformed or out-of-protocol input never tears down
        // the connection).
        _ => {}
    }
}

fn handle_player_move(
    conn_id: ConnectionId,
    x: f64,
    y: f64,
    sessions: &SessionTable,
    players: &mut PlayerTable,
    simulation: &mut Simulation,
    catalog: &Catalog,
    view_dist: i64,
) {
    let Some(player_id) = sessions.with_session_mut(conn_id, |s| s.player_id()).flatten() else { return };
    if !matches!(sessions.with_session_mut(conn_id, |s| s.validate_move(x, y)), Some(Ok(()))) {
        return;
    }
    let Some(state) = players.get_mut(player_id) else { return };
    state.x = x;
    state.y = y;

    #[allow(clippy::cast_possible_truncation)]
    let new_chunk = ChunkCoord::from_tile_pos(x as i64, y as i64);
    let new_aoi = router::area_of_interest(new_chunk, view_dist);

    let old_aoi = sessions.with_session_mut(conn_id, |s| s.subscribed_chunks().clone());
    if let Some(old_aoi) = old_aoi {
        for entered in router::newly_entered_chunks(&old_aoi, &new_aoi) {
            send_chunk_data(conn_id, entered, sessions, simulation, catalog);
        }
    }
    sessions.with_session_mut(conn_id, |s| s.set_subscribed_chunks(new_aoi));

    broadcast::broadcast_player_move(sessions, conn_id, new_chunk, &Message::PlayerMove { id: player_id, x, y });
}

fn handle_chunk_request(conn_id: ConnectionId, cx: i64, cy: i64, sessions: &SessionTable, simulation: &mut Simulation, catalog: &Catalog) {
    #[allow(clippy::cast_possible_truncation)]
    let coord = ChunkCoord::new(cx as i32, cy as i32);
    send_chunk_data(conn_id, coord, sessions, simulation, catalog);

    sessions.with_session_mut(conn_id, |s| {
        let mut chunks = s.subscribed_chunks().clone();
        chunks.insert(coord);
        s.set_subscribed_chunks(chunks);
    });
}

fn send_chunk_data(conn_id: ConnectionId, coord: ChunkCoord, sessions: &SessionTable, simulation: &mut Simulation, catalog: &Catalog) {
    let chunk = simulation.world.ensure_chunk(coord);
    let tiles = chunk.tile_ids_row_major();

    let entities = simulation
        .registry()
        .all_ids()
        .into_iter()
        .filter_map(|id| simulation.registry().get(id))
        .filter(|entity| ChunkCoord::from_tile_pos(entity.x, entity.y) == coord)
        .map(|entity| entity.to_wire(catalog))
        .collect();

    sessions.send_to(conn_id, Message::ChunkData { cx: coord.cx.into(), cy: coord.cy.into(), tiles, entities });
}

fn handle_inventory_action(
    conn_id: ConnectionId,
    action: InventoryAction,
    sessions: &SessionTable,
    players: &mut PlayerTable,
    simulation: &mut Simulation,
    catalog: &Catalog,
) {
    let Some(player_id) = sessions.with_session_mut(conn_id, |s| s.player_id()).flatten() else { return };
    let Some(state) = players.get_mut(player_id) else { return };

    match action {
        InventoryAction::Pickup { entity_id } => {
            let Some(entity) = simulation.registry().get(entity_id) else { return };
            let (x, y) = (entity.x as f64, entity.y as f64);
            pickup(&mut state.inventory, simulation.registry_mut(), x, y);
        }
        InventoryAction::Drop { .. } => {
            // Reserved: no drop-to-world target exists yet (no ground item
            // entity kind in the catalog). Silently ignored, per spec.md §7.
        }
        InventoryAction::TransferTo { entity_id, slot, count } => {
            if let Some(item) = state.inventory.get(slot).map(|stack| stack.item.clone()) {
                transfer_to(&mut state.inventory, simulation.registry_mut(), catalog, entity_id, &item, count);
            }
        }
        InventoryAction::TransferFrom { entity_id, count } => {
            if let Some(item) = peek_front_item(simulation, entity_id) {
                transfer_from(&mut state.inventory, simulation.registry_mut(), entity_id, &item, count);
            }
        }
        InventoryAction::Swap { a, b } => {
            state.inventory.swap(a, b);
        }
        InventoryAction::Craft { recipe } => {
            if let Err(err) = craft(&mut state.inventory, catalog, &recipe) {
                tracing::debug!(player = player_id.get(), %recipe, error = %err, "craft rejected");
            }
        }
        InventoryAction::Split { src, dst, count } => {
            state.inventory.split(src, dst, count);
        }
        InventoryAction::Sort => {
            state.inventory.sort(catalog);
        }
    }

    if let Some(state) = players.get(player_id) {
        sessions.send_to(conn_id, Message::InventoryUpdate { slots: state.inventory.to_wire_slots() });
    }
}

/// Looks at (without removing) the item that the front of `entity_id`'s
/// output-facing buffer currently holds, so `TRANSFER_FROM` can pass
/// [`transfer_from`] the item name its signature requires even though the
/// wire message (spec.md §4.6) only carries a count.
fn peek_front_item(simulation: &Simulation, entity_id: lodestone_shared::EntityId) -> Option<String> {
    use lodestone_simulation::entity::EntityState;
    let entity = simulation.registry().get(entity_id)?;
    match &entity.state {
        EntityState::Chest { items } => items.front().map(|i| i.item.clone()),
        EntityState::Furnace { output, .. } | EntityState::Miner { output, .. } | EntityState::Assembler { output, .. } => {
            output.front().map(|i| i.item.clone())
        }
        EntityState::Conveyor { items } => items.iter().find(|i| i.progress >= 0.9).map(|i| i.item.clone()),
        EntityState::Inserter { .. } => None,
    }
}

/// Wall-clock milliseconds for `SYNC`'s `server_time`. Not a game-logic
/// clock — the tick counter is authoritative for simulation time — so an
/// approximate `SystemTime` read is fine here.
fn now_millis() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64() * 1000.0).unwrap_or_default()
}
