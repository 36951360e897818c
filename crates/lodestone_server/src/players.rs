//! The live player set: display name, last known position, and inventory
//! for every currently-or-previously-connected player (spec.md §3). Owned
//! exclusively by the simulation worker, same as `Simulation` itself —
//! `PLAYER_MOVE`, `INVENTORY_ACTION` and AUTH all resolve here before a
//! reply goes out.

use std::collections::HashMap;

use lodestone_inventory::Inventory;
use lodestone_shared::{PlayerId, PlayerIdAllocator};

/// A connected or previously-connected player's authoritative state.
pub struct PlayerState {
    /// Display name, the only identity AUTH carries (spec.md §3).
    pub name: String,
    /// Last known x.
    pub x: f64,
    /// Last known y.
    pub y: f64,
    /// Player inventory.
    pub inventory: Inventory,
}

/// Every player the server has ever seen this run, keyed by id, plus the
/// allocator for brand-new names.
pub struct PlayerTable {
    players: HashMap<PlayerId, PlayerState>,
    allocator: PlayerIdAllocator,
}

impl PlayerTable {
    /// Creates a table whose allocator resumes one past the highest id any
    /// previous run persisted (spec.md §3; resolves the reconnect-identity
    /// open question, see DESIGN.md).
    #[must_use]
    pub fn new(next_player_id: u64) -> Self {
        Self { players: HashMap::new(), allocator: PlayerIdAllocator::starting_at(next_player_id) }
    }

    /// Registers a brand-new player, allocating its id.
    pub fn insert_new(&mut self, name: String, x: f64, y: f64, inventory: Inventory) -> PlayerId {
        let id = self.allocator.next();
        self.players.insert(id, PlayerState { name, x, y, inventory });
        id
    }

    /// Registers a returning player under its previously-assigned id.
    pub fn insert_existing(&mut self, id: PlayerId, name: String, x: f64, y: f64, inventory: Inventory) {
        self.players.insert(id, PlayerState { name, x, y, inventory });
    }

    /// Looks up a player's state.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    /// Looks up a player's state, mutably.
    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.get_mut(&id)
    }

    /// Every currently-known player id and state, for AUTH's `PLAYER_JOIN`
    /// backfill and the periodic flush.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &PlayerState)> {
        self.players.iter().map(|(&id, state)| (id, state))
    }
}
