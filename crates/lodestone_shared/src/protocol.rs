//! Wire message types shared between the networking and simulation crates.
//!
//! Every message crosses the wire as a MessagePack map `{t, d}` (spec.md
//! §4.3): `t` is an integer discriminant, `d` the variant's fields. `Message`
//! itself derives serde's externally-tagged representation (`{"<Variant>":
//! {...}}`), which is *not* the wire format directly — `lodestone_networking`'s
//! codec re-tags it into the `{t, d}` envelope using [`Message::wire_type`]
//! and [`Message::variant_name_for_wire_type`] below.

use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, PlayerId};

/// A player-facing action requested through `PLAYER_ACTION`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    /// Place a new entity at `(x, y)` facing `direction`.
    Build {
        /// Catalog entity kind name.
        entity_type: String,
        /// Target tile x.
        x: i64,
        /// Target tile y.
        y: i64,
        /// Facing direction.
        direction: Direction,
    },
    /// Remove an existing entity.
    Destroy {
        /// Entity to remove.
        entity_id: EntityId,
    },
    /// Reconfigure an existing entity (e.g. assembler recipe selection).
    Configure {
        /// Entity to reconfigure.
        entity_id: EntityId,
        /// Catalog recipe name, or `None` to clear.
        recipe: Option<String>,
    },
}

/// An inventory mutation requested through `INVENTORY_ACTION`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InventoryAction {
    /// Pick up items from an entity/the ground within reach.
    Pickup {
        /// Entity to scavenge from.
        entity_id: EntityId,
    },
    /// Drop items from a slot (currently unsupported target; reserved).
    Drop {
        /// Source slot.
        slot: usize,
        /// Count to drop.
        count: u32,
    },
    /// Move items from the player's inventory into an entity buffer.
    TransferTo {
        /// Destination entity.
        entity_id: EntityId,
        /// Source slot.
        slot: usize,
        /// Count to move.
        count: u32,
    },
    /// Move items from an entity buffer into the player's inventory.
    TransferFrom {
        /// Source entity.
        entity_id: EntityId,
        /// Count to move.
        count: u32,
    },
    /// Swap the contents of two slots.
    Swap {
        /// First slot.
        a: usize,
        /// Second slot.
        b: usize,
    },
    /// Craft one batch of a recipe.
    Craft {
        /// Catalog recipe name.
        recipe: String,
    },
    /// Split a stack across slots.
    Split {
        /// Source slot.
        src: usize,
        /// Destination slot.
        dst: usize,
        /// Count to move into `dst`.
        count: u32,
    },
    /// Coalesce and reorder all stacks.
    Sort,
}

/// Cardinal facing direction, used by entities with a direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Facing -y.
    North,
    /// Facing +x.
    East,
    /// Facing +y.
    South,
    /// Facing -x.
    West,
}

impl Direction {
    /// Returns the unit `(dx, dy)` vector of this direction.
    #[must_use]
    pub const fn delta(self) -> (i64, i64) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Every message that can cross the wire.
///
/// Derives serde's external tagging (`{ "<Variant>": { ...fields } }`) purely
/// as a convenient intermediate shape; the codec unwraps that single-key map
/// and re-tags it as `{t, d}` per [`Message::wire_type`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Message {
    /// C→S: display name only; no real authentication in this design.
    Auth {
        /// Player-chosen display name.
        name: String,
    },
    /// S→C: result of AUTH.
    AuthResponse {
        /// Whether auth succeeded (always true in this design).
        success: bool,
        /// Assigned player id.
        player_id: PlayerId,
        /// Spawn x.
        x: f64,
        /// Spawn y.
        y: f64,
        /// Current world tick.
        tick: u64,
    },
    /// S→C: a peer entered this client's area of interest.
    PlayerJoin {
        /// Peer id.
        id: PlayerId,
        /// Peer display name.
        name: String,
        /// Peer x.
        x: f64,
        /// Peer y.
        y: f64,
    },
    /// S→C: a peer left this client's area of interest (or disconnected).
    PlayerLeave {
        /// Peer id.
        id: PlayerId,
    },
    /// C↔S: position update. Client sends it; server rebroadcasts to peers.
    PlayerMove {
        /// Mover id (ignored on the C→S direction, filled by the server).
        id: PlayerId,
        /// New x.
        x: f64,
        /// New y.
        y: f64,
    },
    /// C→S: request a chunk's full contents.
    ChunkRequest {
        /// Chunk x.
        cx: i64,
        /// Chunk y.
        cy: i64,
    },
    /// S→C: full chunk payload.
    ChunkData {
        /// Chunk x.
        cx: i64,
        /// Chunk y.
        cy: i64,
        /// Row-major tile kind ids, `CHUNK_SIZE * CHUNK_SIZE` long.
        tiles: Vec<u16>,
        /// Entities currently in this chunk.
        entities: Vec<EntityWire>,
    },
    /// S→C: a new entity appeared.
    EntityAdd {
        /// The new entity.
        entity: EntityWire,
    },
    /// S→C: an entity's state changed.
    EntityUpdate {
        /// The changed entity.
        entity: EntityWire,
    },
    /// S→C: an entity was removed.
    EntityRemove {
        /// Removed entity id.
        id: EntityId,
    },
    /// C→S: a build/destroy/configure request.
    PlayerActionMsg {
        /// The requested action.
        action: PlayerAction,
    },
    /// S→C: full inventory snapshot.
    InventoryUpdate {
        /// Slots in order, `None` for empty.
        slots: Vec<Option<ItemStackWire>>,
    },
    /// C→S: an inventory mutation request.
    InventoryActionMsg {
        /// The requested action.
        action: InventoryAction,
    },
    /// C↔S: clock/tick echo.
    Sync {
        /// Client-supplied timestamp (ms), echoed back.
        client_time: f64,
        /// Server timestamp (ms); absent on the C→S request.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        server_time: Option<f64>,
        /// Current world tick; absent on the C→S request.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        tick: Option<u64>,
    },
}

impl Message {
    /// The integer `t` this variant carries in the wire envelope (spec.md
    /// §4.3). Stable across a given protocol version; never reordered once a
    /// client depends on it.
    #[must_use]
    pub const fn wire_type(&self) -> u16 {
        match self {
            Self::Auth { .. } => 0,
            Self::AuthResponse { .. } => 1,
            Self::PlayerJoin { .. } => 2,
            Self::PlayerLeave { .. } => 3,
            Self::PlayerMove { .. } => 4,
            Self::ChunkRequest { .. } => 5,
            Self::ChunkData { .. } => 6,
            Self::EntityAdd { .. } => 7,
            Self::EntityUpdate { .. } => 8,
            Self::EntityRemove { .. } => 9,
            Self::PlayerActionMsg { .. } => 10,
            Self::InventoryUpdate { .. } => 11,
            Self::InventoryActionMsg { .. } => 12,
            Self::Sync { .. } => 13,
        }
    }

    /// The externally-tagged variant name [`Self::wire_type`]'s code maps to,
    /// used by the codec to rebuild the `{"<Variant>": {...}}` shape serde's
    /// derived `Deserialize` expects. `None` for a `t` no known variant uses.
    #[must_use]
    pub const fn variant_name_for_wire_type(code: u16) -> Option<&'static str> {
        match code {
            0 => Some("Auth"),
            1 => Some("AuthResponse"),
            2 => Some("PlayerJoin"),
            3 => Some("PlayerLeave"),
            4 => Some("PlayerMove"),
            5 => Some("ChunkRequest"),
            6 => Some("ChunkData"),
            7 => Some("EntityAdd"),
            8 => Some("EntityUpdate"),
            9 => Some("EntityRemove"),
            10 => Some("PlayerActionMsg"),
            11 => Some("InventoryUpdate"),
            12 => Some("InventoryActionMsg"),
            13 => Some("Sync"),
            _ => None,
        }
    }
}

/// Wire representation of an item stack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemStackWire {
    /// Catalog item name.
    pub item: String,
    /// Stack count.
    pub count: u32,
}

/// Wire representation of an entity.
///
/// `state` mirrors `lodestone_simulation::entity::EntityState` one variant at
/// a time; the simulation crate converts to/from this shape at the broadcast
/// boundary so that the tagged-union entity model (§9 redesign note) and the
/// self-describing wire map (§4.3) can evolve independently.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityWire {
    /// Entity id.
    pub id: EntityId,
    /// Catalog entity kind name.
    pub kind: String,
    /// Tile x.
    pub x: i64,
    /// Tile y.
    pub y: i64,
    /// Facing direction.
    pub direction: Direction,
    /// Kind-specific state, serialized as a self-describing map.
    pub state: EntityStateWire,
}

/// A single item record in a non-conveyor buffer (chest/furnace/assembler/miner).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BufferItemWire {
    /// Catalog item name.
    pub item: String,
}

/// A single item riding a conveyor belt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConveyorItemWire {
    /// Catalog item name.
    pub item: String,
    /// Position along the belt, in `[0, 1)`.
    pub progress: f32,
}

/// Kind-specific entity state, externally tagged so the wire payload stays a
/// self-describing map per spec.md §4.3.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EntityStateWire {
    /// MINER: extracts from the tile under it into `output`.
    Miner {
        /// Extracted-but-not-yet-ejected items.
        output: Vec<BufferItemWire>,
        /// Ticks remaining before the next extraction.
        cooldown: u32,
    },
    /// FURNACE: smelts `input` into `output` per the catalog recipe table.
    Furnace {
        /// Pending raw materials.
        input: Vec<BufferItemWire>,
        /// Smelted products awaiting ejection.
        output: Vec<BufferItemWire>,
        /// Ticks remaining before the next smelt completes.
        cooldown: u32,
    },
    /// ASSEMBLER: crafts `input` into `output` per a configured recipe.
    Assembler {
        /// Pending ingredients.
        input: Vec<BufferItemWire>,
        /// Crafted products awaiting ejection.
        output: Vec<BufferItemWire>,
        /// Ticks remaining before the next craft completes.
        cooldown: u32,
        /// Configured catalog recipe name, if any.
        recipe: Option<String>,
    },
    /// CONVEYOR: moves `items` toward the downstream target.
    Conveyor {
        /// Items currently on the belt, in belt order.
        items: Vec<ConveyorItemWire>,
    },
    /// INSERTER: moves a single item from the source tile to the destination tile.
    Inserter {
        /// Item currently being carried, if any.
        held_item: Option<BufferItemWire>,
        /// Carry animation progress, in `[0, 1)`.
        progress: f32,
        /// Ticks remaining before the next pickup attempt.
        cooldown: u32,
    },
    /// CHEST: passive storage.
    Chest {
        /// Stored items.
        items: Vec<BufferItemWire>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_delta() {
        assert_eq!(Direction::North.delta(), (0, -1));
        assert_eq!(Direction::East.delta(), (1, 0));
        assert_eq!(Direction::South.delta(), (0, 1));
        assert_eq!(Direction::West.delta(), (-1, 0));
    }

    #[test]
    fn message_round_trips_through_msgpack() {
        let msg = Message::Sync {
            client_time: 123.0,
            server_time: Some(456.0),
            tick: Some(42),
        };
        let bytes = rmp_serde::to_vec_named(&msg).expect("encode");
        let decoded: Message = rmp_serde::from_slice(&bytes).expect("decode");
        match decoded {
            Message::Sync { client_time, server_time, tick } => {
                assert_eq!(client_time, 123.0);
                assert_eq!(server_time, Some(456.0));
                assert_eq!(tick, Some(42));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
