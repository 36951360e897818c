//! The placed-machine data model.
//!
//! `EntityState` is a tagged union with one variant per entity kind, replacing
//! both the dynamically-typed `data: dict` the simulation was distilled from
//! and a generic archetype/component store — every machine's state is exactly
//! the fields it needs, known at compile time.

use std::collections::VecDeque;

use lodestone_catalog::{Catalog, EntityKindId};
use lodestone_shared::{BufferItemWire, ConveyorItemWire, Direction, EntityId, EntityStateWire, EntityWire};

/// A single item sitting in a non-conveyor buffer (chest/furnace/assembler/miner).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferItem {
    /// Catalog item name.
    pub item: String,
}

impl BufferItem {
    /// Wraps an item name.
    #[must_use]
    pub fn new(item: impl Into<String>) -> Self {
        Self { item: item.into() }
    }

    /// Converts to the wire shape.
    #[must_use]
    pub fn to_wire(&self) -> BufferItemWire {
        BufferItemWire { item: self.item.clone() }
    }

    /// Rebuilds from the wire shape (persistence load path).
    #[must_use]
    pub fn from_wire(wire: &BufferItemWire) -> Self {
        Self { item: wire.item.clone() }
    }
}

/// A single item riding a conveyor belt.
#[derive(Clone, Debug, PartialEq)]
pub struct ConveyorItem {
    /// Catalog item name.
    pub item: String,
    /// Position along the belt, in `[0, 1)`. Clamped to `0.99` under
    /// backpressure rather than dropped (spec.md §4.2).
    pub progress: f32,
}

impl ConveyorItem {
    /// Converts to the wire shape.
    #[must_use]
    pub fn to_wire(&self) -> ConveyorItemWire {
        ConveyorItemWire { item: self.item.clone(), progress: self.progress }
    }

    /// Rebuilds from the wire shape (persistence load path).
    #[must_use]
    pub fn from_wire(wire: &ConveyorItemWire) -> Self {
        Self { item: wire.item.clone(), progress: wire.progress }
    }
}

/// Kind-specific mutable state carried by an [`Entity`].
///
/// Dispatch (which updater runs, which insertion/extraction rule applies) is
/// done by matching on this enum directly rather than on a separate kind
/// discriminant, so state and behavior can never disagree.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityState {
    /// Extracts the resource under it into `output` every `cooldown` ticks.
    Miner {
        /// Extracted-but-not-yet-ejected items.
        output: VecDeque<BufferItem>,
        /// Ticks remaining before the next extraction.
        cooldown: u32,
    },
    /// Smelts `input` into `output` per the catalog's furnace recipe table.
    Furnace {
        /// Pending raw materials.
        input: VecDeque<BufferItem>,
        /// Smelted products awaiting ejection.
        output: VecDeque<BufferItem>,
        /// Ticks remaining before the current smelt completes.
        cooldown: u32,
    },
    /// Crafts `input` into `output` per a configured assembler recipe.
    Assembler {
        /// Pending ingredients.
        input: VecDeque<BufferItem>,
        /// Crafted products awaiting ejection.
        output: VecDeque<BufferItem>,
        /// Ticks remaining before the current craft completes.
        cooldown: u32,
        /// Configured catalog recipe name, if any.
        recipe: Option<String>,
    },
    /// Moves `items` toward the downstream target at a constant speed.
    Conveyor {
        /// Items currently on the belt, in belt order (oldest-inserted first).
        items: VecDeque<ConveyorItem>,
    },
    /// Moves one item at a time from the source tile to the destination tile.
    Inserter {
        /// Item currently being carried, if any.
        held_item: Option<BufferItem>,
        /// Carry animation progress, in `[0, 1)`.
        progress: f32,
        /// Ticks remaining before the next pickup attempt.
        cooldown: u32,
    },
    /// Passive storage; never updated by the tick.
    Chest {
        /// Stored items.
        items: VecDeque<BufferItem>,
    },
}

impl EntityState {
    /// A freshly-built miner with an empty output and no cooldown.
    #[must_use]
    pub fn new_miner() -> Self {
        Self::Miner { output: VecDeque::new(), cooldown: 0 }
    }

    /// A freshly-built furnace with empty buffers.
    #[must_use]
    pub fn new_furnace() -> Self {
        Self::Furnace { input: VecDeque::new(), output: VecDeque::new(), cooldown: 0 }
    }

    /// A freshly-built assembler with empty buffers and no recipe selected.
    #[must_use]
    pub fn new_assembler() -> Self {
        Self::Assembler { input: VecDeque::new(), output: VecDeque::new(), cooldown: 0, recipe: None }
    }

    /// A freshly-built, empty conveyor.
    #[must_use]
    pub fn new_conveyor() -> Self {
        Self::Conveyor { items: VecDeque::new() }
    }

    /// A freshly-built inserter, not holding anything.
    #[must_use]
    pub fn new_inserter() -> Self {
        Self::Inserter { held_item: None, progress: 0.0, cooldown: 0 }
    }

    /// A freshly-built, empty chest.
    #[must_use]
    pub fn new_chest() -> Self {
        Self::Chest { items: VecDeque::new() }
    }

    /// Converts to the wire shape broadcast over `ENTITY_ADD`/`ENTITY_UPDATE`
    /// (spec.md §4.3), decoupling the tagged-union model from the protocol
    /// type it mirrors.
    #[must_use]
    pub fn to_wire(&self) -> EntityStateWire {
        match self {
            Self::Miner { output, cooldown } => {
                EntityStateWire::Miner { output: output.iter().map(BufferItem::to_wire).collect(), cooldown: *cooldown }
            }
            Self::Furnace { input, output, cooldown } => EntityStateWire::Furnace {
                input: input.iter().map(BufferItem::to_wire).collect(),
                output: output.iter().map(BufferItem::to_wire).collect(),
                cooldown: *cooldown,
            },
            Self::Assembler { input, output, cooldown, recipe } => EntityStateWire::Assembler {
                input: input.iter().map(BufferItem::to_wire).collect(),
                output: output.iter().map(BufferItem::to_wire).collect(),
                cooldown: *cooldown,
                recipe: recipe.clone(),
            },
            Self::Conveyor { items } => EntityStateWire::Conveyor { items: items.iter().map(ConveyorItem::to_wire).collect() },
            Self::Inserter { held_item, progress, cooldown } => EntityStateWire::Inserter {
                held_item: held_item.as_ref().map(BufferItem::to_wire),
                progress: *progress,
                cooldown: *cooldown,
            },
            Self::Chest { items } => EntityStateWire::Chest { items: items.iter().map(BufferItem::to_wire).collect() },
        }
    }

    /// Rebuilds from the wire shape, the inverse of [`Self::to_wire`].
    /// Used to restore entities saved by `lodestone_persistence`.
    #[must_use]
    pub fn from_wire(wire: &EntityStateWire) -> Self {
        match wire {
            EntityStateWire::Miner { output, cooldown } => {
                Self::Miner { output: output.iter().map(BufferItem::from_wire).collect(), cooldown: *cooldown }
            }
            EntityStateWire::Furnace { input, output, cooldown } => Self::Furnace {
                input: input.iter().map(BufferItem::from_wire).collect(),
                output: output.iter().map(BufferItem::from_wire).collect(),
                cooldown: *cooldown,
            },
            EntityStateWire::Assembler { input, output, cooldown, recipe } => Self::Assembler {
                input: input.iter().map(BufferItem::from_wire).collect(),
                output: output.iter().map(BufferItem::from_wire).collect(),
                cooldown: *cooldown,
                recipe: recipe.clone(),
            },
            EntityStateWire::Conveyor { items } => Self::Conveyor { items: items.iter().map(ConveyorItem::from_wire).collect() },
            EntityStateWire::Inserter { held_item, progress, cooldown } => Self::Inserter {
                held_item: held_item.as_ref().map(BufferItem::from_wire),
                progress: *progress,
                cooldown: *cooldown,
            },
            EntityStateWire::Chest { items } => Self::Chest { items: items.iter().map(BufferItem::from_wire).collect() },
        }
    }
}

/// A placed machine or the player avatar's world-side counterpart.
///
/// Machines occupy exactly one tile; `direction` is meaningless for kinds
/// whose catalog definition has `has_direction == false` (currently CHEST)
/// but is still carried for uniformity with the wire representation.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Unique, never-recycled identifier (spec.md §3's `next_entity_id` invariant).
    pub id: EntityId,
    /// Dense catalog id of this entity's kind.
    pub kind: EntityKindId,
    /// Tile x.
    pub x: i64,
    /// Tile y.
    pub y: i64,
    /// Facing direction.
    pub direction: Direction,
    /// Kind-specific mutable state.
    pub state: EntityState,
}

impl Entity {
    /// Builds a new entity with the given identity, kind, position and
    /// direction, and state appropriate to that kind.
    #[must_use]
    pub fn new(id: EntityId, kind: EntityKindId, x: i64, y: i64, direction: Direction, state: EntityState) -> Self {
        Self { id, kind, x, y, direction, state }
    }

    /// Returns the tile this entity's kind-specific updater treats as
    /// "downstream" — `(x + dx, y + dy)` for `direction`'s unit vector
    /// (spec.md §4.2).
    #[must_use]
    pub fn downstream_tile(&self) -> (i64, i64) {
        let (dx, dy) = self.direction.delta();
        (self.x + dx, self.y + dy)
    }

    /// Returns the tile an INSERTER reads from: the tile opposite its facing.
    #[must_use]
    pub fn upstream_tile(&self) -> (i64, i64) {
        let (dx, dy) = self.direction.delta();
        (self.x - dx, self.y - dy)
    }

    /// Converts to the wire shape broadcast over `ENTITY_ADD`/`ENTITY_UPDATE`
    /// (spec.md §4.3). `catalog` resolves the dense kind id back to its name.
    #[must_use]
    pub fn to_wire(&self, catalog: &Catalog) -> EntityWire {
        let kind = catalog.entity_kind(self.kind).map_or("unknown", |d| d.name.as_str()).to_owned();
        EntityWire { id: self.id, kind, x: self.x, y: self.y, direction: self.direction, state: self.state.to_wire() }
    }

    /// Rebuilds from the wire shape, resolving the kind name back to its
    /// dense catalog id. Returns `None` if the catalog no longer knows this
    /// entity kind (e.g. content was removed since the entity was saved) —
    /// the caller drops the entity rather than restoring it in a broken
    /// state.
    #[must_use]
    pub fn from_wire(wire: &EntityWire, catalog: &Catalog) -> Option<Self> {
        let kind = catalog.entity_kind_id(&wire.kind)?;
        Some(Self {
            id: wire.id,
            kind,
            x: wire.x,
            y: wire.y,
            direction: wire.direction,
            state: EntityState::from_wire(&wire.state),
        })
    }
}
