//! Table row types making up the content catalog.
//!
//! These mirror spec.md §4.5's table shapes directly and are deserialized
//! from TOML (`catalog.toml`), following the `serde` + `toml` pattern
//! `oroboros_economy`'s recipe loading already uses in the teacher repo.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A tile kind: GRASS, DIRT, STONE, WATER, VOID, ore kinds, etc.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileDef {
    /// Catalog name, e.g. `"grass"`.
    pub name: String,
    /// Display color, `#rrggbb`.
    pub color: String,
    /// Whether a player/entity can stand on this tile.
    pub walkable: bool,
    /// Item a MINER extracts when sitting on this tile, if any.
    #[serde(default)]
    pub resource_item: Option<String>,
}

/// An entity (machine) kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityDef {
    /// Catalog name, e.g. `"miner"`.
    pub name: String,
    /// Human-facing display name.
    pub display_name: String,
    /// Display color, `#rrggbb`.
    pub color: String,
    /// Whether this entity kind has a facing direction.
    pub has_direction: bool,
    /// Generic single-buffer capacity (CHEST, CONVEYOR, MINER output).
    #[serde(default)]
    pub buffer_size: u32,
    /// Input-buffer capacity (FURNACE, ASSEMBLER).
    #[serde(default)]
    pub input_buffer_size: u32,
    /// Output-buffer capacity (FURNACE, ASSEMBLER).
    #[serde(default)]
    pub output_buffer_size: u32,
    /// Ticks between actions (MINER extraction, INSERTER pickup).
    #[serde(default)]
    pub cooldown: u32,
    /// Per-tick progress increment (CONVEYOR).
    #[serde(default)]
    pub speed: f32,
    /// Per-tick carry-animation increment (INSERTER).
    #[serde(default)]
    pub animation_speed: f32,
}

/// An item kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemDef {
    /// Human-facing display name.
    pub display_name: String,
    /// Display color, `#rrggbb`.
    pub color: String,
    /// Sort/grouping category, used by `sort()` (spec.md §4.6).
    pub category: String,
}

/// A FURNACE smelting recipe, keyed by input item name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FurnaceRecipeDef {
    /// Output item name.
    pub output: String,
    /// Number of output items produced per smelt.
    pub count: u32,
    /// Ticks the smelt takes.
    pub time: u32,
}

/// An ASSEMBLER crafting recipe, keyed by recipe name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssemblerRecipeDef {
    /// Human-facing display name.
    pub display_name: String,
    /// Required ingredient counts, keyed by item name.
    pub ingredients: HashMap<String, u32>,
    /// Output item name.
    pub result: String,
    /// Number of output items produced per craft.
    pub count: u32,
    /// Ticks the craft takes.
    pub time: u32,
}

/// Placement legality rule for one entity kind.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlacementRule {
    /// If non-empty, placement is legal only on these tile kinds.
    #[serde(default)]
    pub allowed_tiles: HashSet<String>,
    /// Placement is always illegal on these tile kinds.
    #[serde(default)]
    pub forbidden_tiles: HashSet<String>,
}

/// Resource-patch generation rule for one resource kind, keyed by the
/// kind's catalog name (`"iron"`, `"copper"`, `"coal"`). Spec.md §4.1: the
/// expected patch count over one region equals `frequency x region_area`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourcePatchDef {
    /// Expected patches per square tile of region area.
    pub frequency: f64,
    /// Minimum patch radius, in tiles.
    pub min_radius: f64,
    /// Maximum patch radius, in tiles.
    pub max_radius: f64,
    /// Minimum patch richness, in `[0, 1]`.
    pub min_richness: f64,
    /// Maximum patch richness, in `[0, 1]`.
    pub max_richness: f64,
}

/// A biome's terrain and resource gating, keyed by biome name (e.g.
/// `"plains"`). Spec.md §4.1: "Each biome names a base tile kind, optional
/// secondary kind with a probability, and a table of candidate resource
/// kinds."
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BiomeDef {
    /// Catalog tile name used for most tiles in this biome.
    pub base_tile: String,
    /// Catalog tile name occasionally substituted for `base_tile`.
    #[serde(default)]
    pub secondary_tile: Option<String>,
    /// Per-tile probability, in `[0, 1]`, of `secondary_tile` winning over
    /// `base_tile`. Ignored if `secondary_tile` is absent.
    #[serde(default)]
    pub secondary_probability: f64,
    /// Resource kinds (catalog names) that may place a patch in this
    /// biome. A kind absent from this list never wins a tile here even if
    /// its patch is the closest.
    #[serde(default)]
    pub candidate_resources: Vec<String>,
}
