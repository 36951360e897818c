//! # Lodestone Catalog
//!
//! The immutable, read-once content catalog (spec.md §4.5). Loaded exactly
//! once before any worker starts (spec.md §5's "process-wide immutable
//! state" rule) and then shared by `Arc` across the simulation and
//! networking workers — never mutated, never reached via a `get_config()`
//! singleton (spec.md §9's explicit redesign note).

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod tables;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::{CatalogError, CatalogResult};
pub use tables::{
    AssemblerRecipeDef, BiomeDef, EntityDef, FurnaceRecipeDef, ItemDef, PlacementRule, ResourcePatchDef, TileDef,
};

/// Embedded fallback catalog, compiled into the binary. Used when no
/// `--catalog` path is given and `MONGO_URI` is unset (spec.md §6/§4.5).
const DEFAULT_CATALOG_TOML: &str = include_str!("default_catalog.toml");

/// Dense integer id for a tile kind.
pub type TileId = u16;

/// Dense integer id for an entity kind.
pub type EntityKindId = u16;

/// Raw on-disk shape of a catalog file.
#[derive(Debug, Deserialize, Serialize)]
struct CatalogFile {
    #[serde(default)]
    tiles: Vec<TileDef>,
    #[serde(default)]
    entities: Vec<EntityDef>,
    #[serde(default)]
    items: HashMap<String, ItemDef>,
    #[serde(default)]
    furnace_recipes: HashMap<String, FurnaceRecipeDef>,
    #[serde(default)]
    assembler_recipes: HashMap<String, AssemblerRecipeDef>,
    #[serde(default)]
    placement_rules: HashMap<String, PlacementRule>,
    #[serde(default)]
    resource_patches: HashMap<String, ResourcePatchDef>,
    #[serde(default)]
    biomes: HashMap<String, BiomeDef>,
    #[serde(default)]
    constants: HashMap<String, toml::Value>,
}

/// The fully-resolved, queryable content catalog.
#[derive(Debug)]
pub struct Catalog {
    tiles: Vec<TileDef>,
    tile_ids: HashMap<String, TileId>,
    entities: Vec<EntityDef>,
    entity_ids: HashMap<String, EntityKindId>,
    items: HashMap<String, ItemDef>,
    furnace_recipes: HashMap<String, FurnaceRecipeDef>,
    assembler_recipes: HashMap<String, AssemblerRecipeDef>,
    placement_rules: HashMap<String, PlacementRule>,
    resource_patches: HashMap<String, ResourcePatchDef>,
    biomes: HashMap<String, BiomeDef>,
    constants: HashMap<String, toml::Value>,
}

impl Catalog {
    /// Loads the catalog from a TOML file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, or
    /// [`CatalogError::InvalidConfig`] if it does not parse.
    pub fn load_from_file(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// Loads the embedded default catalog compiled into the binary.
    ///
    /// Used when no catalog path is configured and `MONGO_URI` (spec.md §6)
    /// is unset, i.e. the admin content store is unreachable.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] only if the embedded default
    /// itself is malformed, which would be a build-time bug.
    pub fn load_defaults() -> CatalogResult<Self> {
        Self::load_from_str(DEFAULT_CATALOG_TOML)
    }

    fn load_from_str(text: &str) -> CatalogResult<Self> {
        let file: CatalogFile =
            toml::from_str(text).map_err(|e| CatalogError::InvalidConfig(e.to_string()))?;

        let tile_ids = file
            .tiles
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i as TileId))
            .collect();
        let entity_ids = file
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i as EntityKindId))
            .collect();

        Ok(Self {
            tiles: file.tiles,
            tile_ids,
            entities: file.entities,
            entity_ids,
            items: file.items,
            furnace_recipes: file.furnace_recipes,
            assembler_recipes: file.assembler_recipes,
            placement_rules: file.placement_rules,
            resource_patches: file.resource_patches,
            biomes: file.biomes,
            constants: file.constants,
        })
    }

    /// Looks up a tile's dense id by name.
    #[must_use]
    pub fn tile_id(&self, name: &str) -> Option<TileId> {
        self.tile_ids.get(name).copied()
    }

    /// Looks up a tile definition by dense id.
    #[must_use]
    pub fn tile(&self, id: TileId) -> Option<&TileDef> {
        self.tiles.get(id as usize)
    }

    /// Looks up a tile definition by name.
    #[must_use]
    pub fn tile_by_name(&self, name: &str) -> Option<&TileDef> {
        self.tile_id(name).and_then(|id| self.tile(id))
    }

    /// Looks up an entity kind's dense id by name.
    #[must_use]
    pub fn entity_kind_id(&self, name: &str) -> Option<EntityKindId> {
        self.entity_ids.get(name).copied()
    }

    /// Looks up an entity kind definition by dense id.
    #[must_use]
    pub fn entity_kind(&self, id: EntityKindId) -> Option<&EntityDef> {
        self.entities.get(id as usize)
    }

    /// Looks up an entity kind definition by name.
    #[must_use]
    pub fn entity_kind_by_name(&self, name: &str) -> Option<&EntityDef> {
        self.entity_kind_id(name).and_then(|id| self.entity_kind(id))
    }

    /// Looks up an item definition by name.
    #[must_use]
    pub fn item(&self, name: &str) -> Option<&ItemDef> {
        self.items.get(name)
    }

    /// Looks up the furnace recipe for a given input item, if any.
    #[must_use]
    pub fn furnace_recipe(&self, input_item: &str) -> Option<&FurnaceRecipeDef> {
        self.furnace_recipes.get(input_item)
    }

    /// Looks up an assembler recipe by name.
    #[must_use]
    pub fn assembler_recipe(&self, name: &str) -> Option<&AssemblerRecipeDef> {
        self.assembler_recipes.get(name)
    }

    /// Returns whether `entity_name` may be placed on a tile named `tile_name`.
    ///
    /// `tile ∉ forbidden ∧ (allowed is empty ∨ tile ∈ allowed)` (spec.md §4.5).
    #[must_use]
    pub fn can_place(&self, entity_name: &str, tile_name: &str) -> bool {
        let Some(rule) = self.placement_rules.get(entity_name) else {
            return true;
        };
        if rule.forbidden_tiles.contains(tile_name) {
            return false;
        }
        rule.allowed_tiles.is_empty() || rule.allowed_tiles.contains(tile_name)
    }

    /// Looks up a resource kind's patch-generation rule by its catalog name
    /// (e.g. `"iron"`), per spec.md §4.1's `frequency x region_area` model.
    #[must_use]
    pub fn resource_patch_def(&self, kind_name: &str) -> Option<&ResourcePatchDef> {
        self.resource_patches.get(kind_name)
    }

    /// Looks up a biome's terrain/resource-gating definition by name (e.g.
    /// `"plains"`).
    #[must_use]
    pub fn biome_def(&self, biome_name: &str) -> Option<&BiomeDef> {
        self.biomes.get(biome_name)
    }

    /// Reads a constant as an integer, falling back to `default` if absent
    /// or of the wrong type.
    #[must_use]
    pub fn constant_i64(&self, key: &str, default: i64) -> i64 {
        self.constants
            .get(key)
            .and_then(toml::Value::as_integer)
            .unwrap_or(default)
    }

    /// Reads a constant as a float, falling back to `default` if absent or
    /// of the wrong type.
    #[must_use]
    pub fn constant_f64(&self, key: &str, default: f64) -> f64 {
        self.constants
            .get(key)
            .and_then(toml::Value::as_float)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_load() {
        let catalog = Catalog::load_defaults().expect("embedded catalog must parse");
        assert!(catalog.tile_by_name("grass").is_some());
        assert!(catalog.entity_kind_by_name("miner").is_some());
    }

    #[test]
    fn can_place_respects_forbidden_and_allowed() {
        let catalog = Catalog::load_defaults().expect("embedded catalog must parse");
        assert!(!catalog.can_place("miner", "water"));
        assert!(catalog.can_place("miner", "grass"));
    }

    #[test]
    fn furnace_recipe_lookup() {
        let catalog = Catalog::load_defaults().expect("embedded catalog must parse");
        let recipe = catalog.furnace_recipe("iron_ore").expect("iron_ore recipe");
        assert_eq!(recipe.output, "iron_plate");
        assert_eq!(recipe.time, 120);
    }

    #[test]
    fn unknown_entity_falls_back_to_unrestricted_placement() {
        let catalog = Catalog::load_defaults().expect("embedded catalog must parse");
        assert!(catalog.can_place("nonexistent_entity", "stone"));
    }
}
