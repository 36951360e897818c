//! # Chunk Store
//!
//! Owns the set of currently-loaded chunks, generates new ones on demand,
//! and evicts chunks that have fallen outside every tracked player's
//! eviction radius (spec.md §4.1/§4.4). Exclusively owned by the
//! simulation worker thread (spec.md §5) — no internal locking.

use std::collections::HashMap;
use std::sync::Arc;

use lodestone_catalog::Catalog;

use crate::biome::{BiomeClassifier, BiomeThresholds};
use crate::chunk::{to_chunk_local, Chunk, ChunkCoord, Tile, CHUNK_SIZE};
use crate::noise::WorldSeed;
use crate::resource::{patches_near_region, resource_at_tile, RegionCoord};

/// Durable backing for chunk data, implemented by `lodestone_persistence`.
/// Kept as a trait so `lodestone_world` never depends on the persistence
/// crate directly — the server binary wires a concrete implementation in.
pub trait ChunkBackingStore: Send + Sync {
    /// Loads a previously-saved chunk, if one exists.
    fn load_chunk(&self, coord: ChunkCoord) -> Option<Chunk>;
    /// Persists a dirty chunk. Called on eviction and periodic flush.
    fn save_chunk(&self, chunk: &Chunk);
}

impl<T: ChunkBackingStore + ?Sized> ChunkBackingStore for Arc<T> {
    fn load_chunk(&self, coord: ChunkCoord) -> Option<Chunk> {
        (**self).load_chunk(coord)
    }

    fn save_chunk(&self, chunk: &Chunk) {
        (**self).save_chunk(chunk);
    }
}

/// A backing store that never has anything saved — every chunk is
/// freshly generated and never persisted. Used by tests and ephemeral
/// worlds.
#[derive(Default)]
pub struct NullBackingStore;

impl ChunkBackingStore for NullBackingStore {
    fn load_chunk(&self, _coord: ChunkCoord) -> Option<Chunk> {
        None
    }

    fn save_chunk(&self, _chunk: &Chunk) {}
}

/// Owns loaded chunks, generates missing ones, and evicts far-away ones.
pub struct ChunkStore {
    seed: WorldSeed,
    classifier: BiomeClassifier,
    catalog: Arc<Catalog>,
    eviction_radius: i32,
    default_tile: lodestone_catalog::TileId,
    chunks: HashMap<ChunkCoord, Chunk>,
    backing: Box<dyn ChunkBackingStore>,
}

impl ChunkStore {
    /// Creates a store over an empty chunk cache, reading its biome
    /// thresholds and eviction radius from the catalog's `constants` table.
    #[must_use]
    pub fn new(seed: WorldSeed, catalog: Arc<Catalog>, backing: Box<dyn ChunkBackingStore>) -> Self {
        let thresholds = BiomeThresholds {
            sea_level: catalog.constant_f64("sea_level", 0.0),
            beach_threshold: catalog.constant_f64("beach_threshold", 0.05),
            mountain_threshold: catalog.constant_f64("mountain_threshold", 0.6),
        };
        let eviction_radius = catalog.constant_i64("eviction_radius", 5) as i32;
        let default_tile = catalog.tile_id("grass").unwrap_or(0);
        Self {
            classifier: BiomeClassifier::new(seed, thresholds),
            seed,
            catalog,
            eviction_radius,
            default_tile,
            chunks: HashMap::new(),
            backing,
        }
    }

    /// Returns the chunk at `coord`, loading it from the backing store or
    /// generating it if this is the first time it has been needed.
    pub fn ensure_chunk(&mut self, coord: ChunkCoord) -> &Chunk {
        if !self.chunks.contains_key(&coord) {
            let chunk = self
                .backing
                .load_chunk(coord)
                .unwrap_or_else(|| self.generate_chunk(coord));
            self.chunks.insert(coord, chunk);
        }
        self.chunks.get(&coord).expect("chunk was just inserted")
    }

    /// Returns a chunk only if it is already loaded, without generating or
    /// loading it.
    #[must_use]
    pub fn loaded_chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Returns the tile at world coordinates `(x, y)`, loading/generating
    /// its chunk if needed.
    pub fn tile_at(&mut self, x: i64, y: i64) -> Tile {
        let (coord, local_x, local_y) = to_chunk_local(x, y);
        self.ensure_chunk(coord).tile(local_x, local_y)
    }

    /// Generates a chunk's terrain from noise and resource patches: each
    /// tile's biome picks a base-or-secondary terrain kind, then a resource
    /// patch (if any covers that tile and the biome allows that resource
    /// kind) overrides it with an ore tile, as long as the resolved terrain
    /// is walkable (ore never replaces water).
    fn generate_chunk(&self, coord: ChunkCoord) -> Chunk {
        let region = RegionCoord::from_tile_pos(coord.origin_x(), coord.origin_y());
        let patches = patches_near_region(self.seed, region, &self.catalog);

        let mut chunk = Chunk::filled(coord, self.default_tile);

        for local_y in 0..CHUNK_SIZE {
            for local_x in 0..CHUNK_SIZE {
                let x = coord.origin_x() + local_x as i64;
                let y = coord.origin_y() + local_y as i64;

                let biome = self.classifier.classify_at(x as f64, y as f64);
                let terrain_tile_name = self.classifier.terrain_tile_name(biome, &self.catalog, x, y);
                let terrain_walkable = self
                    .catalog
                    .tile_by_name(terrain_tile_name)
                    .is_some_and(|t| t.walkable);

                let tile_name = if terrain_walkable {
                    let shape_noise = self.classifier.shape_noise_at(x as f64, y as f64);
                    let detail_noise = self.classifier.detail_at(x as f64, y as f64);
                    let candidate_resources = self.catalog.biome_def(biome.catalog_name()).map(|def| &def.candidate_resources);
                    let is_candidate = |kind: crate::resource::ResourceKind| {
                        candidate_resources.is_some_and(|list| list.iter().any(|s| s == kind.catalog_key()))
                    };
                    resource_at_tile(&patches, x, y, shape_noise, detail_noise, is_candidate)
                        .map_or(terrain_tile_name, |resource| resource.ore_tile_name())
                } else {
                    terrain_tile_name
                };

                let tile_id = self.catalog.tile_id(tile_name).unwrap_or(self.default_tile);
                chunk.set_tile(local_x, local_y, Tile { tile_id });
            }
        }

        chunk
    }

    /// Evicts every loaded chunk whose Chebyshev distance from all
    /// `tracked_positions` exceeds the catalog's `eviction_radius`,
    /// write-through flushing it first if dirty (spec.md §4.1/§4.4).
    ///
    /// `tracked_positions` are world tile coordinates of players the
    /// server currently has loaded; an empty list evicts everything.
    pub fn evict_far_chunks(&mut self, tracked_positions: &[(i64, i64)]) {
        let tracked_chunks: Vec<ChunkCoord> = tracked_positions
            .iter()
            .map(|&(x, y)| ChunkCoord::from_tile_pos(x, y))
            .collect();

        let to_evict: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .copied()
            .filter(|coord| {
                tracked_chunks
                    .iter()
                    .all(|player_chunk| coord.chebyshev_distance(*player_chunk) > self.eviction_radius)
            })
            .collect();

        for coord in to_evict {
            if let Some(chunk) = self.chunks.remove(&coord) {
                if chunk.dirty {
                    self.backing.save_chunk(&chunk);
                }
            }
        }
    }

    /// Flushes every dirty loaded chunk to the backing store without
    /// evicting it, used for the periodic save and shutdown flush
    /// (spec.md §4.4).
    pub fn flush_dirty(&mut self) {
        for chunk in self.chunks.values_mut() {
            if chunk.dirty {
                self.backing.save_chunk(chunk);
                chunk.dirty = false;
            }
        }
    }

    /// Number of chunks currently resident in memory.
    #[must_use]
    pub fn loaded_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// World coordinates of every chunk currently resident in memory, for
    /// `lodestone_persistence`'s periodic entity flush: chunks carry no
    /// entities of their own (those live in `EntityRegistry`), so the
    /// persistence layer buckets entities by the chunk under them and needs
    /// to know which chunks are actually loaded to flush against.
    #[must_use]
    pub fn loaded_chunk_coords(&self) -> Vec<ChunkCoord> {
        self.chunks.keys().copied().collect()
    }
}
