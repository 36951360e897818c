//! # Lodestone World
//!
//! Deterministic, chunked world generation and storage (spec.md §4.1).
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: the same seed always produces the same world.
//! 2. **Chunked**: the world is generated and stored in fixed-size tile
//!    grids, loaded and evicted independently.
//! 3. **Layered**: biomes come from independent elevation/moisture/
//!    temperature/detail noise channels; resource patches are placed on top.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod biome;
pub mod chunk;
pub mod noise;
pub mod resource;
pub mod store;

pub use biome::{Biome, BiomeClassifier, BiomeThresholds, ClimateSample};
pub use chunk::{Chunk, ChunkCoord, ChunkDecodeError, Tile, CHUNK_SIZE, TILES_PER_CHUNK};
pub use noise::{SimplexNoise, WorldSeed};
pub use resource::{patches_near_region, region_patches, resource_at_tile, RegionCoord, ResourceKind, ResourcePatch, REGION_SIZE};
pub use store::{ChunkBackingStore, ChunkStore, NullBackingStore};
