//! # Chunk System
//!
//! World data is organized into fixed-size square chunks (spec.md §4.1):
//! memory-efficient streaming, only nearby chunks loaded, compressed at
//! rest. Adapted from `oroboros_procedural::chunk`'s `ChunkCoord`/
//! compression shape; the 3D voxel block grid and arena-maze generation are
//! discarded in favor of a 2D tile grid with one entry per `(x, y)`.

use bytemuck::{Pod, Zeroable};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};

use lodestone_catalog::TileId;

/// Tile-grid width/height of one chunk, in tiles (spec.md §4.1).
pub const CHUNK_SIZE: usize = 32;

/// Total tiles per chunk.
pub const TILES_PER_CHUNK: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Chunk coordinate, identifying a chunk in the world grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate, in chunks.
    pub cx: i32,
    /// Y coordinate, in chunks.
    pub cy: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    /// Converts world tile coordinates to the chunk that contains them.
    ///
    /// Uses floored (`div_euclid`), not truncating, division so negative
    /// coordinates map to the correct chunk (spec.md §4.1).
    #[inline]
    #[must_use]
    pub const fn from_tile_pos(x: i64, y: i64) -> Self {
        Self {
            cx: x.div_euclid(CHUNK_SIZE as i64) as i32,
            cy: y.div_euclid(CHUNK_SIZE as i64) as i32,
        }
    }

    /// World tile X coordinate of this chunk's origin corner.
    #[inline]
    #[must_use]
    pub const fn origin_x(self) -> i64 {
        self.cx as i64 * CHUNK_SIZE as i64
    }

    /// World tile Y coordinate of this chunk's origin corner.
    #[inline]
    #[must_use]
    pub const fn origin_y(self) -> i64 {
        self.cy as i64 * CHUNK_SIZE as i64
    }

    /// Chebyshev (king-move) distance between two chunks, used for LRU
    /// eviction ranking (spec.md §4.1).
    #[inline]
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> i32 {
        (self.cx - other.cx).abs().max((self.cy - other.cy).abs())
    }
}

/// Splits world tile coordinates into a chunk coordinate and the tile's
/// local offset within that chunk.
#[inline]
#[must_use]
pub const fn to_chunk_local(x: i64, y: i64) -> (ChunkCoord, usize, usize) {
    let coord = ChunkCoord::from_tile_pos(x, y);
    let local_x = x.rem_euclid(CHUNK_SIZE as i64) as usize;
    let local_y = y.rem_euclid(CHUNK_SIZE as i64) as usize;
    (coord, local_x, local_y)
}

/// One tile's catalog kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Tile {
    /// Dense catalog id for the tile's base terrain kind.
    pub tile_id: TileId,
}

/// A chunk of world tile data: a flat `CHUNK_SIZE x CHUNK_SIZE` grid plus a
/// dirty flag tracking unsaved mutations (spec.md §4.1/§4.4).
#[derive(Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk position in the world.
    pub coord: ChunkCoord,
    /// Tile data, row-major, indexed as `[y * CHUNK_SIZE + x]`.
    tiles: Vec<Tile>,
    /// Whether this chunk has been modified since it was loaded or last
    /// flushed to persistence.
    #[serde(skip)]
    pub dirty: bool,
}

impl Chunk {
    /// Creates a new chunk filled with a single tile kind (generation
    /// should immediately overwrite this).
    #[must_use]
    pub fn filled(coord: ChunkCoord, tile_id: TileId) -> Self {
        Self {
            coord,
            tiles: vec![Tile { tile_id }; TILES_PER_CHUNK],
            dirty: true,
        }
    }

    /// Gets the tile at local coordinates `(0..CHUNK_SIZE, 0..CHUNK_SIZE)`.
    ///
    /// # Panics
    ///
    /// Panics if `local_x` or `local_y` is out of range — callers are
    /// expected to have already resolved world coordinates via
    /// [`to_chunk_local`], which always produces in-range offsets.
    #[inline]
    #[must_use]
    pub fn tile(&self, local_x: usize, local_y: usize) -> Tile {
        self.tiles[local_y * CHUNK_SIZE + local_x]
    }

    /// Row-major tile kind ids, for `CHUNK_DATA`'s wire payload (spec.md §4.3).
    #[must_use]
    pub fn tile_ids_row_major(&self) -> Vec<TileId> {
        self.tiles.iter().map(|t| t.tile_id).collect()
    }

    /// Sets the tile at local coordinates, marking the chunk dirty.
    ///
    /// # Panics
    ///
    /// Panics if `local_x` or `local_y` is out of range.
    #[inline]
    pub fn set_tile(&mut self, local_x: usize, local_y: usize, tile: Tile) {
        self.tiles[local_y * CHUNK_SIZE + local_x] = tile;
        self.dirty = true;
    }

    /// LZ4-compresses the chunk's raw tile bytes for persistence storage,
    /// mirroring `oroboros_procedural::Chunk::save_compressed`'s
    /// `bytemuck::cast_slice` + `compress_prepend_size` pipeline.
    #[must_use]
    pub fn to_compressed_bytes(&self) -> Vec<u8> {
        compress_prepend_size(bytemuck::cast_slice::<Tile, u8>(&self.tiles))
    }

    /// Decompresses a chunk blob previously produced by
    /// [`Chunk::to_compressed_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not validly LZ4-compressed, or the
    /// decompressed byte count is not an exact `Tile` multiple of
    /// `TILES_PER_CHUNK`.
    pub fn from_compressed_bytes(coord: ChunkCoord, bytes: &[u8]) -> Result<Self, ChunkDecodeError> {
        let raw = decompress_size_prepended(bytes).map_err(ChunkDecodeError::Decompress)?;
        let expected_bytes = TILES_PER_CHUNK * std::mem::size_of::<Tile>();
        if raw.len() != expected_bytes {
            return Err(ChunkDecodeError::WrongSize(raw.len()));
        }
        let tiles = bytemuck::cast_slice::<u8, Tile>(&raw).to_vec();
        Ok(Self {
            coord,
            tiles,
            dirty: false,
        })
    }
}

/// Errors decoding a persisted chunk blob.
#[derive(Debug, thiserror::Error)]
pub enum ChunkDecodeError {
    /// LZ4 decompression failed (corrupt or truncated blob).
    #[error("chunk decompression failed: {0}")]
    Decompress(lz4_flex::block::DecompressError),
    /// The decompressed byte count was not `TILES_PER_CHUNK` tiles worth.
    #[error("chunk blob is {0} bytes, expected {}", TILES_PER_CHUNK * std::mem::size_of::<Tile>())]
    WrongSize(usize),
}
