//! Tunable constants with sane defaults.
//!
//! These are compiled-in fallbacks; `lodestone_catalog::Catalog::constants`
//! is the authoritative, catalog-overridable source at runtime (spec.md §4.5).

/// Default fixed simulation tick rate, in Hz.
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Side length, in tiles, of a chunk.
pub const CHUNK_SIZE: i64 = 32;

/// Area-of-interest radius, in chunks, around a player.
pub const DEFAULT_VIEW_DIST: i64 = 3;

/// Default TCP listen port.
pub const DEFAULT_PORT: u16 = 5555;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default path to the embedded persistence database.
pub const DEFAULT_SAVE_PATH: &str = "./saves/world.db";

/// Interval between periodic persistence flushes.
pub const FLUSH_INTERVAL_SECS: u64 = 30;

/// Maximum stack size for any inventory slot.
pub const MAX_STACK: u32 = 100;

/// Number of slots in a player inventory.
pub const INVENTORY_SLOTS: usize = 40;

/// Reach radius, in tiles, for PICKUP scans.
pub const PICKUP_RADIUS: f64 = 1.5;

/// Idle time with no bytes received before a session is torn down
/// (resolves spec.md §9 Open Question 4; see SPEC_FULL.md §9).
pub const IDLE_TIMEOUT_SECS: u64 = 60;

/// World generation seed used for a brand-new save (`original_source/server/main.py`'s
/// hardcoded default, carried forward for a fresh `world_meta` table).
pub const DEFAULT_WORLD_SEED: u64 = 12345;
