//! # Embedded Store
//!
//! A single SQLite file holding the three logical tables spec.md §4.4
//! describes: `chunks`, `world_meta`, `players`. Grounded directly on
//! `original_source/server/persistence.py`'s schema and save/load shape,
//! with two refinements a Rust port earns for free:
//!
//! - `chunks.tiles` and `chunks.entities` are separate BLOB columns instead
//!   of one JSON-encoded dict, so a tile-only flush (the common case) never
//!   has to round-trip entity data it isn't touching.
//! - `players.inventory` is actually populated with an encoded inventory
//!   snapshot. The Python prototype hardcodes this column to `"{}"` and
//!   never restores a saved inventory; spec.md §4.4's literal
//!   `players(id) → {name, x, y, inventory_blob}` contract is treated as
//!   authoritative over that omission.
//!
//! Every write here is an upsert (`ON CONFLICT ... DO UPDATE`), matching
//! the Python source's `INSERT OR REPLACE` semantics without clobbering
//! columns the caller isn't writing this time (notably `chunks`' two blob
//! columns are written independently).

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use lodestone_catalog::Catalog;
use lodestone_inventory::Inventory;
use lodestone_shared::{EntityWire, ItemStackWire, PlayerId};
use lodestone_simulation::entity::Entity;
use lodestone_simulation::registry::EntityRegistry;
use lodestone_world::{Chunk, ChunkBackingStore, ChunkCoord};

use crate::error::PersistenceResult;

/// World-level metadata restored at startup (spec.md §4.4's `world_meta`
/// table: `seed`, `tick`, `next_entity_id`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldMeta {
    /// World generation seed.
    pub seed: u64,
    /// Tick counter to resume from.
    pub tick: u64,
    /// Next id `EntityIdAllocator` should hand out.
    pub next_entity_id: u64,
}

/// A loaded player record (spec.md §4.4's `players` table).
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerRecord {
    /// Display name.
    pub name: String,
    /// Last known x.
    pub x: f64,
    /// Last known y.
    pub y: f64,
    /// Restored inventory.
    pub inventory: Inventory,
}

/// The embedded SQLite-backed store. `rusqlite::Connection` is `Send` but
/// not `Sync`; wrapping it in a `Mutex` is what lets this type satisfy
/// `ChunkBackingStore: Send + Sync` while still exposing only `&self`
/// methods, matching the shared-connection style the rest of the workspace
/// uses `parking_lot` for.
pub struct PersistenceStore {
    conn: Mutex<Connection>,
}

impl PersistenceStore {
    /// Opens (creating if necessary) the SQLite file at `path` and ensures
    /// the schema exists.
    pub fn open(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Opens a private in-memory database. Used by tests and by ephemeral
    /// server runs that opt out of durability.
    pub fn open_in_memory() -> PersistenceResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> PersistenceResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                cx INTEGER NOT NULL,
                cy INTEGER NOT NULL,
                tiles BLOB,
                entities BLOB,
                PRIMARY KEY (cx, cy)
            );
            CREATE TABLE IF NOT EXISTS world_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS players (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                x REAL NOT NULL,
                y REAL NOT NULL,
                inventory BLOB NOT NULL
            );",
        )?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // world_meta
    // ---------------------------------------------------------------

    /// Saves `seed`/`tick`/`next_entity_id`, one row each, at every
    /// periodic flush (spec.md §4.4).
    pub fn save_world_meta(&self, meta: WorldMeta) -> PersistenceResult<()> {
        let conn = self.conn.lock();
        for (key, value) in [
            ("seed", meta.seed),
            ("tick", meta.tick),
            ("next_entity_id", meta.next_entity_id),
        ] {
            conn.execute(
                "INSERT INTO world_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value.to_string()],
            )?;
        }
        Ok(())
    }

    /// Loads world metadata, if a previous save left any. `None` means a
    /// brand-new world: the caller picks a fresh seed and starts from tick 0.
    pub fn load_world_meta(&self) -> PersistenceResult<Option<WorldMeta>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, value FROM world_meta")?;
        let mut rows = stmt.query([])?;

        let (mut seed, mut tick, mut next_entity_id) = (None, None, None);
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            let value: String = row.get(1)?;
            match key.as_str() {
                "seed" => seed = value.parse().ok(),
                "tick" => tick = value.parse().ok(),
                "next_entity_id" => next_entity_id = value.parse().ok(),
                _ => {}
            }
        }

        Ok(match (seed, tick, next_entity_id) {
            (Some(seed), Some(tick), Some(next_entity_id)) => Some(WorldMeta { seed, tick, next_entity_id }),
            _ => None,
        })
    }

    // ---------------------------------------------------------------
    // players
    // ---------------------------------------------------------------

    /// Saves a player's position and inventory, on disconnect and at each
    /// periodic flush (spec.md §4.4).
    pub fn save_player(&self, id: PlayerId, name: &str, x: f64, y: f64, inventory: &Inventory) -> PersistenceResult<()> {
        let blob = rmp_serde::to_vec_named(&inventory.to_wire_slots())?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO players (id, name, x, y, inventory) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, x = excluded.x, y = excluded.y, inventory = excluded.inventory",
            params![id.get() as i64, name, x, y, blob],
        )?;
        Ok(())
    }

    /// Loads a player's saved record by id, e.g. to refresh state for an
    /// already-identified player.
    pub fn load_player(&self, id: PlayerId) -> PersistenceResult<Option<PlayerRecord>> {
        let conn = self.conn.lock();
        let row: Option<(String, f64, f64, Vec<u8>)> = conn
            .query_row(
                "SELECT name, x, y, inventory FROM players WHERE id = ?1",
                params![id.get() as i64],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((name, x, y, blob)) = row else { return Ok(None) };
        let slots: Vec<Option<ItemStackWire>> = rmp_serde::from_slice(&blob)?;
        Ok(Some(PlayerRecord { name, x, y, inventory: Inventory::from_wire_slots(&slots) }))
    }

    /// Looks a player up by display name: the only identity AUTH carries
    /// (spec.md §3, §4.3 — there is no login/password, so "the same
    /// identity" reconnecting means "the same name"). Returns the id
    /// alongside the record so the caller can re-assign it to the new
    /// session instead of minting a fresh one.
    ///
    /// The Python prototype this was ported from never actually exercises
    /// this path: it keys `players` by a per-connection sequential counter
    /// that is never the same across reconnects, so its `load_player` call
    /// at AUTH time is effectively dead code. Spec.md §3's "reloaded on
    /// next AUTH with the same identity" is explicit enough to treat that
    /// as a prototype bug rather than a contract to reproduce; this method
    /// is what actually makes reconnection work.
    pub fn find_player_by_name(&self, name: &str) -> PersistenceResult<Option<(PlayerId, PlayerRecord)>> {
        let conn = self.conn.lock();
        let row: Option<(i64, f64, f64, Vec<u8>)> = conn
            .query_row(
                "SELECT id, x, y, inventory FROM players WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((id, x, y, blob)) = row else { return Ok(None) };
        let slots: Vec<Option<ItemStackWire>> = rmp_serde::from_slice(&blob)?;
        let record = PlayerRecord { name: name.to_string(), x, y, inventory: Inventory::from_wire_slots(&slots) };
        Ok(Some((PlayerId(id as u64), record)))
    }

    /// The highest player id ever saved, or `None` if the `players` table is
    /// empty. Used once at startup to seed a fresh session's player id
    /// allocator past every id a previous run might hand back out via
    /// [`Self::find_player_by_name`].
    pub fn max_player_id(&self) -> PersistenceResult<Option<u64>> {
        let conn = self.conn.lock();
        let max: Option<i64> = conn.query_row("SELECT MAX(id) FROM players", [], |row| row.get(0))?;
        Ok(max.map(|value| value as u64))
    }

    // ---------------------------------------------------------------
    // chunks: entities
    // ---------------------------------------------------------------
    //
    // Entities have no home in `lodestone_world::Chunk` (a tile-only grid)
    // or in `EntityRegistry` (a flat, non-chunk-partitioned map), so this
    // layer is where spec.md §4.4's "chunk serialization includes entities"
    // contract is actually assembled: each chunk row's `entities` column is
    // bucketed independently of its `tiles` column, keyed by
    // `ChunkCoord::from_tile_pos` on every entity's position.

    /// Overwrites the persisted entity list for one chunk.
    pub fn save_chunk_entities(&self, coord: ChunkCoord, entities: &[EntityWire]) -> PersistenceResult<()> {
        let blob = rmp_serde::to_vec_named(entities)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chunks (cx, cy, entities) VALUES (?1, ?2, ?3)
             ON CONFLICT(cx, cy) DO UPDATE SET entities = excluded.entities",
            params![coord.cx, coord.cy, blob],
        )?;
        Ok(())
    }

    /// Saves every entity in `registry`, bucketed by the chunk under it, for
    /// each of `loaded_chunks` — chunks with no entities this round still get
    /// written (with an empty list), clearing out anything stale from a
    /// previous flush. Called at shutdown and on the periodic flush timer,
    /// alongside `ChunkStore::flush_dirty`.
    ///
    /// # Errors
    ///
    /// Returns the first encoding or SQLite failure; chunks already written
    /// earlier in the loop stay written (no transaction spans the whole
    /// call — a single bad chunk shouldn't roll back everyone else's save).
    pub fn save_all_entities(&self, registry: &EntityRegistry, catalog: &Catalog, loaded_chunks: &[ChunkCoord]) -> PersistenceResult<()> {
        let mut buckets: HashMap<ChunkCoord, Vec<EntityWire>> = HashMap::new();
        for id in registry.all_ids() {
            let Some(entity) = registry.get(id) else { continue };
            let wire = entity.to_wire(catalog);
            buckets.entry(ChunkCoord::from_tile_pos(entity.x, entity.y)).or_default().push(wire);
        }

        for &coord in loaded_chunks {
            let entities = buckets.remove(&coord).unwrap_or_default();
            self.save_chunk_entities(coord, &entities)?;
        }
        Ok(())
    }

    /// Loads every persisted entity across every chunk row, for restoring
    /// `EntityRegistry` at startup. There is no per-chunk lazy entity
    /// loading in this design — the registry is one flat in-memory map
    /// regardless of which chunks are currently resident, so the whole
    /// world's entities are restored once, up front.
    pub fn load_all_entities(&self, catalog: &Catalog) -> PersistenceResult<Vec<Entity>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT entities FROM chunks WHERE entities IS NOT NULL")?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let blob: Vec<u8> = row.get(0)?;
            let wires: Vec<EntityWire> = rmp_serde::from_slice(&blob)?;
            for wire in &wires {
                match Entity::from_wire(wire, catalog) {
                    Some(entity) => out.push(entity),
                    None => tracing::warn!(id = wire.id.get(), kind = %wire.kind, "dropping persisted entity of unknown kind"),
                }
            }
        }
        Ok(out)
    }
}

impl ChunkBackingStore for PersistenceStore {
    fn load_chunk(&self, coord: ChunkCoord) -> Option<Chunk> {
        let conn = self.conn.lock();
        let tiles: Option<Vec<u8>> = conn
            .query_row(
                "SELECT tiles FROM chunks WHERE cx = ?1 AND cy = ?2 AND tiles IS NOT NULL",
                params![coord.cx, coord.cy],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten();

        match tiles.map(|bytes| Chunk::from_compressed_bytes(coord, &bytes)) {
            Some(Ok(chunk)) => Some(chunk),
            Some(Err(err)) => {
                tracing::error!(cx = coord.cx, cy = coord.cy, %err, "discarding corrupt chunk blob");
                None
            }
            None => None,
        }
    }

    fn save_chunk(&self, chunk: &Chunk) {
        let bytes = chunk.to_compressed_bytes();
        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO chunks (cx, cy, tiles) VALUES (?1, ?2, ?3)
             ON CONFLICT(cx, cy) DO UPDATE SET tiles = excluded.tiles",
            params![chunk.coord.cx, chunk.coord.cy, bytes],
        );
        if let Err(err) = result {
            tracing::error!(cx = chunk.coord.cx, cy = chunk.coord.cy, %err, "failed to save chunk");
        }
    }
}

#[cfg(test)]
mod tests {
    use lodestone_catalog::Catalog;
    use lodestone_shared::Direction;
    use lodestone_world::Tile;

    use super::*;

    fn catalog() -> Catalog {
        Catalog::load_defaults().expect("embedded catalog")
    }

    #[test]
    fn world_meta_round_trips() {
        let store = PersistenceStore::open_in_memory().unwrap();
        assert!(store.load_world_meta().unwrap().is_none());

        store.save_world_meta(WorldMeta { seed: 42, tick: 100, next_entity_id: 7 }).unwrap();
        let meta = store.load_world_meta().unwrap().unwrap();
        assert_eq!(meta, WorldMeta { seed: 42, tick: 100, next_entity_id: 7 });

        store.save_world_meta(WorldMeta { seed: 42, tick: 200, next_entity_id: 9 }).unwrap();
        let meta = store.load_world_meta().unwrap().unwrap();
        assert_eq!(meta.tick, 200);
        assert_eq!(meta.next_entity_id, 9);
    }

    #[test]
    fn player_round_trips_with_inventory() {
        let store = PersistenceStore::open_in_memory().unwrap();
        let mut inventory = Inventory::new();
        inventory.add("iron_ore", 12);

        store.save_player(PlayerId(1), "astrid", 3.5, -2.0, &inventory).unwrap();
        let record = store.load_player(PlayerId(1)).unwrap().unwrap();

        assert_eq!(record.name, "astrid");
        assert_eq!(record.x, 3.5);
        assert_eq!(record.y, -2.0);
        assert_eq!(record.inventory.count_item("iron_ore"), 12);
    }

    #[test]
    fn unknown_player_loads_as_none() {
        let store = PersistenceStore::open_in_memory().unwrap();
        assert!(store.load_player(PlayerId(999)).unwrap().is_none());
    }

    #[test]
    fn find_player_by_name_recovers_the_same_id() {
        let store = PersistenceStore::open_in_memory().unwrap();
        let mut inventory = Inventory::new();
        inventory.add("iron_ore", 4);
        store.save_player(PlayerId(7), "astrid", 10.0, 20.0, &inventory).unwrap();

        let (id, record) = store.find_player_by_name("astrid").unwrap().unwrap();
        assert_eq!(id, PlayerId(7));
        assert_eq!(record.x, 10.0);
        assert_eq!(record.inventory.count_item("iron_ore"), 4);

        assert!(store.find_player_by_name("nobody").unwrap().is_none());
    }

    #[test]
    fn max_player_id_tracks_the_highest_saved_id() {
        let store = PersistenceStore::open_in_memory().unwrap();
        assert_eq!(store.max_player_id().unwrap(), None);

        let inventory = Inventory::new();
        store.save_player(PlayerId(3), "a", 0.0, 0.0, &inventory).unwrap();
        store.save_player(PlayerId(11), "b", 0.0, 0.0, &inventory).unwrap();
        store.save_player(PlayerId(5), "c", 0.0, 0.0, &inventory).unwrap();

        assert_eq!(store.max_player_id().unwrap(), Some(11));
    }

    #[test]
    fn chunk_backing_store_round_trips_tiles() {
        let catalog = catalog();
        let grass = catalog.tile_id("grass").unwrap();
        let store = PersistenceStore::open_in_memory().unwrap();
        let coord = ChunkCoord::new(2, -3);

        assert!(store.load_chunk(coord).is_none());

        let mut chunk = Chunk::filled(coord, grass);
        chunk.set_tile(0, 0, Tile { tile_id: grass });
        store.save_chunk(&chunk);

        let loaded = store.load_chunk(coord).expect("just saved");
        assert_eq!(loaded.tile(0, 0), Tile { tile_id: grass });
    }

    #[test]
    fn entities_are_bucketed_by_chunk_and_restored() {
        let catalog = catalog();
        let store = PersistenceStore::open_in_memory().unwrap();

        let mut registry = EntityRegistry::new(1);
        let kind = catalog.entity_kind_id("chest").unwrap();
        registry
            .place(|id| Entity::new(id, kind, 5, 5, Direction::North, lodestone_simulation::entity::EntityState::new_chest()))
            .unwrap();
        registry
            .place(|id| Entity::new(id, kind, 40, 40, Direction::North, lodestone_simulation::entity::EntityState::new_chest()))
            .unwrap();

        let near_origin = ChunkCoord::from_tile_pos(5, 5);
        let far = ChunkCoord::from_tile_pos(40, 40);
        store.save_all_entities(&registry, &catalog, &[near_origin, far]).unwrap();

        let restored = store.load_all_entities(&catalog).unwrap();
        assert_eq!(restored.len(), 2);
        assert!(restored.iter().any(|e| (e.x, e.y) == (5, 5)));
        assert!(restored.iter().any(|e| (e.x, e.y) == (40, 40)));
    }

    #[test]
    fn saving_with_fewer_entities_clears_the_stale_ones() {
        let catalog = catalog();
        let store = PersistenceStore::open_in_memory().unwrap();
        let coord = ChunkCoord::from_tile_pos(0, 0);

        let mut registry = EntityRegistry::new(1);
        let kind = catalog.entity_kind_id("chest").unwrap();
        registry
            .place(|id| Entity::new(id, kind, 0, 0, Direction::North, lodestone_simulation::entity::EntityState::new_chest()))
            .unwrap();
        store.save_all_entities(&registry, &catalog, &[coord]).unwrap();
        assert_eq!(store.load_all_entities(&catalog).unwrap().len(), 1);

        let empty_registry = EntityRegistry::new(1);
        store.save_all_entities(&empty_registry, &catalog, &[coord]).unwrap();
        assert_eq!(store.load_all_entities(&catalog).unwrap().len(), 0);
    }

    #[test]
    fn a_saved_file_survives_reopening_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.db");

        {
            let store = PersistenceStore::open(&path).unwrap();
            store.save_world_meta(WorldMeta { seed: 1, tick: 30, next_entity_id: 2 }).unwrap();
        }

        let reopened = PersistenceStore::open(&path).unwrap();
        assert_eq!(reopened.load_world_meta().unwrap().unwrap().tick, 30);
    }
}
