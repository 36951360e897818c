//! Process-wide entity index: `id → Entity` plus `(x, y) → id` for O(1)
//! occupancy lookups.
//!
//! Kept in `lodestone_simulation` rather than `lodestone_world::ChunkStore` so
//! that `lodestone_world` never needs to know about entities, avoiding a
//! dependency from world generation back onto simulation types.

use std::collections::HashMap;

use lodestone_shared::{EntityId, EntityIdAllocator};

use crate::entity::Entity;
use crate::error::{SimulationError, SimulationResult};

/// Owns every placed entity and the spatial index used to enforce "at most
/// one entity per tile" (spec.md §3).
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<EntityId, Entity>,
    by_tile: HashMap<(i64, i64), EntityId>,
    allocator: EntityIdAllocator,
}

impl EntityRegistry {
    /// Creates an empty registry whose next allocated id is `next_id`
    /// (resumed from persistence, or `1` for a fresh world).
    #[must_use]
    pub fn new(next_id: u64) -> Self {
        Self { entities: HashMap::new(), by_tile: HashMap::new(), allocator: EntityIdAllocator::starting_at(next_id) }
    }

    /// The id that will be handed to the next placed entity, for persistence.
    #[must_use]
    pub fn peek_next_id(&self) -> u64 {
        self.allocator.peek_next()
    }

    /// Returns the entity at `(x, y)`, if any.
    #[must_use]
    pub fn entity_at(&self, x: i64, y: i64) -> Option<&Entity> {
        self.by_tile.get(&(x, y)).and_then(|id| self.entities.get(id))
    }

    /// Returns a mutable reference to the entity at `(x, y)`, if any.
    pub fn entity_at_mut(&mut self, x: i64, y: i64) -> Option<&mut Entity> {
        let id = *self.by_tile.get(&(x, y))?;
        self.entities.get_mut(&id)
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Looks up an entity by id, mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Returns every entity whose tile lies within `radius` (inclusive,
    /// Euclidean) of `(x, y)`. Used by PICKUP (spec.md §4.6).
    pub fn entities_in_radius(&self, x: f64, y: f64, radius: f64) -> Vec<&Entity> {
        let radius_sq = radius * radius;
        self.entities
            .values()
            .filter(|e| {
                let dx = e.x as f64 - x;
                let dy = e.y as f64 - y;
                dx * dx + dy * dy <= radius_sq
            })
            .collect()
    }

    /// Registers a freshly-built entity, allocating its id.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::TileOccupied`] if `(entity.x, entity.y)`
    /// already holds an entity (the caller must check placement legality,
    /// including occupancy, before calling this).
    pub fn place(&mut self, build: impl FnOnce(EntityId) -> Entity) -> SimulationResult<EntityId> {
        let id = self.allocator.next();
        let entity = build(id);
        let tile = (entity.x, entity.y);
        if let Some(existing) = self.by_tile.get(&tile) {
            return Err(SimulationError::TileOccupied { x: tile.0, y: tile.1, existing: *existing });
        }
        self.by_tile.insert(tile, id);
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Restores a previously-persisted entity verbatim, without allocating a
    /// new id (the entity already carries one).
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::TileOccupied`] if its tile is already taken.
    pub fn restore(&mut self, entity: Entity) -> SimulationResult<()> {
        let tile = (entity.x, entity.y);
        if let Some(existing) = self.by_tile.get(&tile) {
            return Err(SimulationError::TileOccupied { x: tile.0, y: tile.1, existing: *existing });
        }
        self.by_tile.insert(tile, entity.id);
        self.entities.insert(entity.id, entity);
        Ok(())
    }

    /// Removes an entity. Its buffered items dissolve with it (spec.md §9
    /// Open Question decision 2).
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownEntity`] if `id` is not registered.
    pub fn remove(&mut self, id: EntityId) -> SimulationResult<Entity> {
        let entity = self.entities.remove(&id).ok_or(SimulationError::UnknownEntity(id))?;
        self.by_tile.remove(&(entity.x, entity.y));
        Ok(entity)
    }

    /// Temporarily removes an entity so the tick can hold an owned, non-
    /// aliasing reference to it alongside another entity fetched from the
    /// same map (the classic `HashMap` double-`get_mut` problem). The caller
    /// must reinsert it with [`Self::put_back`] before the tick ends.
    pub fn take(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.by_tile.remove(&(entity.x, entity.y));
        Some(entity)
    }

    /// Reinserts an entity previously removed via [`Self::take`]. Infallible:
    /// the matching `take` just vacated this entity's own tile.
    pub fn put_back(&mut self, entity: Entity) {
        self.by_tile.insert((entity.x, entity.y), entity.id);
        self.entities.insert(entity.id, entity);
    }

    /// Iterates every registered entity's id, snapshotting the set up front
    /// so the tick loop may mutate entities while iterating (mirrors
    /// `original_source/server/simulation.py`'s `list(chunk.entities.values())`
    /// defensive copy).
    #[must_use]
    pub fn all_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Total number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use lodestone_catalog::EntityKindId;
    use lodestone_shared::Direction;

    use super::*;
    use crate::entity::EntityState;

    fn miner_at(x: i64, y: i64) -> impl FnOnce(EntityId) -> Entity {
        move |id| Entity::new(id, 0 as EntityKindId, x, y, Direction::East, EntityState::new_miner())
    }

    #[test]
    fn place_allocates_strictly_increasing_ids() {
        let mut registry = EntityRegistry::new(1);
        let a = registry.place(miner_at(0, 0)).unwrap();
        let b = registry.place(miner_at(1, 0)).unwrap();
        assert!(a.get() < b.get());
    }

    #[test]
    fn place_rejects_occupied_tile() {
        let mut registry = EntityRegistry::new(1);
        registry.place(miner_at(5, 5)).unwrap();
        let err = registry.place(miner_at(5, 5)).unwrap_err();
        assert!(matches!(err, SimulationError::TileOccupied { x: 5, y: 5, .. }));
    }

    #[test]
    fn remove_frees_the_tile() {
        let mut registry = EntityRegistry::new(1);
        let id = registry.place(miner_at(2, 2)).unwrap();
        registry.remove(id).unwrap();
        assert!(registry.entity_at(2, 2).is_none());
        registry.place(miner_at(2, 2)).unwrap();
    }

    #[test]
    fn entities_in_radius_filters_by_distance() {
        let mut registry = EntityRegistry::new(1);
        registry.place(miner_at(0, 0)).unwrap();
        registry.place(miner_at(10, 10)).unwrap();
        let nearby = registry.entities_in_radius(0.0, 0.0, 1.5);
        assert_eq!(nearby.len(), 1);
    }
}
