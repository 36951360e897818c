//! Per-kind tick updaters (spec.md §4.2). Each entity is taken out of the
//! registry for the duration of its own update so that the destination or
//! source entity it interacts with can be borrowed independently — the usual
//! way to sidestep two simultaneous `&mut` borrows into the same `HashMap`.

use std::collections::HashSet;

use lodestone_catalog::Catalog;
use lodestone_shared::EntityId;
use lodestone_world::ChunkStore;

use crate::entity::{BufferItem, Entity, EntityState};
use crate::registry::EntityRegistry;
use crate::rules::{can_insert, try_extract, try_insert};

/// Runs one entity's per-kind update for this tick.
pub fn update_entity(
    id: EntityId,
    registry: &mut EntityRegistry,
    world: &mut ChunkStore,
    catalog: &Catalog,
    dirty: &mut HashSet<EntityId>,
) {
    let Some(mut entity) = registry.take(id) else { return };
    match &entity.state {
        EntityState::Miner { .. } => update_miner(&mut entity, registry, world, catalog, dirty),
        EntityState::Furnace { .. } => update_furnace(&mut entity, registry, catalog, dirty),
        EntityState::Assembler { .. } => update_assembler(&mut entity, registry, catalog, dirty),
        EntityState::Conveyor { .. } => update_conveyor(&mut entity, registry, catalog, dirty),
        EntityState::Inserter { .. } => update_inserter(&mut entity, registry, catalog, dirty),
        EntityState::Chest { .. } => {}
    }
    registry.put_back(entity);
}

/// Peeks the head of `output`; if it can be inserted into `dest`, pops it for
/// real and reports success. Leaves `output` untouched on refusal.
fn eject_head(output: &mut std::collections::VecDeque<BufferItem>, dest: &mut Entity, catalog: &Catalog) -> bool {
    let Some(head) = output.front() else { return false };
    let item = head.clone();
    if try_insert(dest, item, catalog) {
        output.pop_front();
        true
    } else {
        false
    }
}

/// Attempts to eject the head of `entity`'s output buffer onto its
/// downstream tile, marking both sides dirty on success. Shared by
/// MINER/FURNACE/ASSEMBLER, whose ejection step is identical.
fn eject_downstream(
    entity: &mut Entity,
    registry: &mut EntityRegistry,
    catalog: &Catalog,
    dirty: &mut HashSet<EntityId>,
    take_output: impl Fn(&mut EntityState) -> &mut std::collections::VecDeque<BufferItem>,
) {
    let (dx, dy) = entity.downstream_tile();
    let Some(dest_id) = registry.entity_at(dx, dy).map(|e| e.id) else { return };
    let Some(mut dest) = registry.take(dest_id) else { return };

    let ejected = eject_head(take_output(&mut entity.state), &mut dest, catalog);
    if ejected {
        dirty.insert(entity.id);
        dirty.insert(dest.id);
    }
    registry.put_back(dest);
}

fn update_miner(
    entity: &mut Entity,
    registry: &mut EntityRegistry,
    world: &mut ChunkStore,
    catalog: &Catalog,
    dirty: &mut HashSet<EntityId>,
) {
    {
        let EntityState::Miner { cooldown, .. } = &mut entity.state else { return };
        if *cooldown > 0 {
            *cooldown -= 1;
        }
    }

    let has_output = matches!(&entity.state, EntityState::Miner { output, .. } if !output.is_empty());
    if has_output {
        eject_downstream(entity, registry, catalog, dirty, |state| {
            let EntityState::Miner { output, .. } = state else { unreachable!("kind checked by caller") };
            output
        });
    }

    let cooldown_elapsed = matches!(&entity.state, EntityState::Miner { cooldown, .. } if *cooldown == 0);
    if !cooldown_elapsed {
        return;
    }

    let tile = world.tile_at(entity.x, entity.y);
    let Some(resource) = catalog.tile(tile.tile_id).and_then(|t| t.resource_item.clone()) else { return };

    let def = catalog.entity_kind(entity.kind);
    let capacity = def.map_or(10, |d| d.buffer_size) as usize;
    let miner_cooldown = def.map_or(60, |d| d.cooldown);

    let EntityState::Miner { output, cooldown } = &mut entity.state else { unreachable!() };
    if output.len() < capacity {
        output.push_back(BufferItem::new(resource));
        *cooldown = miner_cooldown;
        dirty.insert(entity.id);
    }
}

fn update_furnace(entity: &mut Entity, registry: &mut EntityRegistry, catalog: &Catalog, dirty: &mut HashSet<EntityId>) {
    {
        let EntityState::Furnace { cooldown, .. } = &mut entity.state else { return };
        if *cooldown > 0 {
            *cooldown -= 1;
        }
    }

    let has_output = matches!(&entity.state, EntityState::Furnace { output, .. } if !output.is_empty());
    if has_output {
        eject_downstream(entity, registry, catalog, dirty, |state| {
            let EntityState::Furnace { output, .. } = state else { unreachable!("kind checked by caller") };
            output
        });
    }

    let ready = matches!(&entity.state, EntityState::Furnace { cooldown, input, .. } if *cooldown == 0 && !input.is_empty());
    if !ready {
        return;
    }

    let output_capacity = catalog.entity_kind(entity.kind).map_or(10, |d| d.output_buffer_size) as usize;
    let output_has_room = matches!(&entity.state, EntityState::Furnace { output, .. } if output.len() < output_capacity);
    if !output_has_room {
        return;
    }

    let head_item = if let EntityState::Furnace { input, .. } = &entity.state { input.front().cloned() } else { None };
    let Some(head_item) = head_item else { return };
    let Some(recipe) = catalog.furnace_recipe(&head_item.item).cloned() else { return };

    let EntityState::Furnace { input, output, cooldown } = &mut entity.state else { unreachable!() };
    input.pop_front();
    for _ in 0..recipe.count {
        output.push_back(BufferItem::new(recipe.output.clone()));
    }
    *cooldown = recipe.time;
    dirty.insert(entity.id);
}

fn update_assembler(entity: &mut Entity, registry: &mut EntityRegistry, catalog: &Catalog, dirty: &mut HashSet<EntityId>) {
    {
        let EntityState::Assembler { cooldown, .. } = &mut entity.state else { return };
        if *cooldown > 0 {
            *cooldown -= 1;
        }
    }

    let has_output = matches!(&entity.state, EntityState::Assembler { output, .. } if !output.is_empty());
    if has_output {
        eject_downstream(entity, registry, catalog, dirty, |state| {
            let EntityState::Assembler { output, .. } = state else { unreachable!("kind checked by caller") };
            output
        });
    }

    let recipe_name = if let EntityState::Assembler { recipe, .. } = &entity.state { recipe.clone() } else { None };
    let Some(recipe_name) = recipe_name else { return };
    let Some(recipe) = catalog.assembler_recipe(&recipe_name).cloned() else { return };

    let output_capacity = catalog.entity_kind(entity.kind).map_or(10, |d| d.output_buffer_size) as usize;
    let ready =
        matches!(&entity.state, EntityState::Assembler { cooldown, output, .. } if *cooldown == 0 && output.len() < output_capacity);
    if !ready {
        return;
    }

    let has_ingredients = if let EntityState::Assembler { input, .. } = &entity.state {
        recipe
            .ingredients
            .iter()
            .all(|(name, needed)| input.iter().filter(|i| &i.item == name).count() as u32 >= *needed)
    } else {
        false
    };
    if !has_ingredients {
        return;
    }

    let EntityState::Assembler { input, output, cooldown, .. } = &mut entity.state else { unreachable!() };
    for (ingredient, needed) in &recipe.ingredients {
        let mut removed = 0u32;
        input.retain(|item| {
            if &item.item == ingredient && removed < *needed {
                removed += 1;
                false
            } else {
                true
            }
        });
    }
    for _ in 0..recipe.count {
        output.push_back(BufferItem::new(recipe.result.clone()));
    }
    *cooldown = recipe.time;
    dirty.insert(entity.id);
}

fn update_conveyor(entity: &mut Entity, registry: &mut EntityRegistry, catalog: &Catalog, dirty: &mut HashSet<EntityId>) {
    let speed = catalog.entity_kind(entity.kind).map_or(0.02, |d| d.speed);
    let (dx, dy) = entity.downstream_tile();

    let has_items = matches!(&entity.state, EntityState::Conveyor { items } if !items.is_empty());
    if !has_items {
        return;
    }

    {
        let EntityState::Conveyor { items } = &mut entity.state else { unreachable!() };
        for item in items.iter_mut() {
            item.progress += speed;
        }
    }
    dirty.insert(entity.id);

    loop {
        let ready_index = match &entity.state {
            EntityState::Conveyor { items } => items.iter().position(|i| i.progress >= 1.0),
            _ => None,
        };
        let Some(index) = ready_index else { break };

        let item = match &entity.state {
            EntityState::Conveyor { items } => items[index].clone(),
            _ => unreachable!(),
        };

        let dest_id = registry.entity_at(dx, dy).map(|e| e.id);
        let mut transferred = false;
        if let Some(dest_id) = dest_id {
            if let Some(mut dest) = registry.take(dest_id) {
                transferred = try_insert(&mut dest, BufferItem::new(item.item), catalog);
                if transferred {
                    dirty.insert(dest.id);
                }
                registry.put_back(dest);
            }
        }

        let EntityState::Conveyor { items } = &mut entity.state else { unreachable!() };
        if transferred {
            items.remove(index);
        } else {
            items[index].progress = 0.99;
        }
    }
}

fn update_inserter(entity: &mut Entity, registry: &mut EntityRegistry, catalog: &Catalog, dirty: &mut HashSet<EntityId>) {
    let def = catalog.entity_kind(entity.kind);
    let animation_speed = def.map_or(0.05, |d| d.animation_speed);
    let inserter_cooldown = def.map_or(20, |d| d.cooldown);

    let (dx, dy) = entity.downstream_tile();
    let (sx, sy) = entity.upstream_tile();
    let dest_id = registry.entity_at(dx, dy).map(|e| e.id);
    let source_id = registry.entity_at(sx, sy).map(|e| e.id);

    let holding = matches!(&entity.state, EntityState::Inserter { held_item: Some(_), .. });
    if holding {
        if dest_id.is_none() {
            return_held_item(entity, source_id, registry, catalog, dirty);
            reset_inserter(entity, inserter_cooldown);
            dirty.insert(entity.id);
            return;
        }

        {
            let EntityState::Inserter { progress, .. } = &mut entity.state else { unreachable!() };
            *progress += animation_speed;
        }
        dirty.insert(entity.id);

        let animation_done = matches!(&entity.state, EntityState::Inserter { progress, .. } if *progress >= 1.0);
        if animation_done {
            let held = if let EntityState::Inserter { held_item, .. } = &entity.state { held_item.clone() } else { None };
            let mut delivered = false;
            if let (Some(held), Some(dest_id)) = (held, dest_id) {
                if let Some(mut dest) = registry.take(dest_id) {
                    delivered = try_insert(&mut dest, held, catalog);
                    if delivered {
                        dirty.insert(dest.id);
                    }
                    registry.put_back(dest);
                }
            }
            if !delivered {
                return_held_item(entity, source_id, registry, catalog, dirty);
            }
            reset_inserter(entity, inserter_cooldown);
            dirty.insert(entity.id);
        }
        return;
    }

    let cooldown_active = matches!(&entity.state, EntityState::Inserter { cooldown, .. } if *cooldown > 0);
    if cooldown_active {
        let EntityState::Inserter { cooldown, .. } = &mut entity.state else { unreachable!() };
        *cooldown -= 1;
        return;
    }

    let (Some(dest_id), Some(source_id)) = (dest_id, source_id) else { return };

    let Some(dest) = registry.take(dest_id) else { return };
    let destination_has_room = can_insert(&dest, catalog);
    registry.put_back(dest);
    if !destination_has_room {
        return;
    }

    let Some(mut source) = registry.take(source_id) else { return };
    let item = try_extract(&mut source);
    registry.put_back(source);

    let Some(item) = item else { return };
    let EntityState::Inserter { held_item, progress, .. } = &mut entity.state else { unreachable!() };
    *held_item = Some(item);
    *progress = 0.0;
    dirty.insert(entity.id);
    dirty.insert(source_id);
}

fn return_held_item(
    entity: &mut Entity,
    source_id: Option<EntityId>,
    registry: &mut EntityRegistry,
    catalog: &Catalog,
    dirty: &mut HashSet<EntityId>,
) {
    let held = if let EntityState::Inserter { held_item, .. } = &entity.state { held_item.clone() } else { None };
    let (Some(held), Some(source_id)) = (held, source_id) else { return };
    let Some(mut source) = registry.take(source_id) else { return };
    if try_insert(&mut source, held, catalog) {
        dirty.insert(source.id);
    }
    registry.put_back(source);
}

fn reset_inserter(entity: &mut Entity, cooldown: u32) {
    if let EntityState::Inserter { held_item, progress, cooldown: c } = &mut entity.state {
        *held_item = None;
        *progress = 0.0;
        *c = cooldown;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lodestone_catalog::Catalog;
    use lodestone_shared::Direction;
    use lodestone_world::{ChunkStore, NullBackingStore, WorldSeed};

    use super::*;
    use crate::entity::{ConveyorItem, Entity};

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::load_defaults().expect("embedded catalog"))
    }

    fn store(catalog: Arc<Catalog>) -> ChunkStore {
        ChunkStore::new(WorldSeed::new(1), catalog, Box::new(NullBackingStore))
    }

    /// A backing store that hands back an every-tile-is-`tile_id` chunk for
    /// any coordinate, used to put a miner on a known resource tile without
    /// depending on where biome/resource-patch generation happens to place one.
    struct FixedTileBackingStore {
        tile_id: lodestone_catalog::TileId,
    }

    impl lodestone_world::ChunkBackingStore for FixedTileBackingStore {
        fn load_chunk(&self, coord: lodestone_world::ChunkCoord) -> Option<lodestone_world::Chunk> {
            Some(lodestone_world::Chunk::filled(coord, self.tile_id))
        }

        fn save_chunk(&self, _chunk: &lodestone_world::Chunk) {}
    }

    #[test]
    fn miner_extracts_onto_resource_tile_after_cooldown() {
        let catalog = catalog();
        let iron_ore_id = catalog.tile_id("iron_ore").unwrap();
        let mut world = ChunkStore::new(WorldSeed::new(1), catalog.clone(), Box::new(FixedTileBackingStore { tile_id: iron_ore_id }));
        let mut registry = EntityRegistry::new(1);
        let kind = catalog.entity_kind_id("miner").unwrap();
        let id = registry.place(|id| Entity::new(id, kind, 0, 0, Direction::East, EntityState::new_miner())).unwrap();

        let mut dirty = std::collections::HashSet::new();
        update_entity(id, &mut registry, &mut world, &catalog, &mut dirty);

        let entity = registry.get(id).unwrap();
        let EntityState::Miner { output, cooldown } = &entity.state else { panic!("still a miner") };
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].item, "iron_ore");
        assert_eq!(*cooldown, 60);
    }

    #[test]
    fn conveyor_advances_and_transfers_to_chest() {
        let catalog = catalog();
        let mut world = store(catalog.clone());
        let mut registry = EntityRegistry::new(1);
        let conveyor_kind = catalog.entity_kind_id("conveyor").unwrap();
        let chest_kind = catalog.entity_kind_id("chest").unwrap();

        let conveyor_id = registry
            .place(|id| {
                Entity::new(
                    id,
                    conveyor_kind,
                    0,
                    0,
                    Direction::East,
                    EntityState::Conveyor { items: std::collections::VecDeque::from([ConveyorItem { item: "coal".into(), progress: 0.99 }]) },
                )
            })
            .unwrap();
        registry.place(|id| Entity::new(id, chest_kind, 1, 0, Direction::East, EntityState::new_chest())).unwrap();

        let mut dirty = std::collections::HashSet::new();
        update_entity(conveyor_id, &mut registry, &mut world, &catalog, &mut dirty);

        let chest = registry.entity_at(1, 0).unwrap();
        let EntityState::Chest { items } = &chest.state else { panic!("still a chest") };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item, "coal");

        let conveyor = registry.entity_at(0, 0).unwrap();
        let EntityState::Conveyor { items } = &conveyor.state else { panic!("still a conveyor") };
        assert!(items.is_empty());
    }

    #[test]
    fn conveyor_clamps_progress_under_backpressure() {
        let catalog = catalog();
        let mut world = store(catalog.clone());
        let mut registry = EntityRegistry::new(1);
        let conveyor_kind = catalog.entity_kind_id("conveyor").unwrap();

        let conveyor_id = registry
            .place(|id| {
                Entity::new(
                    id,
                    conveyor_kind,
                    0,
                    0,
                    Direction::East,
                    EntityState::Conveyor { items: std::collections::VecDeque::from([ConveyorItem { item: "coal".into(), progress: 0.99 }]) },
                )
            })
            .unwrap();

        let mut dirty = std::collections::HashSet::new();
        update_entity(conveyor_id, &mut registry, &mut world, &catalog, &mut dirty);

        let conveyor = registry.entity_at(0, 0).unwrap();
        let EntityState::Conveyor { items } = &conveyor.state else { panic!("still a conveyor") };
        assert_eq!(items.len(), 1);
        assert!((items[0].progress - 0.99).abs() < f32::EPSILON);
    }

    #[test]
    fn inserter_never_extracts_when_destination_is_full() {
        let catalog = catalog();
        let mut world = store(catalog.clone());
        let mut registry = EntityRegistry::new(1);
        let inserter_kind = catalog.entity_kind_id("inserter").unwrap();
        let chest_kind = catalog.entity_kind_id("chest").unwrap();
        let miner_kind = catalog.entity_kind_id("miner").unwrap();

        registry
            .place(|id| {
                let mut output = std::collections::VecDeque::new();
                output.push_back(BufferItem::new("iron_ore"));
                Entity::new(id, miner_kind, 0, 0, Direction::East, EntityState::Miner { output, cooldown: 0 })
            })
            .unwrap();
        let inserter_id = registry.place(|id| Entity::new(id, inserter_kind, 1, 0, Direction::East, EntityState::new_inserter())).unwrap();
        let full_capacity = catalog.entity_kind(chest_kind).unwrap().buffer_size as usize;
        let mut full_items = std::collections::VecDeque::new();
        for _ in 0..full_capacity {
            full_items.push_back(BufferItem::new("iron_ore"));
        }
        registry.place(|id| Entity::new(id, chest_kind, 2, 0, Direction::East, EntityState::Chest { items: full_items })).unwrap();

        let mut dirty = std::collections::HashSet::new();
        update_entity(inserter_id, &mut registry, &mut world, &catalog, &mut dirty);

        let inserter = registry.entity_at(1, 0).unwrap();
        let EntityState::Inserter { held_item, .. } = &inserter.state else { panic!("still an inserter") };
        assert!(held_item.is_none());

        let miner = registry.entity_at(0, 0).unwrap();
        let EntityState::Miner { output, .. } = &miner.state else { panic!("still a miner") };
        assert_eq!(output.len(), 1);
    }
}
