//! PICKUP and TRANSFER_TO/TRANSFER_FROM (spec.md §4.6): the inventory's only
//! points of contact with world entities. Both transfer directions reuse
//! `lodestone_simulation::rules`'s insertion/extraction rules directly rather
//! than re-deriving per-kind capacities, per spec.md §4.6's "go through the
//! same insertion/extraction rules of §4.2".

use lodestone_catalog::Catalog;
use lodestone_shared::EntityId;
use lodestone_simulation::entity::{BufferItem, EntityState};
use lodestone_simulation::rules::{try_extract, try_insert};
use lodestone_simulation::EntityRegistry;

use crate::inventory::Inventory;

/// Pickup radius around the player, in tiles (spec.md §4.6).
pub const PICKUP_RADIUS: f64 = 1.5;

/// Scans every entity within [`PICKUP_RADIUS`] of `(x, y)` for CONVEYOR or
/// CHEST items and ingests what fits into `inventory`. A conveyor keeps
/// trying every item it's carrying even after one is refused (each belt slot
/// is independent); a chest stops at the first refusal, since it's drained
/// in strict FIFO order. Returns whether anything was picked up.
pub fn pickup(inventory: &mut Inventory, registry: &mut EntityRegistry, x: f64, y: f64) -> bool {
    let ids: Vec<EntityId> = registry.entities_in_radius(x, y, PICKUP_RADIUS).into_iter().map(|e| e.id).collect();
    let mut picked_any = false;

    for id in ids {
        let Some(mut entity) = registry.take(id) else { continue };
        match &mut entity.state {
            EntityState::Conveyor { items } => {
                items.retain(|belt_item| {
                    if inventory.add(&belt_item.item, 1) == 0 {
                        picked_any = true;
                        false
                    } else {
                        true
                    }
                });
            }
            EntityState::Chest { items } => {
                while let Some(front) = items.front() {
                    if inventory.add(&front.item, 1) != 0 {
                        break;
                    }
                    items.pop_front();
                    picked_any = true;
                }
            }
            _ => {}
        }
        registry.put_back(entity);
    }

    picked_any
}

/// Moves up to `count` of `item` from `inventory` into `entity_id`'s
/// accepting buffer, one unit at a time through [`try_insert`] so the
/// destination's catalog capacity is never exceeded. Returns how many were
/// actually transferred (`0` for an unknown entity, a kind that never
/// accepts items, a full buffer, or an empty player stack).
pub fn transfer_to(
    inventory: &mut Inventory,
    registry: &mut EntityRegistry,
    catalog: &Catalog,
    entity_id: EntityId,
    item: &str,
    count: u32,
) -> u32 {
    let requested = count.min(inventory.count_item(item));
    if requested == 0 {
        return 0;
    }
    let Some(mut entity) = registry.take(entity_id) else { return 0 };

    let mut transferred = 0;
    while transferred < requested {
        if !try_insert(&mut entity, BufferItem::new(item), catalog) {
            break;
        }
        transferred += 1;
    }

    registry.put_back(entity);
    if transferred > 0 {
        inventory.remove(item, transferred);
    }
    transferred
}

/// Moves up to `count` of `item` out of `entity_id`'s output-facing buffer
/// into `inventory`, one unit at a time through [`try_extract`]. Extraction
/// stops the moment the buffer's next ready item doesn't match `item` (the
/// item is put back rather than skipped, so buffer order is preserved) or
/// `inventory` has no room for it. Returns how many were actually
/// transferred.
pub fn transfer_from(
    inventory: &mut Inventory,
    registry: &mut EntityRegistry,
    entity_id: EntityId,
    item: &str,
    count: u32,
) -> u32 {
    let Some(mut entity) = registry.take(entity_id) else { return 0 };
    let mut transferred = 0;

    while transferred < count {
        let Some(extracted) = try_extract(&mut entity) else { break };
        if extracted.item != item || inventory.add(&extracted.item, 1) != 0 {
            put_back_extracted(&mut entity, extracted);
            break;
        }
        transferred += 1;
    }

    registry.put_back(entity);
    transferred
}

/// Undoes one [`try_extract`] call: restores `item` to the front of whatever
/// buffer it would have come from, so a rejected transfer leaves the
/// entity's buffer order exactly as it was.
fn put_back_extracted(entity: &mut lodestone_simulation::entity::Entity, item: BufferItem) {
    match &mut entity.state {
        EntityState::Chest { items } => items.push_front(item),
        EntityState::Furnace { output, .. } | EntityState::Miner { output, .. } | EntityState::Assembler { output, .. } => {
            output.push_front(item);
        }
        EntityState::Conveyor { items } => {
            items.push_front(lodestone_simulation::entity::ConveyorItem { item: item.item, progress: 0.99 });
        }
        EntityState::Inserter { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use lodestone_shared::Direction;
    use lodestone_simulation::Simulation;
    use lodestone_world::{ChunkStore, NullBackingStore, WorldSeed};
    use std::sync::Arc;

    use super::*;

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::load_defaults().expect("embedded catalog"))
    }

    fn sim() -> Simulation {
        let catalog = catalog();
        let world = ChunkStore::new(WorldSeed::new(3), catalog.clone(), Box::new(NullBackingStore));
        Simulation::new(world, catalog, 1, 0)
    }

    fn push_chest_item(sim: &mut Simulation, chest: EntityId, item: &str) {
        if let EntityState::Chest { items } = &mut sim.registry_mut().get_mut(chest).unwrap().state {
            items.push_back(BufferItem::new(item));
        }
    }

    #[test]
    fn pickup_drains_a_chest_in_fifo_order_until_full() {
        let mut sim = sim();
        let chest = sim.build("chest", 0, 0, Direction::North).expect("buildable");
        push_chest_item(&mut sim, chest, "iron_ore");
        push_chest_item(&mut sim, chest, "coal");

        let mut inventory = Inventory::new();
        let picked = pickup(&mut inventory, sim.registry_mut(), 0.0, 0.0);

        assert!(picked);
        assert_eq!(inventory.count_item("iron_ore"), 1);
        assert_eq!(inventory.count_item("coal"), 1);
    }

    #[test]
    fn pickup_ignores_entities_outside_radius() {
        let mut sim = sim();
        let chest = sim.build("chest", 50, 50, Direction::North).expect("buildable");
        push_chest_item(&mut sim, chest, "iron_ore");

        let mut inventory = Inventory::new();
        assert!(!pickup(&mut inventory, sim.registry_mut(), 0.0, 0.0));
        assert_eq!(inventory.count_item("iron_ore"), 0);
    }

    #[test]
    fn transfer_to_then_from_round_trips_through_a_chest() {
        let mut sim = sim();
        let catalog = catalog();
        let chest = sim.build("chest", 1, 1, Direction::North).expect("buildable");

        let mut inventory = Inventory::new();
        inventory.add("iron_ore", 5);

        let sent = transfer_to(&mut inventory, sim.registry_mut(), &catalog, chest, "iron_ore", 5);
        assert_eq!(sent, 5);
        assert_eq!(inventory.count_item("iron_ore"), 0);

        let received = transfer_from(&mut inventory, sim.registry_mut(), chest, "iron_ore", 5);
        assert_eq!(received, 5);
        assert_eq!(inventory.count_item("iron_ore"), 5);
    }

    #[test]
    fn transfer_to_caps_at_what_the_player_actually_has() {
        let mut sim = sim();
        let catalog = catalog();
        let chest = sim.build("chest", 2, 2, Direction::North).expect("buildable");

        let mut inventory = Inventory::new();
        inventory.add("coal", 2);

        let sent = transfer_to(&mut inventory, sim.registry_mut(), &catalog, chest, "coal", 10);
        assert_eq!(sent, 2);
    }
}
