//! Insertion and extraction rules (spec.md §4.2): the destination- and
//! source-side policies every transfer (conveyor ejection, miner/furnace/
//! assembler ejection, inserter pickup/drop) goes through.

use lodestone_catalog::Catalog;

use crate::entity::{BufferItem, ConveyorItem, Entity, EntityState};

/// Returns whether `dest` currently has room for one more item, without
/// mutating it. Inserters must check this *before* extracting from their
/// source, or a destination that's full would lose the item (spec.md §4.2).
#[must_use]
pub fn can_insert(dest: &Entity, catalog: &Catalog) -> bool {
    let def = catalog.entity_kind(dest.kind);
    match &dest.state {
        EntityState::Conveyor { items } => items.len() < def.map_or(3, |d| d.buffer_size) as usize,
        EntityState::Chest { items } => items.len() < def.map_or(50, |d| d.buffer_size) as usize,
        EntityState::Furnace { input, .. } => input.len() < def.map_or(10, |d| d.input_buffer_size) as usize,
        EntityState::Assembler { input, .. } => input.len() < def.map_or(10, |d| d.input_buffer_size) as usize,
        EntityState::Miner { .. } | EntityState::Inserter { .. } => false,
    }
}

/// Attempts to append `item` onto `dest`. Returns whether it was accepted;
/// on `false`, `item` is left untouched by the caller (never dropped).
#[must_use]
pub fn try_insert(dest: &mut Entity, item: BufferItem, catalog: &Catalog) -> bool {
    if !can_insert(dest, catalog) {
        return false;
    }
    match &mut dest.state {
        EntityState::Conveyor { items } => {
            items.push_back(ConveyorItem { item: item.item, progress: 0.0 });
            true
        }
        EntityState::Chest { items } => {
            items.push_back(item);
            true
        }
        EntityState::Furnace { input, .. } | EntityState::Assembler { input, .. } => {
            input.push_back(item);
            true
        }
        EntityState::Miner { .. } | EntityState::Inserter { .. } => false,
    }
}

/// Conveyor items are only extractable once they've nearly reached the end
/// of the belt (spec.md §4.2's "extraction rules").
const CONVEYOR_EXTRACT_THRESHOLD: f32 = 0.9;

/// Attempts to pop one item from `source`'s output-facing buffer. `None`
/// means refuse — the normal backpressure outcome, not an error.
#[must_use]
pub fn try_extract(source: &mut Entity) -> Option<BufferItem> {
    match &mut source.state {
        EntityState::Chest { items } => items.pop_front(),
        EntityState::Furnace { output, .. } | EntityState::Miner { output, .. } | EntityState::Assembler { output, .. } => {
            output.pop_front()
        }
        EntityState::Conveyor { items } => {
            let index = items.iter().position(|i| i.progress >= CONVEYOR_EXTRACT_THRESHOLD)?;
            items.remove(index).map(|c| BufferItem::new(c.item))
        }
        EntityState::Inserter { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use lodestone_catalog::Catalog;
    use lodestone_shared::{Direction, EntityId};

    use super::*;
    use crate::entity::Entity;

    fn catalog() -> Catalog {
        Catalog::load_defaults().expect("embedded catalog")
    }

    fn entity(kind_name: &str, catalog: &Catalog, state: EntityState) -> Entity {
        let kind = catalog.entity_kind_id(kind_name).expect("known kind");
        Entity::new(EntityId(1), kind, 0, 0, Direction::East, state)
    }

    #[test]
    fn conveyor_rejects_beyond_capacity() {
        let catalog = catalog();
        let mut items = std::collections::VecDeque::new();
        for _ in 0..3 {
            items.push_back(ConveyorItem { item: "iron_ore".into(), progress: 0.0 });
        }
        let mut conveyor = entity("conveyor", &catalog, EntityState::Conveyor { items });
        assert!(!can_insert(&conveyor, &catalog));
        assert!(!try_insert(&mut conveyor, BufferItem::new("iron_ore"), &catalog));
    }

    #[test]
    fn conveyor_only_extracts_near_end_of_belt() {
        let catalog = catalog();
        let mut items = std::collections::VecDeque::new();
        items.push_back(ConveyorItem { item: "iron_ore".into(), progress: 0.2 });
        items.push_back(ConveyorItem { item: "coal".into(), progress: 0.95 });
        let mut conveyor = entity("conveyor", &catalog, EntityState::Conveyor { items });
        let extracted = try_extract(&mut conveyor).expect("one item ready");
        assert_eq!(extracted.item, "coal");
        assert!(try_extract(&mut conveyor).is_none());
    }

    #[test]
    fn miner_and_inserter_never_accept_items() {
        let catalog = catalog();
        let miner = entity("miner", &catalog, EntityState::new_miner());
        assert!(!can_insert(&miner, &catalog));
        let inserter = entity("inserter", &catalog, EntityState::new_inserter());
        assert!(!can_insert(&inserter, &catalog));
    }
}
