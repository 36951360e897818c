//! # Inventory System
//!
//! A fixed-length, pre-allocated slot array (spec.md §4.6): no growth, no
//! per-item allocation on the hot path of `add`/`remove`.

use lodestone_catalog::Catalog;
use lodestone_shared::ItemStackWire;

/// Number of slots in a player inventory (4x10, spec.md §4.6).
pub const MAX_INVENTORY_SLOTS: usize = 40;

/// Maximum items a single slot may hold.
pub const MAX_STACK: u32 = 100;

/// A non-empty inventory slot: a catalog item name and a count in `1..=MAX_STACK`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemStack {
    /// Catalog item name.
    pub item: String,
    /// Number of items in this stack.
    pub count: u32,
}

/// A pre-allocated inventory of [`MAX_INVENTORY_SLOTS`] slots, each either
/// empty or holding a non-full-or-full stack of one item kind.
///
/// Invariant: no two slots hold the same item name while either is below
/// [`MAX_STACK`] (`add` always tops up an existing stack before it opens a
/// new slot, and `sort` re-establishes the invariant if anything broke it).
#[derive(Clone, Debug)]
pub struct Inventory {
    slots: [Option<ItemStack>; MAX_INVENTORY_SLOTS],
}

impl Inventory {
    /// Creates a new, empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self { slots: std::array::from_fn(|_| None) }
    }

    /// Total slot count.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        MAX_INVENTORY_SLOTS
    }

    /// Number of non-empty slots.
    #[must_use]
    pub fn used_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Reads a slot by index.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Total count of `item` across every slot.
    #[must_use]
    pub fn count_item(&self, item: &str) -> u32 {
        self.slots.iter().flatten().filter(|s| s.item == item).map(|s| s.count).sum()
    }

    /// First slot index holding `item`, if any.
    #[must_use]
    pub fn find_item(&self, item: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.as_ref().is_some_and(|s| s.item == item))
    }

    /// First empty slot index, if any.
    #[must_use]
    pub fn find_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Adds up to `count` of `item`, filling existing stacks of the same item
    /// before opening empty slots. Returns the amount that did **not** fit —
    /// `0` means everything was added (spec.md §4.6: `add` never fails, it
    /// reports overflow instead).
    pub fn add(&mut self, item: &str, count: u32) -> u32 {
        let mut remaining = count;

        for slot in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if slot.item == item && slot.count < MAX_STACK {
                let can_add = (MAX_STACK - slot.count).min(remaining);
                slot.count += can_add;
                remaining -= can_add;
            }
        }

        while remaining > 0 {
            let Some(idx) = self.find_empty_slot() else { break };
            let take = remaining.min(MAX_STACK);
            self.slots[idx] = Some(ItemStack { item: item.to_owned(), count: take });
            remaining -= take;
        }

        remaining
    }

    /// Removes up to `count` of `item`, taking from the **later** slots
    /// first so that earlier slots (what a player sees first) stay stable
    /// while an inventory is being drawn down (spec.md §4.6). Returns the
    /// amount actually removed, which may be less than `count`.
    pub fn remove(&mut self, item: &str, count: u32) -> u32 {
        let mut remaining = count;

        for slot in self.slots.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            let Some(stack) = slot else { continue };
            if stack.item != item {
                continue;
            }
            let take = stack.count.min(remaining);
            stack.count -= take;
            remaining -= take;
            if stack.count == 0 {
                *slot = None;
            }
        }

        count - remaining
    }

    /// Unconditionally swaps the contents of two slots (empty or not). No-op
    /// (returns `false`) only when an index is out of range.
    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        if a >= MAX_INVENTORY_SLOTS || b >= MAX_INVENTORY_SLOTS {
            return false;
        }
        self.slots.swap(a, b);
        true
    }

    /// Moves `count` items from `src` into `dst`. Legal only when `dst` is
    /// empty, or already holds the same item with room for `count` more
    /// (spec.md §4.6); otherwise a no-op returning `false`.
    pub fn split(&mut self, src: usize, dst: usize, count: u32) -> bool {
        if src == dst || src >= MAX_INVENTORY_SLOTS || dst >= MAX_INVENTORY_SLOTS || count == 0 {
            return false;
        }
        let Some(src_stack) = self.slots[src].clone() else { return false };
        if src_stack.count < count {
            return false;
        }
        let fits = match &self.slots[dst] {
            None => true,
            Some(existing) => existing.item == src_stack.item && existing.count + count <= MAX_STACK,
        };
        if !fits {
            return false;
        }

        match &mut self.slots[dst] {
            Some(existing) => existing.count += count,
            empty @ None => *empty = Some(ItemStack { item: src_stack.item, count }),
        }
        let src_stack = self.slots[src].as_mut().expect("checked above");
        src_stack.count -= count;
        if src_stack.count == 0 {
            self.slots[src] = None;
        }
        true
    }

    /// Coalesces every stack by item, re-chunks each item's total into
    /// `MAX_STACK`-sized stacks, and orders the result by catalog category
    /// (raw before material before component, spec.md §4.6) then display
    /// name, padding the rest with empty slots.
    pub fn sort(&mut self, catalog: &Catalog) {
        let mut totals: Vec<(String, u32)> = Vec::new();
        for stack in self.slots.iter().flatten() {
            match totals.iter_mut().find(|(item, _)| *item == stack.item) {
                Some((_, total)) => *total += stack.count,
                None => totals.push((stack.item.clone(), stack.count)),
            }
        }

        totals.sort_by(|(a, _), (b, _)| sort_key(catalog, a).cmp(&sort_key(catalog, b)));

        let mut rebuilt: Vec<Option<ItemStack>> = Vec::with_capacity(MAX_INVENTORY_SLOTS);
        for (item, total) in totals {
            let mut remaining = total;
            while remaining > 0 {
                let take = remaining.min(MAX_STACK);
                rebuilt.push(Some(ItemStack { item: item.clone(), count: take }));
                remaining -= take;
            }
        }
        // Coalescing a valid inventory can only reduce the slot count needed
        // (it never grows the item count), so this always fits.
        rebuilt.resize(MAX_INVENTORY_SLOTS, None);

        for (slot, rebuilt) in self.slots.iter_mut().zip(rebuilt) {
            *slot = rebuilt;
        }
    }

    /// Captures the current contents for a CRAFT transaction's rollback.
    #[must_use]
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot { slots: self.slots.clone() }
    }

    /// Restores a previously-captured snapshot, discarding any changes made
    /// since (CRAFT rollback).
    pub fn restore(&mut self, snapshot: &InventorySnapshot) {
        self.slots.clone_from(&snapshot.slots);
    }

    /// Converts every slot to its wire shape, `None` for empty slots, in
    /// slot order. Used for `INVENTORY_UPDATE` broadcasts and for
    /// `lodestone_persistence`'s `players.inventory` column.
    #[must_use]
    pub fn to_wire_slots(&self) -> Vec<Option<ItemStackWire>> {
        self.slots.iter().map(|s| s.as_ref().map(|s| ItemStackWire { item: s.item.clone(), count: s.count })).collect()
    }

    /// Rebuilds an inventory from a previously-saved slot list, the inverse
    /// of [`Self::to_wire_slots`]. Slots beyond `wire`'s length are left
    /// empty; a `wire` longer than [`MAX_INVENTORY_SLOTS`] has its extra
    /// entries ignored.
    #[must_use]
    pub fn from_wire_slots(wire: &[Option<ItemStackWire>]) -> Self {
        let mut inventory = Self::new();
        for (slot, wire_slot) in inventory.slots.iter_mut().zip(wire) {
            *slot = wire_slot.as_ref().map(|w| ItemStack { item: w.item.clone(), count: w.count });
        }
        inventory
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

/// Category rank, then display-name ordering, for `sort()`. Mirrors
/// `original_source/server/inventory_manager.py`'s hardcoded
/// `category_order` dict, adapted to the catalog's actual category names.
/// Categories not in this list sort after every known one.
const CATEGORY_ORDER: &[&str] = &["raw", "material", "component", "science"];

fn sort_key(catalog: &Catalog, item: &str) -> (usize, String) {
    let def = catalog.item(item);
    let rank = def
        .and_then(|d| CATEGORY_ORDER.iter().position(|c| *c == d.category))
        .unwrap_or(CATEGORY_ORDER.len());
    let display = def.map_or_else(|| item.to_owned(), |d| d.display_name.clone());
    (rank, display)
}

/// A point-in-time copy of every slot, for CRAFT's snapshot/rollback
/// transaction (spec.md §9 Open Question 3 resolution).
#[derive(Clone, Debug)]
pub struct InventorySnapshot {
    slots: [Option<ItemStack>; MAX_INVENTORY_SLOTS],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::load_defaults().expect("embedded catalog")
    }

    #[test]
    fn add_stacks_before_opening_new_slots() {
        let mut inv = Inventory::new();
        assert_eq!(inv.add("iron_ore", 150), 0);
        assert_eq!(inv.count_item("iron_ore"), 150);
        assert_eq!(inv.used_slots(), 2);
        assert_eq!(inv.get(0).unwrap().count, 100);
        assert_eq!(inv.get(1).unwrap().count, 50);
    }

    #[test]
    fn add_reports_overflow_once_every_slot_is_full() {
        let mut inv = Inventory::new();
        let overflow = inv.add("iron_ore", MAX_STACK * MAX_INVENTORY_SLOTS as u32 + 5);
        assert_eq!(overflow, 5);
        assert_eq!(inv.used_slots(), MAX_INVENTORY_SLOTS);
    }

    #[test]
    fn remove_drains_later_slots_first() {
        let mut inv = Inventory::new();
        inv.add("iron_ore", 150);
        assert_eq!(inv.remove("iron_ore", 30), 30);
        // slot 1 (50) should have been drained before slot 0 (100).
        assert_eq!(inv.get(0).unwrap().count, 100);
        assert_eq!(inv.get(1).unwrap().count, 20);
    }

    #[test]
    fn remove_caps_at_whats_available() {
        let mut inv = Inventory::new();
        inv.add("coal", 10);
        assert_eq!(inv.remove("coal", 50), 10);
        assert_eq!(inv.count_item("coal"), 0);
    }

    #[test]
    fn swap_exchanges_two_slots_unconditionally() {
        let mut inv = Inventory::new();
        inv.add("iron_ore", 5);
        assert!(inv.get(1).is_none());
        assert!(inv.swap(0, 1));
        assert!(inv.get(0).is_none());
        assert_eq!(inv.get(1).unwrap().count, 5);
    }

    #[test]
    fn swap_rejects_out_of_range_indices() {
        let mut inv = Inventory::new();
        assert!(!inv.swap(0, MAX_INVENTORY_SLOTS));
    }

    #[test]
    fn split_moves_into_an_empty_slot() {
        let mut inv = Inventory::new();
        inv.add("iron_ore", 10);
        assert!(inv.split(0, 1, 4));
        assert_eq!(inv.get(0).unwrap().count, 6);
        assert_eq!(inv.get(1).unwrap().count, 4);
    }

    #[test]
    fn split_rejects_mismatched_destination() {
        let mut inv = Inventory::new();
        inv.add("iron_ore", 10);
        inv.add("coal", 5);
        assert!(!inv.split(0, 1, 2));
    }

    #[test]
    fn split_rejects_overflowing_destination() {
        let mut inv = Inventory::new();
        inv.add("iron_ore", 100);
        inv.add("iron_ore", 100);
        assert!(!inv.split(0, 1, 1));
    }

    #[test]
    fn sort_coalesces_and_orders_by_category_then_name() {
        let catalog = catalog();
        let mut inv = Inventory::new();
        inv.add("gear", 1); // component
        inv.add("coal", 1); // raw
        inv.add("iron_plate", 1); // material
        inv.add("coal", 1); // raw, second slot before sort

        inv.sort(&catalog);

        assert_eq!(inv.get(0).unwrap().item, "coal");
        assert_eq!(inv.get(0).unwrap().count, 2);
        assert_eq!(inv.get(1).unwrap().item, "iron_plate");
        assert_eq!(inv.get(2).unwrap().item, "gear");
        assert!(inv.get(3).is_none());
    }

    #[test]
    fn sort_rechunks_into_max_stack_sized_stacks() {
        let catalog = catalog();
        let mut inv = Inventory::new();
        for _ in 0..3 {
            inv.add("iron_ore", 50);
        }
        inv.sort(&catalog);
        assert_eq!(inv.get(0).unwrap().count, MAX_STACK);
        assert_eq!(inv.get(1).unwrap().count, 50);
        assert!(inv.get(2).is_none());
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let mut inv = Inventory::new();
        inv.add("iron_ore", 50);
        let snapshot = inv.snapshot();
        inv.add("coal", 30);
        inv.restore(&snapshot);
        assert_eq!(inv.count_item("coal"), 0);
        assert_eq!(inv.count_item("iron_ore"), 50);
    }

    #[test]
    fn wire_slots_round_trip_including_gaps() {
        let mut inv = Inventory::new();
        inv.add("iron_ore", 50);
        inv.swap(0, 5);

        let wire = inv.to_wire_slots();
        assert_eq!(wire.len(), MAX_INVENTORY_SLOTS);
        assert!(wire[0].is_none());
        assert_eq!(wire[5].as_ref().unwrap().item, "iron_ore");

        let restored = Inventory::from_wire_slots(&wire);
        assert_eq!(restored.count_item("iron_ore"), 50);
        assert_eq!(restored.get(5).unwrap().count, 50);
        assert!(restored.get(0).is_none());
    }
}
