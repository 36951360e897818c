//! # Transactional Crafting
//!
//! Crafts against the catalog's flat `assembler_recipes` table: one recipe
//! name, a fixed ingredient list, one output item. Resolves snapshot/restore
//! around the remove-then-add sequence so a craft either fully commits or
//! leaves the inventory untouched — no partial consumption is ever visible.

use lodestone_catalog::Catalog;

use crate::error::{InventoryError, InventoryResult};
use crate::inventory::Inventory;

/// The outcome of a successful craft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CraftResult {
    /// Recipe that was crafted.
    pub recipe: String,
    /// Output item produced.
    pub item: String,
    /// Number of output items produced.
    pub count: u32,
}

/// Checks whether `recipe_name` can currently be crafted from `inventory`,
/// without consuming anything.
///
/// # Errors
///
/// [`InventoryError::RecipeNotFound`] if the name isn't in the catalog, or
/// [`InventoryError::InsufficientMaterials`] for the first ingredient found
/// short.
pub fn can_craft(inventory: &Inventory, catalog: &Catalog, recipe_name: &str) -> InventoryResult<()> {
    let recipe = catalog
        .assembler_recipe(recipe_name)
        .ok_or_else(|| InventoryError::RecipeNotFound(recipe_name.to_owned()))?;

    for (item, &required) in &recipe.ingredients {
        let available = inventory.count_item(item);
        if available < required {
            return Err(InventoryError::InsufficientMaterials { item: item.clone(), required, available });
        }
    }
    Ok(())
}

/// Performs a transactional craft of `recipe_name`: removes every ingredient,
/// then adds the output, rolling the inventory back to its pre-craft state
/// on any shortfall or lack of room (spec.md §9 Open Question 3) rather than
/// the ingredients-first-then-check-output-room order the prototype used.
///
/// # Errors
///
/// Same as [`can_craft`], plus [`InventoryError::NoRoomForOutput`] if the
/// output doesn't fit after ingredients are removed.
pub fn craft(inventory: &mut Inventory, catalog: &Catalog, recipe_name: &str) -> InventoryResult<CraftResult> {
    can_craft(inventory, catalog, recipe_name)?;
    let recipe = catalog.assembler_recipe(recipe_name).expect("checked by can_craft");

    let snapshot = inventory.snapshot();

    for (item, &required) in &recipe.ingredients {
        let removed = inventory.remove(item, required);
        if removed < required {
            inventory.restore(&snapshot);
            return Err(InventoryError::InsufficientMaterials { item: item.clone(), required, available: removed });
        }
    }

    let overflow = inventory.add(&recipe.result, recipe.count);
    if overflow > 0 {
        inventory.restore(&snapshot);
        return Err(InventoryError::NoRoomForOutput { item: recipe.result.clone(), overflow });
    }

    Ok(CraftResult { recipe: recipe_name.to_owned(), item: recipe.result.clone(), count: recipe.count })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::load_defaults().expect("embedded catalog")
    }

    fn recipe_name(catalog: &Catalog) -> String {
        catalog
            .assembler_recipe("gear")
            .map(|_| "gear".to_owned())
            .unwrap_or_else(|| panic!("embedded catalog has no recipe named gear"))
    }

    #[test]
    fn craft_consumes_ingredients_and_produces_output() {
        let catalog = catalog();
        let name = recipe_name(&catalog);
        let recipe = catalog.assembler_recipe(&name).unwrap().clone();

        let mut inventory = Inventory::new();
        for (item, &count) in &recipe.ingredients {
            inventory.add(item, count * 2);
        }

        let result = craft(&mut inventory, &catalog, &name).expect("has every ingredient");
        assert_eq!(result.item, recipe.result);
        assert_eq!(result.count, recipe.count);
        assert_eq!(inventory.count_item(&recipe.result), recipe.count);

        for (item, &count) in &recipe.ingredients {
            assert_eq!(inventory.count_item(item), count);
        }
    }

    #[test]
    fn craft_rolls_back_on_missing_ingredient() {
        let catalog = catalog();
        let name = recipe_name(&catalog);
        let recipe = catalog.assembler_recipe(&name).unwrap().clone();

        let mut inventory = Inventory::new();
        // Short every ingredient by leaving the inventory empty.
        let err = craft(&mut inventory, &catalog, &name).unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientMaterials { .. }));
        for item in recipe.ingredients.keys() {
            assert_eq!(inventory.count_item(item), 0);
        }
    }

    #[test]
    fn craft_rejects_unknown_recipe() {
        let catalog = catalog();
        let mut inventory = Inventory::new();
        let err = craft(&mut inventory, &catalog, "not_a_real_recipe").unwrap_err();
        assert!(matches!(err, InventoryError::RecipeNotFound(_)));
    }
}
