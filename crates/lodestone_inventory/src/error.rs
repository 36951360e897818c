//! Inventory and crafting errors.
//!
//! Most inventory operations (`add`, `remove`, PICKUP, TRANSFER_TO/FROM) never
//! fail in the `Result` sense — they return how much was actually moved and
//! let the caller compare that against what was requested (spec.md §4.6,
//! §7's "invalid actions are no-ops" policy). This type exists for CRAFT, the
//! one inventory operation with an all-or-nothing transactional contract.

use thiserror::Error;

/// Why a CRAFT transaction did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// The requested recipe name is not in the catalog.
    #[error("unknown recipe {0:?}")]
    RecipeNotFound(String),

    /// The inventory did not hold enough of one ingredient. The transaction
    /// is rolled back before this is returned.
    #[error("craft needs {required} {item:?}, have {available}")]
    InsufficientMaterials {
        /// The short ingredient.
        item: String,
        /// How many the recipe needs.
        required: u32,
        /// How many were actually available.
        available: u32,
    },

    /// The inventory had no room for the recipe's output. The transaction,
    /// including the already-removed ingredients, is rolled back before this
    /// is returned.
    #[error("no room for {overflow} {item:?} produced by the craft")]
    NoRoomForOutput {
        /// The output item that didn't fit.
        item: String,
        /// How many units didn't fit.
        overflow: u32,
    },
}

/// Result type for crafting operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
