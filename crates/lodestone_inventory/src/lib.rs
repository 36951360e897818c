//! # Lodestone Inventory
//!
//! Player-side item storage: a fixed 40-slot inventory (`inventory`), CRAFT's
//! transactional recipe resolution against the content catalog (`crafting`),
//! and the PICKUP/TRANSFER_TO/TRANSFER_FROM bridges into world entity buffers
//! (`transfer`), per spec.md §4.6.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod crafting;
pub mod error;
pub mod inventory;
pub mod transfer;

pub use crafting::{can_craft, craft, CraftResult};
pub use error::{InventoryError, InventoryResult};
pub use inventory::{Inventory, ItemStack, MAX_INVENTORY_SLOTS, MAX_STACK};
pub use transfer::{pickup, transfer_from, transfer_to, PICKUP_RADIUS};
