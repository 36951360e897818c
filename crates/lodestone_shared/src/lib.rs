//! # Lodestone Shared
//!
//! Identifiers, tunable constants and wire-message types used by more than
//! one crate in the workspace. No networking, no I/O, no world/simulation
//! logic lives here — only the shapes other crates agree on.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod protocol;

pub use ids::{EntityId, EntityIdAllocator, PlayerId, PlayerIdAllocator};
pub use protocol::{
    BufferItemWire, ConveyorItemWire, Direction, EntityStateWire, EntityWire, InventoryAction,
    ItemStackWire, Message, PlayerAction,
};
