//! Simulation invariant errors.
//!
//! Per-tick refusals (destination full, no resource under a miner, ...) are
//! normal backpressure and never produce an `Err` — see `update`. This type
//! exists only for the invariants spec.md §3 says must always hold.

use lodestone_shared::EntityId;
use thiserror::Error;

/// A simulation invariant was violated. Callers treat this as fatal: log and
/// abort the process rather than continue on inconsistent world state.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Two entities were registered at the same tile.
    #[error("tile ({x}, {y}) already occupied by entity {existing:?}")]
    TileOccupied {
        /// Conflicting x.
        x: i64,
        /// Conflicting y.
        y: i64,
        /// The entity already there.
        existing: EntityId,
    },

    /// A buffer grew past its catalog-declared capacity.
    #[error("entity {entity} buffer {buffer} exceeded capacity {capacity}")]
    BufferOverflow {
        /// Offending entity.
        entity: EntityId,
        /// Which buffer (`"output"`, `"input"`, ...).
        buffer: &'static str,
        /// The capacity that was exceeded.
        capacity: usize,
    },

    /// An action referenced an entity id that does not exist.
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
}

/// Result type for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;
