//! Newtype identifiers shared across the workspace.

use serde::{Deserialize, Serialize};

/// Unique, monotonically-increasing entity identifier.
///
/// `next_entity_id` (spec.md §3 invariant) only ever increases across the
/// process lifetime; `EntityId` never recycles a value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The id used by nothing; never returned by `EntityIdAllocator::next`.
    pub const NULL: Self = Self(0);

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Per-session player identifier, assigned at AUTH.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Generates strictly-increasing `EntityId`s for the lifetime of the process.
#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    /// Creates an allocator that will hand out `start, start+1, ...`.
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self { next: start }
    }

    /// Allocates the next id.
    pub fn next(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Returns the id that will be handed out next, for persistence.
    #[must_use]
    pub const fn peek_next(&self) -> u64 {
        self.next
    }
}

/// Hands out strictly-increasing `PlayerId`s for new (never-before-seen)
/// players for the lifetime of a server process. A returning player (AUTH
/// with a name `lodestone_persistence::PersistenceStore::find_player_by_name`
/// recognizes) gets their previously-assigned id back instead of drawing
/// from this allocator.
#[derive(Debug, Default)]
pub struct PlayerIdAllocator {
    next: u64,
}

impl PlayerIdAllocator {
    /// Creates an allocator that will hand out `start, start+1, ...`, e.g.
    /// one past the highest id any previous run persisted.
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self { next: start }
    }

    /// Allocates the next id.
    pub fn next(&mut self) -> PlayerId {
        let id = PlayerId(self.next);
        self.next += 1;
        id
    }
}
