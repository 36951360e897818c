//! Persistence errors.
//!
//! `ChunkBackingStore::save_chunk` can't return a `Result` (spec.md §4.4's
//! write-on-eviction/flush path is fire-and-forget from `ChunkStore`'s point
//! of view) — failures there are logged via `tracing::error!` instead. This
//! type covers every other call, all of which have a caller able to act on
//! a failure (retry the save, refuse the connection, fall back to a fresh
//! world).

use thiserror::Error;

/// Failure reading from or writing to the embedded store.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The underlying SQLite connection returned an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored blob did not deserialize (corrupt row, or a format from an
    /// incompatible version).
    #[error("failed to decode a stored blob: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A value failed to serialize before being written.
    #[error("failed to encode a value for storage: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
