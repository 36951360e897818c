//! # Lodestone Persistence
//!
//! The embedded relational store (spec.md §4.4): chunks, world metadata,
//! and player records in one SQLite file (`store`), plus the errors that
//! can surface while reading or writing it (`error`).

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use store::{PersistenceStore, PlayerRecord, WorldMeta};
