//! Catalog loading errors.

use thiserror::Error;

/// Errors that can occur while loading or querying the content catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read from disk.
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The catalog file did not parse as valid TOML, or was structurally invalid.
    #[error("invalid catalog TOML: {0}")]
    InvalidConfig(String),

    /// A referenced tile/entity/item/recipe name was not found.
    #[error("unknown {kind} in catalog: {name}")]
    NotFound {
        /// What kind of thing was being looked up (tile, entity, item, recipe).
        kind: &'static str,
        /// The name that was missing.
        name: String,
    },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
