//! Startup failures and their exit codes (spec.md §6: "0 normal, nonzero on
//! bind failure or unrecoverable corruption").

use thiserror::Error;

/// Something that kept the server from starting at all.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was attempted.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The embedded store could not be opened or its schema initialized.
    #[error("failed to open persistence store at {path}: {source}")]
    Persistence {
        /// Path to the database file.
        path: String,
        /// Underlying error.
        #[source]
        source: lodestone_persistence::PersistenceError,
    },

    /// The content catalog failed to load.
    #[error("failed to load catalog: {0}")]
    Catalog(#[source] lodestone_catalog::CatalogError),

    /// The save directory could not be created.
    #[error("failed to create save directory {path}: {source}")]
    SaveDir {
        /// Directory that failed to create.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl StartupError {
    /// Process exit code for this failure (spec.md §6).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Bind { .. } => 1,
            Self::Persistence { .. } | Self::Catalog(_) | Self::SaveDir { .. } => 2,
        }
    }
}
