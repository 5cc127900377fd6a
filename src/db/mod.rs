pub mod sqlite;
pub mod transcript;

pub use sqlite::*;
pub use transcript::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Stored value could not be decoded: {0}")]
    Corrupt(String),

    #[error("Could not prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}
