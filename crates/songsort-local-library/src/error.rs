use songsort_core::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] config::ConfigError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("Database connection is poisoned")]
    Poisoned,

    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl From<StorageError> for LibraryError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Library(inner) => inner,
            other => LibraryError::Backend(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("{} is too short ({:?})", path.display(), duration)]
    TooShort {
        path: std::path::PathBuf,
        duration: std::time::Duration,
    },

    #[error("Tag read error: {0}")]
    Tags(#[from] lofty::error::LoftyError),

    #[error("Artwork cache error: {0}")]
    Artwork(#[from] songsort_paths::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
