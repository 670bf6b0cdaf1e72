pub mod access;
pub mod error;
pub mod extensions;
pub mod library_config;
pub mod manager;
pub mod metadata;
pub mod preferences;
pub mod provider;
pub mod scanner;
pub mod storage;

pub use access::AccessControl;
pub use error::{ConfigError, MetadataError, StorageError};
pub use extensions::{ExtensionConfig, ExtensionLimits, SupportedExtension};
pub use library_config::LibraryConfig;
pub use manager::{LibraryManager, ScanReport};
pub use preferences::TomlPreferences;
pub use provider::LocalLibrary;
pub use storage::{LocalStorage, UpsertStats};
