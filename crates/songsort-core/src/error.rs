use thiserror::Error;

use crate::library::{PlaylistId, SongId};
use crate::selection::SelectionMode;

/// Fallos de un proveedor de biblioteca (enumerar, consultar, escribir).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("Access to the music library has not been granted")]
    AccessDenied,

    #[error("Playlist {0} does not exist")]
    UnknownPlaylist(PlaylistId),

    #[error("Song {0} does not exist")]
    UnknownSong(SongId),

    #[error("Invalid playlist name: {0:?}")]
    InvalidName(String),

    #[error("Library backend error: {0}")]
    Backend(String),
}

/// Fallos al leer o persistir las preferencias.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Could not read preferences: {0}")]
    Load(String),

    #[error("Could not save preferences: {0}")]
    Store(String),
}

/// Transiciones ilegales de la sesión de ordenación.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {action} while the session is {state}")]
    InvalidState { action: &'static str, state: &'static str },
}

/// Errores del flujo de ordenación tal como los ve quien llama.
#[derive(Error, Debug)]
pub enum SortError {
    /// Modo basado en un conjunto de playlists, pero el conjunto está vacío.
    #[error("No playlists selected for mode {0}")]
    EmptySelection(SelectionMode),

    /// No hay playlists destino configuradas.
    #[error("No destination playlists configured")]
    NoDestination,

    /// Falló añadir una canción a una playlist. No bloquea la sesión.
    #[error("Error when adding “{song}” to “{playlist}”: {source}")]
    PlaylistWrite {
        song: String,
        playlist: String,
        #[source]
        source: LibraryError,
    },

    #[error("Could not create playlist: {0}")]
    PlaylistCreation(#[source] LibraryError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    /// La tarea en segundo plano entró en pánico o fue cancelada.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = SortError> = std::result::Result<T, E>;
