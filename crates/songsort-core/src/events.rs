use crate::error::{LibraryError, SortError};
use crate::library::{PlaylistId, SongId};
use crate::playback::PlaybackState;

/// Notificaciones asíncronas del organizador hacia quien lo maneja.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortEvent {
    SongAdded {
        song: SongId,
        playlist: PlaylistId,
    },
    /// Una escritura falló. La sesión sigue adelante.
    WriteFailed {
        song: String,
        playlist: String,
        error: LibraryError,
    },
    /// Solo se emite si se procesó al menos una canción.
    SessionEnded {
        count: usize,
        cancelled: bool,
    },
    PlaybackChanged(PlaybackState),
}

impl SortEvent {
    pub fn as_error(&self) -> Option<SortError> {
        match self {
            SortEvent::WriteFailed {
                song,
                playlist,
                error,
            } => Some(SortError::PlaylistWrite {
                song: song.clone(),
                playlist: playlist.clone(),
                source: error.clone(),
            }),
            _ => None,
        }
    }
}
