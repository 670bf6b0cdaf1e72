use std::{
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use songsort_core::{
    AuthorizationStatus, LibraryError, MediaLibrary, PlaylistWriter,
    library::{Playlist, PlaylistId, Song, SongId},
};
use tracing::{Level, debug, instrument};

use crate::{access::AccessControl, storage::LocalStorage};

/// Biblioteca local expuesta al organizador.
///
/// Todas las lecturas exigen permiso concedido. Las escrituras pasan por el
/// pool bloqueante de tokio porque SQLite es síncrono.
#[derive(Debug)]
pub struct LocalLibrary {
    storage: LocalStorage,
    access: RwLock<AccessControl>,
}

impl LocalLibrary {
    pub fn new(storage: LocalStorage, access: AccessControl) -> Self {
        LocalLibrary {
            storage,
            access: RwLock::new(access),
        }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Actualiza las carpetas cuyo acceso se comprueba.
    pub fn set_folders(&self, folders: Vec<PathBuf>) -> Result<(), LibraryError> {
        let mut access = self
            .access
            .write()
            .map_err(|_| LibraryError::Backend("access lock poisoned".to_string()))?;
        access.set_folders(folders);
        Ok(())
    }

    pub fn revoke_authorization(&self) -> Result<(), LibraryError> {
        self.access()?
            .revoke()
            .map_err(|e| LibraryError::Backend(e.to_string()))
    }

    fn access(&self) -> Result<RwLockReadGuard<'_, AccessControl>, LibraryError> {
        self.access
            .read()
            .map_err(|_| LibraryError::Backend("access lock poisoned".to_string()))
    }

    fn ensure_authorized(&self) -> Result<(), LibraryError> {
        if self.authorization().is_authorized() {
            Ok(())
        } else {
            Err(LibraryError::AccessDenied)
        }
    }
}

impl MediaLibrary for LocalLibrary {
    fn authorization(&self) -> AuthorizationStatus {
        self.access()
            .map(|access| access.status())
            .unwrap_or(AuthorizationStatus::Denied)
    }

    fn request_authorization(&self) -> Result<AuthorizationStatus, LibraryError> {
        self.access()?
            .grant()
            .map_err(|e| LibraryError::Backend(e.to_string()))
    }

    fn all_songs(&self) -> Result<Vec<Song>, LibraryError> {
        self.ensure_authorized()?;
        Ok(self.storage.all_songs()?)
    }

    fn all_playlists(&self) -> Result<Vec<Playlist>, LibraryError> {
        self.ensure_authorized()?;
        Ok(self.storage.all_playlists()?)
    }

    fn songs_in_playlist(&self, playlist: PlaylistId) -> Result<Vec<Song>, LibraryError> {
        self.ensure_authorized()?;
        Ok(self.storage.songs_in_playlist(playlist)?)
    }

    fn playlist_contains(&self, playlist: PlaylistId, song: SongId) -> Result<bool, LibraryError> {
        self.ensure_authorized()?;
        Ok(self.storage.playlist_contains(playlist, song)?)
    }
}

#[async_trait]
impl PlaylistWriter for LocalLibrary {
    #[instrument(level = Level::DEBUG, skip(self), err)]
    async fn add_song(&self, playlist: PlaylistId, song: SongId) -> Result<(), LibraryError> {
        self.ensure_authorized()?;
        let storage = self.storage.clone();
        let added = tokio::task::spawn_blocking(move || storage.add_song(playlist, song, Utc::now()))
            .await
            .map_err(|e| LibraryError::Backend(e.to_string()))??;

        if !added {
            debug!("La canción {} ya estaba en la playlist {}", song, playlist);
        }
        Ok(())
    }

    #[instrument(level = Level::DEBUG, skip(self), err)]
    async fn create_playlist(&self, name: &str) -> Result<Playlist, LibraryError> {
        self.ensure_authorized()?;
        let storage = self.storage.clone();
        let name = name.to_string();
        let playlist = tokio::task::spawn_blocking(move || storage.create_playlist(&name, Utc::now()))
            .await
            .map_err(|e| LibraryError::Backend(e.to_string()))??;
        Ok(playlist)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc, time::Duration};

    use songsort_paths::SongsortPaths;

    use super::*;
    use crate::metadata::TrackRecord;

    fn library(granted: bool) -> (tempfile::TempDir, LocalLibrary) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Arc::new(SongsortPaths::with_base(dir.path()).unwrap());
        paths.ensure_structure().unwrap();
        let music = dir.path().join("music");
        fs::create_dir(&music).unwrap();

        let access = AccessControl::new(paths, vec![music]);
        if granted {
            access.grant().unwrap();
        }
        let storage = LocalStorage::open_in_memory().unwrap();
        storage
            .upsert_tracks(
                &[TrackRecord {
                    path: PathBuf::from("/m/a.mp3"),
                    title: Some("A".to_string()),
                    artist: None,
                    album: None,
                    genre: None,
                    duration: Duration::from_secs(200),
                    artwork: None,
                    file_size: 10,
                    last_modified: 0,
                }],
                Utc::now(),
            )
            .unwrap();
        (dir, LocalLibrary::new(storage, access))
    }

    #[tokio::test]
    async fn reads_require_authorization() {
        let (_dir, library) = library(false);

        assert_eq!(library.authorization(), AuthorizationStatus::NotDetermined);
        assert_eq!(library.all_songs().unwrap_err(), LibraryError::AccessDenied);
        assert_eq!(
            library.create_playlist("Mix").await.unwrap_err(),
            LibraryError::AccessDenied
        );

        assert_eq!(library.request_authorization().unwrap(), AuthorizationStatus::Authorized);
        assert_eq!(library.all_songs().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn writes_go_through_storage() {
        let (_dir, library) = library(true);
        let song = library.all_songs().unwrap().remove(0);

        let playlist = library.create_playlist("Mix").await.unwrap();
        library.add_song(playlist.id, song.id).await.unwrap();
        library.add_song(playlist.id, song.id).await.unwrap();

        assert!(library.playlist_contains(playlist.id, song.id).unwrap());
        assert_eq!(library.songs_in_playlist(playlist.id).unwrap().len(), 1);
        assert!(matches!(
            library.create_playlist(" ").await.unwrap_err(),
            LibraryError::InvalidName(_)
        ));
        assert_eq!(
            library.add_song(999, song.id).await.unwrap_err(),
            LibraryError::UnknownPlaylist(999)
        );
    }
}
