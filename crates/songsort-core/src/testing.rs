//! Biblioteca falsa en memoria para los tests del crate.

use std::{
    collections::HashSet,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::error::LibraryError;
use crate::library::{Playlist, PlaylistArtwork, PlaylistId, Song, SongId};
use crate::traits::{AuthorizationStatus, MediaLibrary, PlaylistWriter};

pub(crate) fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(n)
}

struct Inner {
    songs: Vec<Song>,
    playlists: Vec<(Playlist, Vec<SongId>)>,
    failing: bool,
    delay: Duration,
    failing_writes: HashSet<PlaylistId>,
    status: AuthorizationStatus,
    next_id: PlaylistId,
}

pub(crate) struct FakeLibrary {
    inner: Mutex<Inner>,
}

impl FakeLibrary {
    pub(crate) fn new() -> Self {
        FakeLibrary {
            inner: Mutex::new(Inner {
                songs: Vec::new(),
                playlists: Vec::new(),
                failing: false,
                delay: Duration::ZERO,
                failing_writes: HashSet::new(),
                status: AuthorizationStatus::Authorized,
                next_id: 1000,
            }),
        }
    }

    pub(crate) fn add_song(&self, id: SongId, title: &str, artist: &str, added: DateTime<Utc>) {
        let song = Song::new(
            id,
            Some(title.to_string()),
            Some(artist.to_string()),
            None,
            None,
            Duration::from_secs(180),
            added,
        );
        self.inner.lock().unwrap().songs.push(song);
    }

    pub(crate) fn add_playlist(&self, id: PlaylistId, name: &str, members: &[SongId]) {
        let playlist = Playlist::new(id, Some(name.to_string()), PlaylistArtwork::None);
        self.inner
            .lock()
            .unwrap()
            .playlists
            .push((playlist, members.to_vec()));
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }

    /// Retrasa `all_songs` para simular una biblioteca lenta.
    pub(crate) fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = delay;
    }

    pub(crate) fn fail_writes_to(&self, playlist: PlaylistId) {
        self.inner.lock().unwrap().failing_writes.insert(playlist);
    }

    pub(crate) fn set_status(&self, status: AuthorizationStatus) {
        self.inner.lock().unwrap().status = status;
    }

    pub(crate) fn songs(&self) -> Vec<Song> {
        self.inner.lock().unwrap().songs.clone()
    }

    pub(crate) fn playlists(&self) -> Vec<Playlist> {
        self.inner
            .lock()
            .unwrap()
            .playlists
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub(crate) fn members(&self, playlist: PlaylistId) -> Vec<SongId> {
        self.inner
            .lock()
            .unwrap()
            .playlists
            .iter()
            .find(|(p, _)| p.id == playlist)
            .map(|(_, members)| members.clone())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), LibraryError> {
        if self.inner.lock().unwrap().failing {
            Err(LibraryError::Backend("library unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl MediaLibrary for FakeLibrary {
    fn authorization(&self) -> AuthorizationStatus {
        self.inner.lock().unwrap().status
    }

    fn request_authorization(&self) -> Result<AuthorizationStatus, LibraryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.status == AuthorizationStatus::NotDetermined {
            inner.status = AuthorizationStatus::Authorized;
        }
        Ok(inner.status)
    }

    fn all_songs(&self) -> Result<Vec<Song>, LibraryError> {
        let delay = self.inner.lock().unwrap().delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.check()?;
        Ok(self.songs())
    }

    fn all_playlists(&self) -> Result<Vec<Playlist>, LibraryError> {
        self.check()?;
        Ok(self.playlists())
    }

    fn songs_in_playlist(&self, playlist: PlaylistId) -> Result<Vec<Song>, LibraryError> {
        self.check()?;
        let members = self.members(playlist);
        Ok(self
            .songs()
            .into_iter()
            .filter(|s| members.contains(&s.id))
            .collect())
    }

    fn playlist_contains(&self, playlist: PlaylistId, song: SongId) -> Result<bool, LibraryError> {
        self.check()?;
        Ok(self.members(playlist).contains(&song))
    }
}

#[async_trait]
impl PlaylistWriter for FakeLibrary {
    async fn add_song(&self, playlist: PlaylistId, song: SongId) -> Result<(), LibraryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_writes.contains(&playlist) {
            return Err(LibraryError::Backend("write refused".into()));
        }
        let (_, members) = inner
            .playlists
            .iter_mut()
            .find(|(p, _)| p.id == playlist)
            .ok_or(LibraryError::UnknownPlaylist(playlist))?;
        if !members.contains(&song) {
            members.push(song);
        }
        Ok(())
    }

    async fn create_playlist(&self, name: &str) -> Result<Playlist, LibraryError> {
        if name.trim().is_empty() {
            return Err(LibraryError::InvalidName(name.to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        let playlist = Playlist::new(id, Some(name.to_string()), PlaylistArtwork::None);
        inner.playlists.push((playlist.clone(), Vec::new()));
        Ok(playlist)
    }
}
