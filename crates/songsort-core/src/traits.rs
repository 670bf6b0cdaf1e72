use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, SettingsError};
use crate::library::{Playlist, PlaylistId, Song, SongId};
use crate::playback::{PlaybackState, StateCallback};
use crate::settings::SettingsData;

/// Estado del permiso de acceso a la biblioteca.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Authorized,
}

impl AuthorizationStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationStatus::Authorized)
    }
}

/// Proveedor de la biblioteca musical.
///
/// Las llamadas son bloqueantes: quien las use desde async debe moverlas a
/// `spawn_blocking`.
pub trait MediaLibrary: Send + Sync {
    fn authorization(&self) -> AuthorizationStatus;

    fn request_authorization(&self) -> Result<AuthorizationStatus, LibraryError>;

    fn all_songs(&self) -> Result<Vec<Song>, LibraryError>;

    fn all_playlists(&self) -> Result<Vec<Playlist>, LibraryError>;

    fn songs_in_playlist(&self, playlist: PlaylistId) -> Result<Vec<Song>, LibraryError>;

    /// Consulta en vivo, nunca contra una copia cacheada.
    fn playlist_contains(&self, playlist: PlaylistId, song: SongId) -> Result<bool, LibraryError>;
}

/// Colaborador que modifica playlists. Solo sabe añadir.
#[async_trait]
pub trait PlaylistWriter: Send + Sync {
    async fn add_song(&self, playlist: PlaylistId, song: SongId) -> Result<(), LibraryError>;

    async fn create_playlist(&self, name: &str) -> Result<Playlist, LibraryError>;
}

/// Almacenamiento durable de las preferencias.
pub trait SettingsBackend: Send {
    fn load(&self) -> Result<SettingsData, SettingsError>;

    fn store(&mut self, data: &SettingsData) -> Result<(), SettingsError>;
}

/// Reproductor de la plataforma.
pub trait PlayerBackend: Send {
    /// Carga la pista, detiene lo que sonara y vuelve a la posición cero.
    fn load(&mut self, song: &Song);

    fn play(&mut self);

    fn pause(&mut self);

    /// Desplazamiento relativo en segundos. El backend se encarga de acotar.
    fn seek_by(&mut self, delta_secs: f64);

    fn state(&self) -> PlaybackState;

    /// Registra el callback que recibe todos los cambios de estado,
    /// también los que no provoca el coordinador.
    fn set_state_callback(&mut self, callback: StateCallback);
}
