use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::SessionError;
use crate::library::{Playlist, PlaylistId, Song};
use crate::traits::MediaLibrary;

/// Estados de una sesión de ordenación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Reviewing { cursor: usize },
    Finished { count: usize },
    Cancelled { count: usize },
    /// La consulta no devolvió canciones: no se llegó a revisar ninguna.
    NoSongsFound,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Reviewing { .. } => "reviewing",
            SessionState::Finished { .. } => "finished",
            SessionState::Cancelled { .. } => "cancelled",
            SessionState::NoSongsFound => "no-songs-found",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Finished { .. } | SessionState::Cancelled { .. } | SessionState::NoSongsFound
        )
    }

    /// Canciones procesadas según el estado terminal.
    pub fn count(&self) -> Option<usize> {
        match self {
            SessionState::Finished { count } | SessionState::Cancelled { count } => Some(*count),
            SessionState::NoSongsFound => Some(0),
            _ => None,
        }
    }
}

/// Selección de destinos para la canción en revisión.
///
/// Las playlists bloqueadas ya contenían la canción al empezar a revisarla y
/// no se pueden desmarcar: la biblioteca no permite quitar canciones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSelection {
    locked: BTreeSet<PlaylistId>,
    selected: BTreeSet<PlaylistId>,
}

impl ReviewSelection {
    pub fn new(locked: BTreeSet<PlaylistId>) -> Self {
        ReviewSelection {
            selected: locked.clone(),
            locked,
        }
    }

    pub fn is_locked(&self, playlist: PlaylistId) -> bool {
        self.locked.contains(&playlist)
    }

    pub fn is_selected(&self, playlist: PlaylistId) -> bool {
        self.selected.contains(&playlist)
    }

    /// Devuelve si la playlist queda seleccionada.
    pub fn toggle(&mut self, playlist: PlaylistId) -> bool {
        if self.is_locked(playlist) {
            return true;
        }
        if !self.selected.remove(&playlist) {
            self.selected.insert(playlist);
        }
        self.is_selected(playlist)
    }

    /// Playlists marcadas que todavía no contienen la canción.
    pub fn additions(&self) -> impl Iterator<Item = PlaylistId> + '_ {
        self.selected.difference(&self.locked).copied()
    }

    pub fn locked(&self) -> &BTreeSet<PlaylistId> {
        &self.locked
    }
}

/// Lo que hay que escribir al confirmar una canción.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub song: Song,
    pub playlists: Vec<Playlist>,
}

/// La cola dividida en la posición actual.
#[derive(Debug, Clone, Copy)]
pub struct Queue<'a> {
    pub sorted: &'a [Song],
    pub remaining: &'a [Song],
}

/// Máquina de estados de la revisión secuencial.
///
/// `Idle → Loading → Reviewing(0..n) → Finished`, con `Cancelled` accesible
/// solo desde `Reviewing` y `NoSongsFound` si la carga llega vacía.
#[derive(Debug)]
pub struct SortSession {
    state: SessionState,
    songs: Vec<Song>,
    destination: Vec<Playlist>,
    review: ReviewSelection,
}

impl Default for SortSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SortSession {
    pub fn new() -> Self {
        SortSession {
            state: SessionState::Idle,
            songs: Vec::new(),
            destination: Vec::new(),
            review: ReviewSelection::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn destination(&self) -> &[Playlist] {
        &self.destination
    }

    pub fn review(&self) -> Option<&ReviewSelection> {
        match self.state {
            SessionState::Reviewing { .. } => Some(&self.review),
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&Song> {
        match self.state {
            SessionState::Reviewing { cursor } => self.songs.get(cursor),
            _ => None,
        }
    }

    /// `Idle → Loading`. Fija los destinos de toda la sesión.
    pub fn begin_loading(&mut self, destination: Vec<Playlist>) -> Result<(), SessionError> {
        self.ensure(matches!(self.state, SessionState::Idle), "begin sorting")?;
        self.destination = destination;
        self.state = SessionState::Loading;
        Ok(())
    }

    /// `Loading → Reviewing(0)`, o `NoSongsFound` si no hay canciones.
    pub fn load(
        &mut self,
        songs: Vec<Song>,
        library: &dyn MediaLibrary,
    ) -> Result<SessionState, SessionError> {
        self.ensure(matches!(self.state, SessionState::Loading), "load songs")?;

        if songs.is_empty() {
            self.state = SessionState::NoSongsFound;
            return Ok(self.state);
        }

        debug!(count = songs.len(), "Sesión cargada");
        self.songs = songs;
        self.enter_review(0, library);
        Ok(self.state)
    }

    /// Marca o desmarca un destino para la canción actual. Las playlists que no
    /// son destino se ignoran.
    pub fn toggle(&mut self, playlist: PlaylistId) -> Result<bool, SessionError> {
        self.ensure(matches!(self.state, SessionState::Reviewing { .. }), "toggle a playlist")?;

        if !self.destination.iter().any(|p| p.id == playlist) {
            return Ok(false);
        }
        Ok(self.review.toggle(playlist))
    }

    /// Añade un destino creado durante la sesión. No cambia la canción actual.
    pub fn add_destination(&mut self, playlist: Playlist) {
        if !self.destination.iter().any(|p| p.id == playlist.id) {
            self.destination.push(playlist);
        }
    }

    /// Confirma la canción actual y avanza. Devuelve las escrituras pendientes.
    pub fn commit_and_advance(&mut self, library: &dyn MediaLibrary) -> Result<Commit, SessionError> {
        let cursor = match self.state {
            SessionState::Reviewing { cursor } => cursor,
            _ => return Err(self.invalid("commit")),
        };

        let additions: BTreeSet<PlaylistId> = self.review.additions().collect();
        let commit = Commit {
            song: self.songs[cursor].clone(),
            playlists: self
                .destination
                .iter()
                .filter(|p| additions.contains(&p.id))
                .cloned()
                .collect(),
        };

        let next = cursor + 1;
        if next >= self.songs.len() {
            self.state = SessionState::Finished {
                count: self.songs.len(),
            };
            self.review = ReviewSelection::default();
        } else {
            self.enter_review(next, library);
        }

        Ok(commit)
    }

    /// `Reviewing(i) → Cancelled(i)`. La canción actual no se confirma.
    pub fn cancel(&mut self) -> Result<usize, SessionError> {
        let cursor = match self.state {
            SessionState::Reviewing { cursor } => cursor,
            _ => return Err(self.invalid("cancel")),
        };

        self.state = SessionState::Cancelled { count: cursor };
        self.review = ReviewSelection::default();
        Ok(cursor)
    }

    /// Vuelve a `Idle` y vacía la cola. No se puede durante la revisión.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.ensure(
            !matches!(self.state, SessionState::Reviewing { .. }),
            "reset",
        )?;
        *self = SortSession::new();
        Ok(())
    }

    /// Posición actual (desde 1) y total.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match self.state {
            SessionState::Reviewing { cursor } => Some((cursor + 1, self.songs.len())),
            _ => None,
        }
    }

    pub fn queue(&self) -> Queue<'_> {
        let split = match self.state {
            SessionState::Reviewing { cursor } => cursor,
            SessionState::Finished { count } | SessionState::Cancelled { count } => count,
            _ => 0,
        }
        .min(self.songs.len());

        let (sorted, remaining) = self.songs.split_at(split);
        Queue { sorted, remaining }
    }

    fn enter_review(&mut self, cursor: usize, library: &dyn MediaLibrary) {
        let song = &self.songs[cursor];
        let locked = self
            .destination
            .iter()
            .filter(|playlist| match library.playlist_contains(playlist.id, song.id) {
                Ok(contains) => contains,
                Err(e) => {
                    warn!(playlist = playlist.id, song = song.id, error = %e, "No se pudo comprobar la pertenencia");
                    false
                }
            })
            .map(|playlist| playlist.id)
            .collect();

        self.review = ReviewSelection::new(locked);
        self.state = SessionState::Reviewing { cursor };
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), SessionError> {
        if allowed {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidState {
            action,
            state: self.state.name(),
        }
    }
}
