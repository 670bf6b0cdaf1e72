use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{Level, debug, info, instrument, warn};

use crate::error::{LibraryError, Result, SortError};
use crate::events::SortEvent;
use crate::library::{Playlist, PlaylistId, genre::normalize};
use crate::playback::{PlaybackCoordinator, PlaybackState};
use crate::query::LibraryQueries;
use crate::selection::{DateRange, PlaylistSelections, SelectionMode, SelectionSet, preflight};
use crate::session::{Commit, SessionState, SortSession};
use crate::settings::Settings;
use crate::traits::{AuthorizationStatus, MediaLibrary, PlaylistWriter, SettingsBackend};

enum WriteJob {
    Commit(Commit),
    Flush(oneshot::Sender<()>),
}

/// Estado de la aplicación: lo construye quien arranca el proceso y se pasa
/// por referencia a quien lo necesite.
///
/// Las consultas a la biblioteca corren en el pool bloqueante de tokio y el
/// organizador consume el resultado antes de tocar la sesión. Las escrituras
/// en playlists van a una tarea propia que las procesa en orden de cursor y
/// avisa de los fallos por el canal de eventos.
pub struct Organizer<S> {
    library: Arc<dyn MediaLibrary>,
    writer: Arc<dyn PlaylistWriter>,
    settings: Settings<S>,
    playlists: Vec<Playlist>,
    selections: PlaylistSelections,
    session: SortSession,
    player: PlaybackCoordinator,
    events: mpsc::UnboundedSender<SortEvent>,
    jobs: mpsc::UnboundedSender<WriteJob>,
    access: broadcast::Sender<AuthorizationStatus>,
}

impl<S: SettingsBackend> Organizer<S> {
    /// Tiene que llamarse dentro de un runtime de tokio.
    pub fn new(
        library: Arc<dyn MediaLibrary>,
        writer: Arc<dyn PlaylistWriter>,
        settings: S,
        mut player: PlaybackCoordinator,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SortEvent>)> {
        let settings = Settings::load(settings)?;
        let (events, events_rx) = mpsc::unbounded_channel();
        let (jobs, jobs_rx) = mpsc::unbounded_channel();
        let (access, _) = broadcast::channel(4);

        tokio::spawn(run_writer(Arc::clone(&writer), jobs_rx, events.clone()));

        let playback_events = events.clone();
        player.subscribe(Box::new(move |state| {
            let _ = playback_events.send(SortEvent::PlaybackChanged(state));
        }));

        let organizer = Organizer {
            library,
            writer,
            settings,
            playlists: Vec::new(),
            selections: PlaylistSelections::default(),
            session: SortSession::new(),
            player,
            events,
            jobs,
            access,
        };

        Ok((organizer, events_rx))
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn selections(&self) -> &PlaylistSelections {
        &self.selections
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.settings.selection_mode()
    }

    pub fn date_range(&self) -> DateRange {
        self.settings.date_range()
    }

    pub fn autoplay(&self) -> bool {
        self.settings.autoplay()
    }

    pub fn sessions_count(&self) -> u64 {
        self.settings.sessions_count()
    }

    pub fn session(&self) -> &SortSession {
        &self.session
    }

    pub fn authorization(&self) -> AuthorizationStatus {
        self.library.authorization()
    }

    /// Recarga las playlists y reconstruye los conjuntos guardados.
    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub async fn load_playlists(&mut self) -> Result<&[Playlist]> {
        let library = Arc::clone(&self.library);
        let mut playlists = tokio::task::spawn_blocking(move || library.all_playlists()).await??;
        sort_playlists(&mut playlists);

        self.selections = PlaylistSelections::rehydrate(
            &playlists,
            self.settings.stored_ids(SelectionSet::Excluded),
            self.settings.stored_ids(SelectionSet::Included),
            self.settings.stored_ids(SelectionSet::Destination),
        );
        self.playlists = playlists;

        info!(count = self.playlists.len(), "Playlists cargadas");
        Ok(&self.playlists)
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) -> Result<()> {
        self.settings.set_selection_mode(mode)?;
        Ok(())
    }

    pub fn set_date_range(&mut self, range: &DateRange) -> Result<()> {
        self.settings.set_date_range(range)?;
        Ok(())
    }

    pub fn set_autoplay(&mut self, autoplay: bool) -> Result<()> {
        self.settings.set_autoplay(autoplay)?;
        Ok(())
    }

    pub fn toggle_selection(&mut self, set: SelectionSet, playlist: PlaylistId) -> Result<bool> {
        self.edit_selection(set, |selections, all| selections.toggle(set, playlist, all))
    }

    pub fn select_all(&mut self, set: SelectionSet) -> Result<()> {
        self.edit_selection(set, |selections, all| selections.select_all(set, all))
    }

    pub fn clear_selection(&mut self, set: SelectionSet) -> Result<()> {
        self.edit_selection(set, |selections, _| selections.clear(set))
    }

    pub fn replace_selection(&mut self, set: SelectionSet, ids: &[PlaylistId]) -> Result<()> {
        self.edit_selection(set, |selections, all| selections.replace(set, ids, all))
    }

    /// Valida, consulta la biblioteca en segundo plano y arranca la revisión.
    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub async fn begin_sorting(&mut self) -> Result<SessionState> {
        let mode = self.settings.selection_mode();
        preflight(mode, &self.selections)?;

        // Un `Loading` pendiente es de una carga cuyo futuro se descartó.
        let state = self.session.state();
        if state.is_terminal() || state == SessionState::Loading {
            self.session.reset()?;
        }
        self.session.begin_loading(self.selections.destination.clone())?;

        let library = Arc::clone(&self.library);
        let selections = self.selections.clone();
        let range = self.settings.date_range();
        let queried = tokio::task::spawn_blocking(move || {
            LibraryQueries::new(library.as_ref()).candidates(mode, &selections, &range)
        })
        .await;

        let songs = match queried {
            Ok(songs) => songs,
            Err(e) => {
                self.session.reset()?;
                return Err(e.into());
            }
        };

        let state = self.session.load(songs, self.library.as_ref())?;
        match state {
            SessionState::Reviewing { .. } => {
                info!(mode = %mode, count = self.session.songs().len(), "Sesión de ordenación iniciada");
                self.present_current();
            }
            _ => info!(mode = %mode, "No se encontraron canciones para ordenar"),
        }

        Ok(state)
    }

    pub fn toggle(&mut self, playlist: PlaylistId) -> Result<bool> {
        Ok(self.session.toggle(playlist)?)
    }

    /// Confirma la canción actual y pasa a la siguiente. Las escrituras se
    /// encolan sin esperar; sus fallos llegan como `SortEvent::WriteFailed`.
    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub fn commit_and_advance(&mut self) -> Result<SessionState> {
        let added = self.session.current().map(|song| song.date_added);
        if let Some(added) = added {
            if self.settings.selection_mode() == SelectionMode::AddedDate
                && self.settings.date_range().advances_on_commit()
            {
                if let Err(e) = self.settings.set_date_start(added) {
                    warn!(error = %e, "No se pudo guardar el nuevo inicio de fechas");
                }
            }
        }

        let commit = self.session.commit_and_advance(self.library.as_ref())?;
        if !commit.playlists.is_empty() && self.jobs.send(WriteJob::Commit(commit)).is_err() {
            warn!("La cola de escritura está cerrada, se pierde la asignación");
        }

        let state = self.session.state();
        match state {
            SessionState::Reviewing { .. } => self.present_current(),
            SessionState::Finished { count } => {
                self.player.pause();
                self.end_session(count, false);
            }
            _ => {}
        }

        Ok(state)
    }

    /// Aborta la revisión. Devuelve cuántas canciones se llegaron a confirmar.
    pub fn cancel(&mut self) -> Result<usize> {
        let count = self.session.cancel()?;
        self.player.pause();
        if count > 0 {
            self.end_session(count, true);
        }
        Ok(count)
    }

    /// Cierra una sesión terminada y vacía la cola.
    pub fn finish(&mut self) -> Result<()> {
        self.session.reset()?;
        Ok(())
    }

    /// Crea una playlist y la añade a los destinos, también a los de la sesión
    /// en curso.
    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub async fn create_destination_playlist(&mut self, name: &str) -> Result<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SortError::PlaylistCreation(LibraryError::InvalidName(
                name.to_string(),
            )));
        }

        let playlist = self
            .writer
            .create_playlist(name)
            .await
            .map_err(SortError::PlaylistCreation)?;

        self.playlists.push(playlist.clone());
        sort_playlists(&mut self.playlists);

        let id = playlist.id;
        self.edit_selection(SelectionSet::Destination, |selections, all| {
            let mut ids = selections.ids(SelectionSet::Destination);
            ids.push(id);
            selections.replace(SelectionSet::Destination, &ids, all);
        })?;

        if matches!(self.session.state(), SessionState::Reviewing { .. }) {
            self.session.add_destination(playlist.clone());
        }

        info!(playlist = %playlist.name, id, "Playlist creada");
        Ok(playlist)
    }

    /// Pide acceso a la biblioteca. Si se concede, avisa a los suscriptores.
    pub async fn request_access(&self) -> Result<AuthorizationStatus> {
        let before = self.library.authorization();
        let library = Arc::clone(&self.library);
        let status = tokio::task::spawn_blocking(move || library.request_authorization()).await??;

        if status.is_authorized() && !before.is_authorized() {
            info!("Acceso a la biblioteca concedido");
            let _ = self.access.send(status);
        }
        Ok(status)
    }

    pub fn subscribe_access(&self) -> broadcast::Receiver<AuthorizationStatus> {
        self.access.subscribe()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.player.state()
    }

    pub fn play_pause(&mut self) {
        let current = self.session.current().cloned();
        self.player.play_pause(current.as_ref());
    }

    pub fn jump_forward(&mut self) {
        self.player.jump_forward();
    }

    pub fn jump_backward(&mut self) {
        self.player.jump_backward();
    }

    /// Espera a que se procesen las escrituras encoladas hasta ahora.
    pub async fn flush_writes(&self) {
        let (done, wait) = oneshot::channel();
        if self.jobs.send(WriteJob::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    fn edit_selection<T>(
        &mut self,
        set: SelectionSet,
        edit: impl FnOnce(&mut PlaylistSelections, &[Playlist]) -> T,
    ) -> Result<T> {
        let mut next = self.selections.clone();
        let outcome = edit(&mut next, &self.playlists);
        self.settings.set_selection_ids(set, next.ids(set))?;
        self.selections = next;
        Ok(outcome)
    }

    fn present_current(&mut self) {
        let Some(song) = self.session.current().cloned() else {
            return;
        };
        self.player.load(&song);
        if self.settings.autoplay() {
            self.player.resume();
        }
    }

    fn end_session(&mut self, count: usize, cancelled: bool) {
        match self.settings.increment_sessions_count() {
            Ok(total) => info!(count, cancelled, total, "Sesión de ordenación terminada"),
            Err(e) => warn!(error = %e, "No se pudo guardar el contador de sesiones"),
        }
        let _ = self.events.send(SortEvent::SessionEnded { count, cancelled });
    }
}

fn sort_playlists(playlists: &mut [Playlist]) {
    playlists.sort_by_cached_key(|p| (normalize(&p.name), p.id));
}

async fn run_writer(
    writer: Arc<dyn PlaylistWriter>,
    mut jobs: mpsc::UnboundedReceiver<WriteJob>,
    events: mpsc::UnboundedSender<SortEvent>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            WriteJob::Flush(done) => {
                let _ = done.send(());
            }
            WriteJob::Commit(commit) => {
                for playlist in commit.playlists {
                    match writer.add_song(playlist.id, commit.song.id).await {
                        Ok(()) => {
                            debug!(song = commit.song.id, playlist = playlist.id, "Canción añadida");
                            let _ = events.send(SortEvent::SongAdded {
                                song: commit.song.id,
                                playlist: playlist.id,
                            });
                        }
                        Err(error) => {
                            warn!(song = %commit.song.title, playlist = %playlist.name, error = %error, "No se pudo añadir la canción");
                            let _ = events.send(SortEvent::WriteFailed {
                                song: commit.song.title.clone(),
                                playlist: playlist.name.clone(),
                                error,
                            });
                        }
                    }
                }
            }
        }
    }
    debug!("Cola de escritura cerrada");
}
