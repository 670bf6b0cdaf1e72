use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::library::{Song, SongId};
use crate::traits::PlayerBackend;

/// Salto de los botones de avance y retroceso.
pub const JUMP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

pub type StateCallback = Box<dyn FnMut(PlaybackState) + Send>;

type Subscriber = Arc<Mutex<Option<StateCallback>>>;

/// Envoltorio fino sobre el reproductor para previsualizar la canción en
/// revisión. Sin backend todas las operaciones son no-ops y nunca se informa
/// `Playing`.
pub struct PlaybackCoordinator {
    backend: Option<Box<dyn PlayerBackend>>,
    subscriber: Subscriber,
    loaded: Option<SongId>,
}

impl PlaybackCoordinator {
    pub fn new(backend: Option<Box<dyn PlayerBackend>>) -> Self {
        let subscriber: Subscriber = Arc::new(Mutex::new(None));
        let mut backend = backend;

        if let Some(backend) = backend.as_mut() {
            let slot = Arc::clone(&subscriber);
            backend.set_state_callback(Box::new(move |state| notify(&slot, state)));
        }

        PlaybackCoordinator {
            backend,
            subscriber,
            loaded: None,
        }
    }

    pub fn without_backend() -> Self {
        Self::new(None)
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Registra el único receptor de cambios de estado, sustituyendo al anterior.
    pub fn subscribe(&mut self, callback: StateCallback) {
        if let Ok(mut slot) = self.subscriber.lock() {
            *slot = Some(callback);
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.backend
            .as_ref()
            .map(|backend| backend.state())
            .unwrap_or_default()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn loaded(&self) -> Option<SongId> {
        self.loaded
    }

    pub fn load(&mut self, song: &Song) {
        if let Some(backend) = self.backend.as_mut() {
            trace!(song = song.id, "Cargando pista");
            backend.load(song);
            self.loaded = Some(song.id);
        }
    }

    /// Alterna reproducción. Si no hay nada cargado carga `current` primero.
    pub fn play_pause(&mut self, current: Option<&Song>) {
        if self.state() == PlaybackState::Stopped || self.loaded.is_none() {
            if let Some(song) = current {
                if self.loaded != Some(song.id) {
                    self.load(song);
                }
            }
        }

        if self.is_playing() {
            self.pause();
        } else {
            self.resume();
        }
    }

    pub fn resume(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            backend.play();
        }
    }

    pub fn pause(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            backend.pause();
        }
    }

    /// Desplaza la posición en segundos; negativo retrocede.
    pub fn seek_by(&mut self, delta_secs: f64) {
        if let Some(backend) = self.backend.as_mut() {
            backend.seek_by(delta_secs);
        }
    }

    pub fn jump_forward(&mut self) {
        self.seek_by(JUMP_INTERVAL.as_secs_f64());
    }

    pub fn jump_backward(&mut self) {
        self.seek_by(-JUMP_INTERVAL.as_secs_f64());
    }
}

fn notify(slot: &Subscriber, state: PlaybackState) {
    if let Ok(mut guard) = slot.lock() {
        if let Some(callback) = guard.as_mut() {
            callback(state);
        }
    }
}
