use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SettingsError;
use crate::library::PlaylistId;
use crate::selection::{DateRange, DateRangeMode, SelectionMode, SelectionSet};
use crate::traits::SettingsBackend;

/// Documento de preferencias tal como se persiste. Los nombres de las claves
/// son estables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    #[serde(rename = "songSelectionMode")]
    pub song_selection_mode: SelectionMode,

    #[serde(rename = "selectionNotInPlaylists")]
    pub selection_not_in_playlists: Vec<PlaylistId>,

    #[serde(rename = "selectionInPlaylists")]
    pub selection_in_playlists: Vec<PlaylistId>,

    #[serde(rename = "destinationPlaylists")]
    pub destination_playlists: Vec<PlaylistId>,

    #[serde(rename = "dateSelectionMode")]
    pub date_selection_mode: DateRangeMode,

    #[serde(rename = "dateSelectionModeStart", skip_serializing_if = "Option::is_none")]
    pub date_selection_mode_start: Option<DateTime<Utc>>,

    #[serde(rename = "dateSelectionModeEnd", skip_serializing_if = "Option::is_none")]
    pub date_selection_mode_end: Option<DateTime<Utc>>,

    #[serde(rename = "dateSelectionUpdates")]
    pub date_selection_updates: bool,

    #[serde(rename = "autoplaySongs")]
    pub autoplay_songs: bool,

    #[serde(rename = "sortingSessionsCount")]
    pub sorting_sessions_count: u64,
}

/// Preferencias con setters explícitos: cada cambio se persiste antes de
/// aplicarse en memoria, así que si el backend falla el estado no cambia.
pub struct Settings<B> {
    backend: B,
    data: SettingsData,
}

impl<B: SettingsBackend> Settings<B> {
    pub fn load(backend: B) -> Result<Self, SettingsError> {
        let data = backend.load()?;
        Ok(Settings { backend, data })
    }

    pub fn data(&self) -> &SettingsData {
        &self.data
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.data.song_selection_mode
    }

    pub fn stored_ids(&self, set: SelectionSet) -> &[PlaylistId] {
        match set {
            SelectionSet::Excluded => &self.data.selection_not_in_playlists,
            SelectionSet::Included => &self.data.selection_in_playlists,
            SelectionSet::Destination => &self.data.destination_playlists,
        }
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            mode: self.data.date_selection_mode,
            start: self.data.date_selection_mode_start,
            end: self.data.date_selection_mode_end,
            auto_advance: self.data.date_selection_updates,
        }
    }

    pub fn autoplay(&self) -> bool {
        self.data.autoplay_songs
    }

    pub fn sessions_count(&self) -> u64 {
        self.data.sorting_sessions_count
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) -> Result<(), SettingsError> {
        self.persist(|data| data.song_selection_mode = mode)
    }

    pub fn set_selection_ids(
        &mut self,
        set: SelectionSet,
        ids: Vec<PlaylistId>,
    ) -> Result<(), SettingsError> {
        self.persist(|data| match set {
            SelectionSet::Excluded => data.selection_not_in_playlists = ids,
            SelectionSet::Included => data.selection_in_playlists = ids,
            SelectionSet::Destination => data.destination_playlists = ids,
        })
    }

    pub fn set_date_range(&mut self, range: &DateRange) -> Result<(), SettingsError> {
        self.persist(|data| {
            data.date_selection_mode = range.mode;
            data.date_selection_mode_start = range.start;
            data.date_selection_mode_end = range.end;
            data.date_selection_updates = range.auto_advance;
        })
    }

    pub fn set_date_start(&mut self, start: DateTime<Utc>) -> Result<(), SettingsError> {
        self.persist(|data| data.date_selection_mode_start = Some(start))
    }

    pub fn set_autoplay(&mut self, autoplay: bool) -> Result<(), SettingsError> {
        self.persist(|data| data.autoplay_songs = autoplay)
    }

    /// Suma una sesión completada y devuelve el nuevo total.
    pub fn increment_sessions_count(&mut self) -> Result<u64, SettingsError> {
        self.persist(|data| data.sorting_sessions_count += 1)?;
        Ok(self.data.sorting_sessions_count)
    }

    fn persist(&mut self, update: impl FnOnce(&mut SettingsData)) -> Result<(), SettingsError> {
        let mut next = self.data.clone();
        update(&mut next);
        self.backend.store(&next)?;
        debug!("Preferencias guardadas");
        self.data = next;
        Ok(())
    }
}

/// Backend en memoria. Los clones comparten el mismo documento.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    data: Arc<Mutex<SettingsData>>,
}

impl MemorySettings {
    pub fn new(data: SettingsData) -> Self {
        MemorySettings {
            data: Arc::new(Mutex::new(data)),
        }
    }

    pub fn snapshot(&self) -> Result<SettingsData, SettingsError> {
        self.load()
    }
}

impl SettingsBackend for MemorySettings {
    fn load(&self) -> Result<SettingsData, SettingsError> {
        self.data
            .lock()
            .map(|data| data.clone())
            .map_err(|e| SettingsError::Load(e.to_string()))
    }

    fn store(&mut self, data: &SettingsData) -> Result<(), SettingsError> {
        let mut guard = self
            .data
            .lock()
            .map_err(|e| SettingsError::Store(e.to_string()))?;
        *guard = data.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::day;

    struct FailingBackend;

    impl SettingsBackend for FailingBackend {
        fn load(&self) -> Result<SettingsData, SettingsError> {
            Ok(SettingsData::default())
        }

        fn store(&mut self, _: &SettingsData) -> Result<(), SettingsError> {
            Err(SettingsError::Store("read-only".into()))
        }
    }

    #[test]
    fn setters_persist_immediately() {
        let backend = MemorySettings::default();
        let mut settings = Settings::load(backend.clone()).unwrap();

        settings.set_selection_mode(SelectionMode::AddedDate).unwrap();
        settings
            .set_selection_ids(SelectionSet::Destination, vec![3, 1])
            .unwrap();
        settings.set_autoplay(true).unwrap();
        settings.set_date_start(day(4)).unwrap();
        assert_eq!(settings.increment_sessions_count().unwrap(), 1);

        let stored = backend.snapshot().unwrap();
        assert_eq!(stored.song_selection_mode, SelectionMode::AddedDate);
        assert_eq!(stored.destination_playlists, vec![3, 1]);
        assert!(stored.autoplay_songs);
        assert_eq!(stored.date_selection_mode_start, Some(day(4)));
        assert_eq!(stored.sorting_sessions_count, 1);

        let reloaded = Settings::load(backend).unwrap();
        assert_eq!(reloaded.stored_ids(SelectionSet::Destination), &[3, 1]);
        assert_eq!(reloaded.date_range().start, Some(day(4)));
    }

    #[test]
    fn failed_store_leaves_state_untouched() {
        let mut settings = Settings::load(FailingBackend).unwrap();

        assert!(settings.set_autoplay(true).is_err());
        assert!(!settings.autoplay());
        assert!(settings.increment_sessions_count().is_err());
        assert_eq!(settings.sessions_count(), 0);
    }

    #[test]
    fn defaults() {
        let data = SettingsData::default();
        assert_eq!(data.song_selection_mode, SelectionMode::InNoPlaylist);
        assert_eq!(data.date_selection_mode, DateRangeMode::After);
        assert!(data.destination_playlists.is_empty());
    }
}
