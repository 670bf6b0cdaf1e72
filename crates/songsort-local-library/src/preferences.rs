use std::{
    fs,
    path::{Path, PathBuf},
};

use songsort_core::{SettingsBackend, SettingsData, SettingsError};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Preferencias persistidas en un fichero TOML.
///
/// Si el fichero no existe se usan los valores por defecto. Las escrituras
/// van a un temporal que luego se renombra encima del original.
#[derive(Debug, Clone)]
pub struct TomlPreferences {
    path: PathBuf,
}

impl TomlPreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TomlPreferences { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SettingsData, ConfigError> {
        if !self.path.exists() {
            info!("Sin preferencias en {}, usando valores por defecto", self.path.display());
            return Ok(SettingsData::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn write(&self, data: &SettingsData) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(data)?;
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Preferencias escritas en {}", self.path.display());
        Ok(())
    }
}

impl SettingsBackend for TomlPreferences {
    fn load(&self) -> Result<SettingsData, SettingsError> {
        self.read().map_err(|e| SettingsError::Load(e.to_string()))
    }

    fn store(&mut self, data: &SettingsData) -> Result<(), SettingsError> {
        self.write(data).map_err(|e| SettingsError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use songsort_core::{DateRangeMode, SelectionMode};

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = TomlPreferences::new(dir.path().join("preferences.toml"));

        assert_eq!(prefs.load().unwrap(), SettingsData::default());
    }

    #[test]
    fn stored_document_round_trips_with_stable_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = TomlPreferences::new(dir.path().join("prefs").join("preferences.toml"));

        let data = SettingsData {
            song_selection_mode: SelectionMode::AddedDate,
            destination_playlists: vec![3, 7],
            date_selection_mode: DateRangeMode::Between,
            date_selection_mode_start: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            date_selection_mode_end: Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()),
            date_selection_updates: true,
            autoplay_songs: true,
            sorting_sessions_count: 4,
            ..SettingsData::default()
        };
        prefs.store(&data).unwrap();

        let raw = fs::read_to_string(prefs.path()).unwrap();
        assert!(raw.contains("destinationPlaylists"));
        assert!(raw.contains("sortingSessionsCount = 4"));
        assert_eq!(prefs.load().unwrap(), data);
    }

    #[test]
    fn unknown_keys_are_ignored_and_missing_keys_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "autoplaySongs = true\nlegacyFlag = 1\n").unwrap();

        let data = TomlPreferences::new(&path).load().unwrap();
        assert!(data.autoplay_songs);
        assert_eq!(data.sorting_sessions_count, 0);
    }

    #[test]
    fn corrupt_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "autoplaySongs = [").unwrap();

        assert!(matches!(TomlPreferences::new(&path).load(), Err(SettingsError::Load(_))));
    }
}
