use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SortError};
use crate::library::{Playlist, PlaylistId};

/// Cómo se eligen las canciones candidatas de una sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Canciones que no están en ninguna playlist.
    #[default]
    InNoPlaylist,
    NotInDestination,
    NotInSelected,
    InSelected,
    AllSongs,
    AddedDate,
    /// Solo se usa mientras se editan los destinos; no produce candidatas.
    Destination,
}

impl SelectionMode {
    pub const ALL: &'static [SelectionMode] = &[
        SelectionMode::InNoPlaylist,
        SelectionMode::NotInDestination,
        SelectionMode::NotInSelected,
        SelectionMode::InSelected,
        SelectionMode::AllSongs,
        SelectionMode::AddedDate,
        SelectionMode::Destination,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SelectionMode::InNoPlaylist => "in-no-playlist",
            SelectionMode::NotInDestination => "not-in-destination",
            SelectionMode::NotInSelected => "not-in-selected",
            SelectionMode::InSelected => "in-selected",
            SelectionMode::AllSongs => "all-songs",
            SelectionMode::AddedDate => "added-date",
            SelectionMode::Destination => "destination",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SelectionMode::InNoPlaylist => "Songs in no playlist",
            SelectionMode::NotInDestination => "Songs not in any destination playlist",
            SelectionMode::NotInSelected => "Songs not in the selected playlists",
            SelectionMode::InSelected => "Songs in the selected playlists",
            SelectionMode::AllSongs => "All songs",
            SelectionMode::AddedDate => "Songs added to the library in a date range",
            SelectionMode::Destination => "Destination playlists",
        }
    }

    /// El conjunto de playlists del que depende el modo, si depende de alguno.
    pub fn backing_set(&self) -> Option<SelectionSet> {
        match self {
            SelectionMode::NotInSelected => Some(SelectionSet::Excluded),
            SelectionMode::InSelected => Some(SelectionSet::Included),
            _ => None,
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SelectionMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| format!("unknown selection mode: {s}"))
    }
}

/// Los tres conjuntos de playlists que se persisten por separado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionSet {
    /// Usado por `NotInSelected`.
    Excluded,
    /// Usado por `InSelected`.
    Included,
    Destination,
}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SelectionSet::Excluded => "exclude",
            SelectionSet::Included => "include",
            SelectionSet::Destination => "destination",
        })
    }
}

impl FromStr for SelectionSet {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exclude" | "excluded" => Ok(SelectionSet::Excluded),
            "include" | "included" => Ok(SelectionSet::Included),
            "destination" | "destinations" => Ok(SelectionSet::Destination),
            other => Err(format!("unknown playlist set: {other}")),
        }
    }
}

/// Conjuntos de playlists ya resueltos contra la lista cargada.
///
/// Cada conjunto conserva el orden de la lista de playlists, no el orden
/// en el que el usuario las marcó.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistSelections {
    pub excluded: Vec<Playlist>,
    pub included: Vec<Playlist>,
    pub destination: Vec<Playlist>,
}

impl PlaylistSelections {
    /// Reconstruye los conjuntos a partir de ids persistidos. Los ids que ya no
    /// existen se descartan; un destino vacío equivale a todas las playlists.
    pub fn rehydrate(
        playlists: &[Playlist],
        excluded: &[PlaylistId],
        included: &[PlaylistId],
        destination: &[PlaylistId],
    ) -> Self {
        let mut destination = resolve(playlists, destination);
        if destination.is_empty() {
            destination = playlists.to_vec();
        }

        PlaylistSelections {
            excluded: resolve(playlists, excluded),
            included: resolve(playlists, included),
            destination,
        }
    }

    pub fn get(&self, set: SelectionSet) -> &[Playlist] {
        match set {
            SelectionSet::Excluded => &self.excluded,
            SelectionSet::Included => &self.included,
            SelectionSet::Destination => &self.destination,
        }
    }

    fn get_mut(&mut self, set: SelectionSet) -> &mut Vec<Playlist> {
        match set {
            SelectionSet::Excluded => &mut self.excluded,
            SelectionSet::Included => &mut self.included,
            SelectionSet::Destination => &mut self.destination,
        }
    }

    pub fn ids(&self, set: SelectionSet) -> Vec<PlaylistId> {
        self.get(set).iter().map(|p| p.id).collect()
    }

    pub fn contains(&self, set: SelectionSet, playlist: PlaylistId) -> bool {
        self.get(set).iter().any(|p| p.id == playlist)
    }

    /// Sustituye el conjunto por los ids dados, filtrando los desconocidos.
    pub fn replace(&mut self, set: SelectionSet, ids: &[PlaylistId], playlists: &[Playlist]) {
        *self.get_mut(set) = resolve(playlists, ids);
    }

    pub fn select_all(&mut self, set: SelectionSet, playlists: &[Playlist]) {
        *self.get_mut(set) = playlists.to_vec();
    }

    pub fn clear(&mut self, set: SelectionSet) {
        self.get_mut(set).clear();
    }

    /// Marca o desmarca una playlist. Devuelve si quedó seleccionada.
    pub fn toggle(&mut self, set: SelectionSet, playlist: PlaylistId, playlists: &[Playlist]) -> bool {
        let mut ids = self.ids(set);
        let selected = match ids.iter().position(|id| *id == playlist) {
            Some(index) => {
                ids.remove(index);
                false
            }
            None => {
                ids.push(playlist);
                true
            }
        };
        self.replace(set, &ids, playlists);
        selected && self.contains(set, playlist)
    }
}

fn resolve(playlists: &[Playlist], ids: &[PlaylistId]) -> Vec<Playlist> {
    playlists
        .iter()
        .filter(|p| ids.contains(&p.id))
        .cloned()
        .collect()
}

/// Comprobaciones previas a una sesión. No toca la biblioteca.
pub fn preflight(mode: SelectionMode, selections: &PlaylistSelections) -> Result<()> {
    if let Some(set) = mode.backing_set() {
        if selections.get(set).is_empty() {
            return Err(SortError::EmptySelection(mode));
        }
    }

    if selections.destination.is_empty() {
        return Err(SortError::NoDestination);
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRangeMode {
    Before,
    #[default]
    After,
    #[serde(alias = "range")]
    Between,
}

impl fmt::Display for DateRangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DateRangeMode::Before => "before",
            DateRangeMode::After => "after",
            DateRangeMode::Between => "between",
        })
    }
}

impl FromStr for DateRangeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "before" => Ok(DateRangeMode::Before),
            "after" => Ok(DateRangeMode::After),
            "between" | "range" => Ok(DateRangeMode::Between),
            other => Err(format!("unknown date mode: {other}")),
        }
    }
}

/// Filtro por fecha de alta en la biblioteca. Los límites son exclusivos y
/// un límite ausente no acota.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub mode: DateRangeMode,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub auto_advance: bool,
}

impl DateRange {
    /// Límites efectivos según el modo: `before` ignora el inicio y `after` el fin.
    pub fn bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self.mode {
            DateRangeMode::Before => (None, self.end),
            DateRangeMode::After => (self.start, None),
            DateRangeMode::Between => (self.start, self.end),
        }
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds();
        start.is_none_or(|start| date > start) && end.is_none_or(|end| date < end)
    }

    /// Si al confirmar una canción hay que mover el inicio a su fecha de alta.
    pub fn advances_on_commit(&self) -> bool {
        self.mode == DateRangeMode::After && self.auto_advance
    }
}
