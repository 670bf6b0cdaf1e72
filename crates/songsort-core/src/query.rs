use std::collections::HashSet;

use tracing::{Level, instrument, warn};

use crate::error::LibraryError;
use crate::library::{Playlist, Song, genre::normalize};
use crate::selection::{DateRange, PlaylistSelections, SelectionMode};
use crate::traits::MediaLibrary;

/// Consultas derivadas sobre la biblioteca: diferencias de conjuntos sobre
/// playlists y filtros por fecha de alta.
///
/// Todas son de solo lectura. Si el proveedor falla se registra el error y se
/// devuelve un conjunto vacío, que quien llama trata como "sin canciones".
pub struct LibraryQueries<'a> {
    library: &'a dyn MediaLibrary,
}

impl<'a> LibraryQueries<'a> {
    pub fn new(library: &'a dyn MediaLibrary) -> Self {
        LibraryQueries { library }
    }

    pub fn all_songs(&self) -> HashSet<Song> {
        or_empty("all_songs", self.try_all_songs())
    }

    /// Unión de las canciones de todas las playlists dadas.
    pub fn songs_in_playlists(&self, playlists: &[Playlist]) -> HashSet<Song> {
        or_empty("songs_in_playlists", self.try_songs_in_playlists(playlists))
    }

    /// Todas las canciones menos las que están en alguna de las playlists dadas.
    pub fn songs_not_in_playlists(&self, playlists: &[Playlist]) -> HashSet<Song> {
        or_empty("songs_not_in_playlists", self.try_songs_not_in_playlists(playlists))
    }

    pub fn in_no_playlist(&self) -> HashSet<Song> {
        let result = self
            .library
            .all_playlists()
            .and_then(|playlists| self.try_songs_not_in_playlists(&playlists));
        or_empty("in_no_playlist", result)
    }

    pub fn not_in_destination_playlists(&self, destination: &[Playlist]) -> HashSet<Song> {
        self.songs_not_in_playlists(destination)
    }

    pub fn added_in_date_range(&self, range: &DateRange) -> HashSet<Song> {
        let result = self.try_all_songs().map(|songs| {
            songs
                .into_iter()
                .filter(|song| range.contains(song.date_added))
                .collect()
        });
        or_empty("added_in_date_range", result)
    }

    /// Resuelve el modo de selección y devuelve la cola ya ordenada.
    #[instrument(level = Level::DEBUG, skip(self, selections, range))]
    pub fn candidates(
        &self,
        mode: SelectionMode,
        selections: &PlaylistSelections,
        range: &DateRange,
    ) -> Vec<Song> {
        let songs = match mode {
            SelectionMode::InNoPlaylist => self.in_no_playlist(),
            SelectionMode::NotInDestination => {
                self.not_in_destination_playlists(&selections.destination)
            }
            SelectionMode::NotInSelected => self.songs_not_in_playlists(&selections.excluded),
            SelectionMode::InSelected => self.songs_in_playlists(&selections.included),
            SelectionMode::AllSongs => self.all_songs(),
            SelectionMode::AddedDate => self.added_in_date_range(range),
            SelectionMode::Destination => HashSet::new(),
        };

        sort_for_session(songs)
    }

    fn try_all_songs(&self) -> Result<HashSet<Song>, LibraryError> {
        Ok(self.library.all_songs()?.into_iter().collect())
    }

    fn try_songs_in_playlists(&self, playlists: &[Playlist]) -> Result<HashSet<Song>, LibraryError> {
        let mut songs = HashSet::new();
        for playlist in playlists {
            songs.extend(self.library.songs_in_playlist(playlist.id)?);
        }
        Ok(songs)
    }

    fn try_songs_not_in_playlists(
        &self,
        playlists: &[Playlist],
    ) -> Result<HashSet<Song>, LibraryError> {
        let all = self.try_all_songs()?;
        let listed = self.try_songs_in_playlists(playlists)?;
        Ok(all.difference(&listed).cloned().collect())
    }
}

fn or_empty(query: &str, result: Result<HashSet<Song>, LibraryError>) -> HashSet<Song> {
    result.unwrap_or_else(|e| {
        warn!(query, error = %e, "La biblioteca no respondió, se devuelve un resultado vacío");
        HashSet::new()
    })
}

/// Orden de la cola: artista ascendente sin distinguir mayúsculas ni acentos,
/// desempatando por título e id.
pub fn sort_for_session(songs: impl IntoIterator<Item = Song>) -> Vec<Song> {
    let mut songs: Vec<Song> = songs.into_iter().collect();
    songs.sort_by_cached_key(|song| (normalize(&song.artist), normalize(&song.title), song.id));
    songs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{DateRangeMode, SelectionSet};
    use crate::testing::{FakeLibrary, day};

    /// A: [s1, s2], B: [s2, s3]; s4 suelta.
    fn library() -> FakeLibrary {
        let fake = FakeLibrary::new();
        fake.add_song(1, "Delta", "Zed", day(1));
        fake.add_song(2, "Bravo", "alpha", day(2));
        fake.add_song(3, "Charlie", "Émile", day(3));
        fake.add_song(4, "Alpha", "Bob", day(4));
        fake.add_playlist(10, "A", &[1, 2]);
        fake.add_playlist(20, "B", &[2, 3]);
        fake
    }

    fn ids(songs: &HashSet<Song>) -> Vec<u64> {
        let mut ids: Vec<_> = songs.iter().map(|s| s.id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn playlist_set_operations() {
        let fake = library();
        let queries = LibraryQueries::new(&fake);
        let playlists = fake.playlists();

        assert_eq!(ids(&queries.songs_in_playlists(&playlists)), vec![1, 2, 3]);
        assert_eq!(ids(&queries.in_no_playlist()), vec![4]);
        assert_eq!(
            queries.in_no_playlist(),
            queries.songs_not_in_playlists(&playlists)
        );
    }

    #[test]
    fn in_and_not_in_partition_the_library() {
        let fake = library();
        let queries = LibraryQueries::new(&fake);
        let playlists = fake.playlists();
        let all = queries.all_songs();

        let subsets: Vec<Vec<Playlist>> = vec![
            vec![],
            vec![playlists[0].clone()],
            vec![playlists[1].clone()],
            playlists.clone(),
        ];

        for subset in subsets {
            let inside = queries.songs_in_playlists(&subset);
            let outside = queries.songs_not_in_playlists(&subset);

            assert!(inside.is_disjoint(&outside));
            let union: HashSet<Song> = inside.union(&outside).cloned().collect();
            assert_eq!(union, all);
        }
    }

    #[test]
    fn not_in_selected_candidates_are_sorted_by_artist() {
        let fake = library();
        let queries = LibraryQueries::new(&fake);
        let playlists = fake.playlists();
        let selections = PlaylistSelections::rehydrate(&playlists, &[10], &[], &[]);

        let queue = queries.candidates(SelectionMode::NotInSelected, &selections, &DateRange::default());
        let order: Vec<_> = queue.iter().map(|s| s.id).collect();

        // "Bob" < "Émile" sin acentos.
        assert_eq!(order, vec![4, 3]);
    }

    #[test]
    fn candidates_by_mode() {
        let fake = library();
        let queries = LibraryQueries::new(&fake);
        let playlists = fake.playlists();
        let mut selections = PlaylistSelections::rehydrate(&playlists, &[], &[20], &[10]);
        let range = DateRange {
            mode: DateRangeMode::After,
            start: Some(day(2)),
            end: None,
            auto_advance: false,
        };

        let order = |mode, selections: &PlaylistSelections| -> Vec<u64> {
            queries
                .candidates(mode, selections, &range)
                .iter()
                .map(|s| s.id)
                .collect()
        };

        assert_eq!(order(SelectionMode::AllSongs, &selections), vec![2, 4, 3, 1]);
        assert_eq!(order(SelectionMode::InSelected, &selections), vec![2, 3]);
        assert_eq!(order(SelectionMode::NotInDestination, &selections), vec![4, 3]);
        assert_eq!(order(SelectionMode::AddedDate, &selections), vec![4, 3]);
        assert!(order(SelectionMode::Destination, &selections).is_empty());

        selections.clear(SelectionSet::Included);
        assert!(order(SelectionMode::InSelected, &selections).is_empty());
    }

    #[test]
    fn provider_failure_is_an_empty_result() {
        let fake = library();
        fake.set_failing(true);
        let queries = LibraryQueries::new(&fake);

        assert!(queries.all_songs().is_empty());
        assert!(queries.in_no_playlist().is_empty());
        assert!(queries.songs_not_in_playlists(&[]).is_empty());
    }

    #[test]
    fn sort_breaks_ties_by_title() {
        let fake = FakeLibrary::new();
        fake.add_song(1, "b", "Same", day(0));
        fake.add_song(2, "A", "same", day(0));
        fake.add_song(3, "a", "SAME", day(0));

        let sorted = sort_for_session(fake.songs());
        let order: Vec<_> = sorted.iter().map(|s| s.id).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }
}
