use std::{
    hash::{Hash, Hasher},
    path::PathBuf,
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::genre::SongGenre;

pub type SongId = u64;

pub const UNKNOWN_TITLE: &str = "Unknown title";
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Referencia a una imagen de carátula ya cacheada en disco.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artwork {
    pub path: PathBuf,
}

/// Una canción de la biblioteca, tal como se cargó del proveedor.
///
/// Es un valor inmutable: pueden existir varias copias en memoria y
/// la identidad es siempre `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: SongGenre,
    pub duration: Duration,
    pub artwork: Option<Artwork>,
    pub date_added: DateTime<Utc>,
}

impl Song {
    /// Construye la canción aplicando los valores por defecto de título y artista.
    pub fn new(
        id: SongId,
        title: Option<String>,
        artist: Option<String>,
        album: Option<String>,
        raw_genre: Option<String>,
        duration: Duration,
        date_added: DateTime<Utc>,
    ) -> Self {
        Song {
            id,
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: artist
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: album.filter(|a| !a.trim().is_empty()),
            genre: SongGenre::from_raw(raw_genre.filter(|g| !g.trim().is_empty())),
            duration,
            artwork: None,
            date_added,
        }
    }

    pub fn with_artwork(mut self, artwork: Option<Artwork>) -> Self {
        self.artwork = artwork;
        self
    }
}

impl PartialEq for Song {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Song {}

impl Hash for Song {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Genre;

    #[test]
    fn defaults_for_missing_tags() {
        let song = Song::new(7, None, Some("  ".into()), Some("".into()), None, Duration::ZERO, Utc::now());

        assert_eq!(song.title, UNKNOWN_TITLE);
        assert_eq!(song.artist, UNKNOWN_ARTIST);
        assert_eq!(song.album, None);
        assert_eq!(song.genre.category, None);
    }

    #[test]
    fn identity_is_the_id() {
        let date = Utc::now();
        let a = Song::new(1, Some("A".into()), None, None, Some("Jazz".into()), Duration::from_secs(10), date);
        let b = Song::new(1, Some("B".into()), None, None, None, Duration::from_secs(20), date);

        assert_eq!(a, b);
        assert_eq!(a.genre.category, Some(Genre::Jazz));

        let set: std::collections::HashSet<Song> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
