use serde::{Deserialize, Serialize};

use super::song::Artwork;

pub type PlaylistId = u64;

pub const UNKNOWN_PLAYLIST: &str = "Unknown playlist";

/// Máximo de carátulas combinadas en la portada de una playlist.
pub const MAX_ARTWORKS: usize = 4;
/// Cuántas canciones se inspeccionan como mucho buscando carátulas.
pub const ARTWORK_SCAN_LIMIT: usize = 50;

/// Portada de una playlist compuesta a partir de las carátulas de sus canciones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaylistArtwork {
    #[default]
    None,
    Single(Artwork),
    /// Rejilla 2×2; con 2 o 3 fuentes quedan huecos vacíos.
    Grid(Vec<Artwork>),
}

impl PlaylistArtwork {
    /// Combina las carátulas de las primeras canciones de la playlist, en orden.
    pub fn combine<I>(member_artworks: I) -> Self
    where
        I: IntoIterator<Item = Option<Artwork>>,
    {
        let mut sources: Vec<Artwork> = member_artworks
            .into_iter()
            .take(ARTWORK_SCAN_LIMIT)
            .flatten()
            .take(MAX_ARTWORKS)
            .collect();

        match sources.len() {
            0 => PlaylistArtwork::None,
            1 => PlaylistArtwork::Single(sources.remove(0)),
            _ => PlaylistArtwork::Grid(sources),
        }
    }
}

/// Una playlist del usuario. La pertenencia de canciones no se guarda aquí:
/// siempre se consulta en vivo al proveedor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub artwork: PlaylistArtwork,
}

impl Playlist {
    pub fn new(id: PlaylistId, name: Option<String>, artwork: PlaylistArtwork) -> Self {
        Playlist {
            id,
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_PLAYLIST.to_string()),
            artwork,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(n: u32) -> Option<Artwork> {
        Some(Artwork {
            path: format!("/art/{n}.jpg").into(),
        })
    }

    #[test]
    fn combine_by_source_count() {
        assert_eq!(PlaylistArtwork::combine(vec![None, None]), PlaylistArtwork::None);
        assert_eq!(
            PlaylistArtwork::combine(vec![None, art(1)]),
            PlaylistArtwork::Single(art(1).unwrap())
        );

        match PlaylistArtwork::combine(vec![art(1), None, art(2), art(3), art(4), art(5)]) {
            PlaylistArtwork::Grid(sources) => {
                assert_eq!(sources.len(), 4);
                assert_eq!(Some(sources[3].clone()), art(4));
            }
            other => panic!("esperaba rejilla, llegó {other:?}"),
        }
    }

    #[test]
    fn combine_stops_looking_after_fifty_members() {
        let mut members = vec![None; ARTWORK_SCAN_LIMIT];
        members.push(art(1));
        assert_eq!(PlaylistArtwork::combine(members), PlaylistArtwork::None);
    }

    #[test]
    fn unnamed_playlist() {
        let p = Playlist::new(3, None, PlaylistArtwork::None);
        assert_eq!(p.name, UNKNOWN_PLAYLIST);
    }
}
