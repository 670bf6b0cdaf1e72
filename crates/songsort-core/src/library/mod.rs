pub mod genre;
pub mod playlist;
pub mod song;

pub use genre::{Genre, SongGenre};
pub use playlist::{Playlist, PlaylistArtwork, PlaylistId};
pub use song::{Artwork, Song, SongId};
