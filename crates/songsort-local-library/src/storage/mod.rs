mod embedded;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use songsort_core::{
    LibraryError,
    library::{Artwork, Playlist, PlaylistArtwork, PlaylistId, Song, SongId},
};
use tracing::{Level, debug, info, instrument, trace};

use embedded::migrations::runner;

use crate::{error::StorageError, metadata::TrackRecord};

type Result<T, E = StorageError> = std::result::Result<T, E>;

/// Resultado de volcar un escaneo en la base de datos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
}

/// Base de datos de la biblioteca local: canciones, playlists y pertenencias.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Abriendo conexión con la base de datos en {}", path.display());
        let mut conn = Connection::open(path)?;
        Self::initialize_connection(&mut conn)?;

        Ok(LocalStorage {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        Self::initialize_connection(&mut conn)?;

        Ok(LocalStorage {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize_connection(conn: &mut Connection) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;

        info!("Ejecutando migraciones de la base de datos...");

        let report = runner().run(conn)?;
        for migration in report.applied_migrations() {
            trace!("Migración aplicada: {:?}", migration);
        }

        info!("Migraciones completadas exitosamente.");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl LocalStorage {
    /// Inserta o actualiza las pistas leídas. Una pista ya conocida conserva
    /// su id y su fecha de alta.
    #[instrument(level = Level::DEBUG, skip(self, tracks), fields(count = tracks.len()), err)]
    pub fn upsert_tracks(&self, tracks: &[TrackRecord], now: DateTime<Utc>) -> Result<UpsertStats> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut stats = UpsertStats::default();

        for track in tracks {
            match queries::song_id_by_path(&tx, &track.path)? {
                Some(id) => {
                    queries::update_song(&tx, id, track)?;
                    stats.updated += 1;
                }
                None => {
                    queries::insert_song(&tx, track, now)?;
                    stats.inserted += 1;
                }
            }
        }

        tx.commit()?;
        debug!("{} pistas nuevas, {} actualizadas", stats.inserted, stats.updated);
        Ok(stats)
    }

    /// Borra las canciones cuya ruta ya no está en `present`. Sus pertenencias
    /// a playlists desaparecen en cascada.
    #[instrument(level = Level::DEBUG, skip(self, present), err)]
    pub fn remove_missing(&self, present: &HashSet<PathBuf>) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let stale: Vec<i64> = queries::all_paths(&tx)?
            .into_iter()
            .filter(|(_, path)| !present.contains(path))
            .map(|(id, _)| id)
            .collect();

        for id in &stale {
            tx.execute("DELETE FROM songs WHERE id = ?1", [id])?;
        }

        tx.commit()?;
        Ok(stale.len())
    }

    pub fn all_songs(&self) -> Result<Vec<Song>> {
        let conn = self.lock()?;
        queries::all_songs(&conn)
    }

    pub fn song(&self, id: SongId) -> Result<Option<Song>> {
        let conn = self.lock()?;
        queries::song(&conn, id)
    }

    pub fn song_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Canciones de la playlist en el orden en que se añadieron.
    pub fn songs_in_playlist(&self, playlist: PlaylistId) -> Result<Vec<Song>> {
        let conn = self.lock()?;
        if !queries::playlist_exists(&conn, playlist)? {
            return Err(LibraryError::UnknownPlaylist(playlist).into());
        }
        queries::playlist_songs(&conn, playlist, None)
    }

    pub fn playlist_contains(&self, playlist: PlaylistId, song: SongId) -> Result<bool> {
        let conn = self.lock()?;
        if !queries::playlist_exists(&conn, playlist)? {
            return Err(LibraryError::UnknownPlaylist(playlist).into());
        }
        let found = conn
            .query_row(
                "SELECT 1 FROM playlist_songs WHERE playlist_id = ?1 AND song_id = ?2",
                params![playlist as i64, song as i64],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Todas las playlists con su portada compuesta.
    pub fn all_playlists(&self) -> Result<Vec<Playlist>> {
        let conn = self.lock()?;
        let rows = queries::playlist_rows(&conn)?;

        let mut playlists = Vec::with_capacity(rows.len());
        for (id, name) in rows {
            let artwork = queries::playlist_artwork(&conn, id)?;
            playlists.push(Playlist::new(id, Some(name), artwork));
        }
        Ok(playlists)
    }

    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub fn create_playlist(&self, name: &str, now: DateTime<Utc>) -> Result<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::InvalidName(name.to_string()).into());
        }

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO playlists (name, created_at) VALUES (?1, ?2)",
            params![name, now.timestamp_millis()],
        )?;
        let id = conn.last_insert_rowid() as PlaylistId;
        info!("Playlist creada: {} ({})", name, id);

        Ok(Playlist::new(id, Some(name.to_string()), PlaylistArtwork::None))
    }

    /// Añade la canción al final de la playlist. Devuelve `false` si ya estaba.
    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub fn add_song(&self, playlist: PlaylistId, song: SongId, now: DateTime<Utc>) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if !queries::playlist_exists(&tx, playlist)? {
            return Err(LibraryError::UnknownPlaylist(playlist).into());
        }
        if queries::song(&tx, song)?.is_none() {
            return Err(LibraryError::UnknownSong(song).into());
        }

        let changed = tx.execute(
            "INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id, position, added_at)
             VALUES (
                ?1, ?2,
                (SELECT COALESCE(MAX(position), -1) + 1 FROM playlist_songs WHERE playlist_id = ?1),
                ?3
             )",
            params![playlist as i64, song as i64, now.timestamp_millis()],
        )?;

        tx.commit()?;
        Ok(changed > 0)
    }
}

mod queries {
    use songsort_core::library::playlist::ARTWORK_SCAN_LIMIT;

    use super::*;

    const SONG_COLUMNS: &str =
        "s.id, s.title, s.artist, s.album, s.genre, s.duration_ms, s.artwork_path, s.date_added";

    fn millis_to_date(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }

    fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
        let id: i64 = row.get(0)?;
        let duration_ms: i64 = row.get(5)?;
        let artwork: Option<String> = row.get(6)?;

        let song = Song::new(
            id as SongId,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            Duration::from_millis(duration_ms.max(0) as u64),
            millis_to_date(row.get(7)?),
        );
        Ok(song.with_artwork(artwork.map(|path| Artwork { path: PathBuf::from(path) })))
    }

    /// Título a guardar: el de las etiquetas o, si falta, el nombre del fichero.
    fn stored_title(track: &TrackRecord) -> Option<String> {
        track
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| track.path.file_stem().map(|s| s.to_string_lossy().into_owned()))
    }

    pub fn song_id_by_path(conn: &Connection, path: &Path) -> rusqlite::Result<Option<i64>> {
        conn.query_row(
            "SELECT id FROM songs WHERE path = ?1",
            [path.to_string_lossy()],
            |row| row.get(0),
        )
        .optional()
    }

    pub fn insert_song(conn: &Connection, track: &TrackRecord, now: DateTime<Utc>) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO songs
                (path, title, artist, album, genre, duration_ms, artwork_path, file_size, last_modified, date_added)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                track.path.to_string_lossy(),
                stored_title(track),
                track.artist,
                track.album,
                track.genre,
                track.duration.as_millis() as i64,
                track.artwork.as_ref().map(|p| p.to_string_lossy()),
                track.file_size as i64,
                track.last_modified as i64,
                now.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn update_song(conn: &Connection, id: i64, track: &TrackRecord) -> rusqlite::Result<()> {
        conn.execute(
            "UPDATE songs
                SET title = ?2, artist = ?3, album = ?4, genre = ?5, duration_ms = ?6,
                    artwork_path = ?7, file_size = ?8, last_modified = ?9
              WHERE id = ?1",
            params![
                id,
                stored_title(track),
                track.artist,
                track.album,
                track.genre,
                track.duration.as_millis() as i64,
                track.artwork.as_ref().map(|p| p.to_string_lossy()),
                track.file_size as i64,
                track.last_modified as i64,
            ],
        )?;
        Ok(())
    }

    pub fn all_paths(conn: &Connection) -> rusqlite::Result<Vec<(i64, PathBuf)>> {
        let mut stmt = conn.prepare("SELECT id, path FROM songs")?;
        stmt.query_map([], |row| {
            let path: String = row.get(1)?;
            Ok((row.get(0)?, PathBuf::from(path)))
        })?
        .collect()
    }

    pub fn all_songs(conn: &Connection) -> Result<Vec<Song>> {
        let mut stmt = conn.prepare(&format!("SELECT {SONG_COLUMNS} FROM songs s ORDER BY s.id"))?;
        let songs = stmt.query_map([], song_from_row)?.collect::<Result<_, _>>()?;
        Ok(songs)
    }

    pub fn song(conn: &Connection, id: SongId) -> Result<Option<Song>> {
        let song = conn
            .query_row(
                &format!("SELECT {SONG_COLUMNS} FROM songs s WHERE s.id = ?1"),
                [id as i64],
                song_from_row,
            )
            .optional()?;
        Ok(song)
    }

    pub fn playlist_exists(conn: &Connection, id: PlaylistId) -> rusqlite::Result<bool> {
        let found = conn
            .query_row("SELECT 1 FROM playlists WHERE id = ?1", [id as i64], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn playlist_rows(conn: &Connection) -> rusqlite::Result<Vec<(PlaylistId, String)>> {
        let mut stmt = conn.prepare("SELECT id, name FROM playlists ORDER BY id")?;
        stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            Ok((id as PlaylistId, row.get(1)?))
        })?
        .collect()
    }

    pub fn playlist_songs(conn: &Connection, playlist: PlaylistId, limit: Option<usize>) -> Result<Vec<Song>> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(&format!(
            "SELECT {SONG_COLUMNS}
               FROM playlist_songs ps
               JOIN songs s ON s.id = ps.song_id
              WHERE ps.playlist_id = ?1
              ORDER BY ps.position
              LIMIT ?2"
        ))?;
        let songs = stmt
            .query_map(params![playlist as i64, limit], song_from_row)?
            .collect::<Result<_, _>>()?;
        Ok(songs)
    }

    pub fn playlist_artwork(conn: &Connection, playlist: PlaylistId) -> Result<PlaylistArtwork> {
        let members = playlist_songs(conn, playlist, Some(ARTWORK_SCAN_LIMIT))?;
        Ok(PlaylistArtwork::combine(members.into_iter().map(|s| s.artwork)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn record(path: &str, title: Option<&str>, artwork: Option<&str>) -> TrackRecord {
        TrackRecord {
            path: PathBuf::from(path),
            title: title.map(str::to_string),
            artist: Some("Artist".to_string()),
            album: None,
            genre: Some("Synthpop".to_string()),
            duration: Duration::from_secs(180),
            artwork: artwork.map(PathBuf::from),
            file_size: 1024,
            last_modified: 0,
        }
    }

    #[test]
    fn upsert_keeps_identity_and_date_added() {
        let storage = LocalStorage::open_in_memory().unwrap();

        let stats = storage
            .upsert_tracks(&[record("/m/a.mp3", Some("A"), None)], at(1))
            .unwrap();
        assert_eq!(stats, UpsertStats { inserted: 1, updated: 0 });
        let first = storage.all_songs().unwrap().remove(0);

        let stats = storage
            .upsert_tracks(&[record("/m/a.mp3", Some("A (remaster)"), None)], at(5))
            .unwrap();
        assert_eq!(stats, UpsertStats { inserted: 0, updated: 1 });

        let again = storage.song(first.id).unwrap().unwrap();
        assert_eq!(again.title, "A (remaster)");
        assert_eq!(again.date_added, at(1));
        assert_eq!(storage.song_count().unwrap(), 1);
    }

    #[test]
    fn missing_title_falls_back_to_file_stem() {
        let storage = LocalStorage::open_in_memory().unwrap();
        storage.upsert_tracks(&[record("/m/night drive.flac", None, None)], at(1)).unwrap();

        let song = storage.all_songs().unwrap().remove(0);
        assert_eq!(song.title, "night drive");
        assert_eq!(song.genre.raw.as_deref(), Some("Synthpop"));
    }

    #[test]
    fn playlist_membership_is_ordered_and_idempotent() {
        let storage = LocalStorage::open_in_memory().unwrap();
        storage
            .upsert_tracks(
                &[record("/m/a.mp3", Some("A"), None), record("/m/b.mp3", Some("B"), None)],
                at(1),
            )
            .unwrap();
        let songs = storage.all_songs().unwrap();
        let playlist = storage.create_playlist("  Road trip ", at(2)).unwrap();
        assert_eq!(playlist.name, "Road trip");

        assert!(storage.add_song(playlist.id, songs[1].id, at(3)).unwrap());
        assert!(storage.add_song(playlist.id, songs[0].id, at(3)).unwrap());
        assert!(!storage.add_song(playlist.id, songs[1].id, at(4)).unwrap());

        let members: Vec<SongId> = storage
            .songs_in_playlist(playlist.id)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(members, vec![songs[1].id, songs[0].id]);
        assert!(storage.playlist_contains(playlist.id, songs[0].id).unwrap());
    }

    #[test]
    fn unknown_ids_and_blank_names_are_rejected() {
        let storage = LocalStorage::open_in_memory().unwrap();
        storage.upsert_tracks(&[record("/m/a.mp3", Some("A"), None)], at(1)).unwrap();
        let song = storage.all_songs().unwrap().remove(0);
        let playlist = storage.create_playlist("Mix", at(1)).unwrap();

        let err = storage.add_song(999, song.id, at(1)).unwrap_err();
        assert!(matches!(err, StorageError::Library(LibraryError::UnknownPlaylist(999))));

        let err = storage.add_song(playlist.id, 999, at(1)).unwrap_err();
        assert!(matches!(err, StorageError::Library(LibraryError::UnknownSong(999))));

        let err = storage.create_playlist("   ", at(1)).unwrap_err();
        assert!(matches!(err, StorageError::Library(LibraryError::InvalidName(_))));

        assert!(matches!(
            storage.songs_in_playlist(42).unwrap_err(),
            StorageError::Library(LibraryError::UnknownPlaylist(42))
        ));
    }

    #[test]
    fn removing_missing_files_cascades_to_playlists() {
        let storage = LocalStorage::open_in_memory().unwrap();
        storage
            .upsert_tracks(
                &[record("/m/a.mp3", Some("A"), None), record("/m/b.mp3", Some("B"), None)],
                at(1),
            )
            .unwrap();
        let songs = storage.all_songs().unwrap();
        let playlist = storage.create_playlist("Mix", at(1)).unwrap();
        storage.add_song(playlist.id, songs[0].id, at(1)).unwrap();

        let present: HashSet<PathBuf> = [PathBuf::from("/m/b.mp3")].into_iter().collect();
        assert_eq!(storage.remove_missing(&present).unwrap(), 1);

        assert_eq!(storage.song_count().unwrap(), 1);
        assert!(storage.songs_in_playlist(playlist.id).unwrap().is_empty());
    }

    #[test]
    fn playlist_artwork_combines_member_covers() {
        let storage = LocalStorage::open_in_memory().unwrap();
        storage
            .upsert_tracks(
                &[
                    record("/m/a.mp3", Some("A"), Some("/art/1.jpg")),
                    record("/m/b.mp3", Some("B"), None),
                    record("/m/c.mp3", Some("C"), Some("/art/2.png")),
                ],
                at(1),
            )
            .unwrap();
        let songs = storage.all_songs().unwrap();
        let single = storage.create_playlist("Single", at(1)).unwrap();
        let grid = storage.create_playlist("Grid", at(1)).unwrap();
        storage.create_playlist("Empty", at(1)).unwrap();

        storage.add_song(single.id, songs[0].id, at(1)).unwrap();
        for song in &songs {
            storage.add_song(grid.id, song.id, at(1)).unwrap();
        }

        let playlists = storage.all_playlists().unwrap();
        assert_eq!(
            playlists[0].artwork,
            PlaylistArtwork::Single(Artwork { path: PathBuf::from("/art/1.jpg") })
        );
        assert!(matches!(&playlists[1].artwork, PlaylistArtwork::Grid(v) if v.len() == 2));
        assert_eq!(playlists[2].artwork, PlaylistArtwork::None);
    }
}
