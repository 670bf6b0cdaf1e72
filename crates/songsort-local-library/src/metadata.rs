use std::{
    borrow::Cow,
    fs,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use futures::{StreamExt, stream};
use lofty::{
    file::{AudioFile, TaggedFileExt},
    picture::{MimeType, Picture, PictureType},
    probe::Probe,
    tag::Accessor,
};
use sha2::{Digest, Sha256};
use songsort_paths::SongsortPaths;
use tokio::{sync::mpsc, task::spawn_blocking};
use tracing::{trace, warn};

use crate::error::MetadataError;
use crate::library_config::LibraryConfig;
use crate::scanner::TrackFile;

/// Lo que se guarda de cada archivo tras leer sus etiquetas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub path: PathBuf,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub duration: Duration,
    pub artwork: Option<PathBuf>,
    pub file_size: u64,
    pub last_modified: u64,
}

#[derive(Debug, Clone)]
pub struct LocalMetadata {
    paths: Arc<SongsortPaths>,
    config: Arc<LibraryConfig>,
}

impl LocalMetadata {
    pub fn new(paths: Arc<SongsortPaths>, config: LibraryConfig) -> Self {
        LocalMetadata {
            paths,
            config: Arc::new(config),
        }
    }

    /// Lee las etiquetas en paralelo y entrega los resultados según terminan.
    pub fn process(&self, files: Vec<TrackFile>) -> mpsc::Receiver<Result<TrackRecord, MetadataError>> {
        let permits = self.config.threads();
        let (tx, rx) = mpsc::channel(permits.saturating_mul(2));

        let paths = self.paths.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            let reads = files.into_iter().map(|file| {
                let paths = paths.clone();
                let min_duration = config.limits(file.extension).min_duration;
                async move { spawn_blocking(move || read_track(file, min_duration, &paths)).await? }
            });

            let mut results = stream::iter(reads).buffer_unordered(permits);
            while let Some(result) = results.next().await {
                if tx.send(result).await.is_err() {
                    break;
                }
            }
        });

        rx
    }
}

/// Lee etiquetas y duración. Los archivos más cortos que `min_duration` se rechazan.
pub fn read_track(
    file: TrackFile,
    min_duration: Duration,
    paths: &SongsortPaths,
) -> Result<TrackRecord, MetadataError> {
    let tagged = Probe::open(&file.path)?.read()?;
    let duration = tagged.properties().duration();

    if duration < min_duration {
        return Err(MetadataError::TooShort {
            path: file.path,
            duration,
        });
    }

    let mut record = TrackRecord {
        path: file.path,
        title: None,
        artist: None,
        album: None,
        genre: None,
        duration,
        artwork: None,
        file_size: file.file_size,
        last_modified: file.last_modified,
    };

    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        record.title = tag.title().map(Cow::into_owned);
        record.artist = tag.artist().map(Cow::into_owned);
        record.album = tag.album().map(Cow::into_owned);
        record.genre = tag.genre().map(Cow::into_owned);

        if let Some(picture) = pick_cover(tag.pictures()) {
            match cache_artwork(paths, picture.data(), picture_extension(picture)) {
                Ok(path) => record.artwork = Some(path),
                Err(e) => warn!(path = %record.path.display(), error = %e, "No se pudo guardar la carátula, se ignora"),
            }
        }
    }

    trace!(path = %record.path.display(), "Etiquetas leídas");
    Ok(record)
}

fn pick_cover(pictures: &[Picture]) -> Option<&Picture> {
    pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
}

fn picture_extension(picture: &Picture) -> &'static str {
    match picture.mime_type() {
        Some(MimeType::Png) => "png",
        Some(MimeType::Gif) => "gif",
        Some(MimeType::Bmp) => "bmp",
        Some(MimeType::Tiff) => "tiff",
        _ => "jpg",
    }
}

/// Guarda la imagen en la caché direccionada por su SHA-256. Si ya existe no
/// se vuelve a escribir.
pub fn cache_artwork(paths: &SongsortPaths, data: &[u8], ext: &str) -> Result<PathBuf, MetadataError> {
    let hash = {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    };

    let dest = paths.ensure_artwork_path(&hash, ext)?;
    if !dest.exists() {
        fs::write(&dest, data)?;
    }
    Ok(dest)
}
