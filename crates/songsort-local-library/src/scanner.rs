use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
    time::UNIX_EPOCH,
};

use anyhow::Result;
use async_walkdir::{DirEntry, WalkDir};
use futures::{StreamExt, future::try_join_all};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{Level, info, instrument, trace, warn};

use crate::extensions::SupportedExtension;
use crate::library_config::LibraryConfig;

/// Archivo de audio candidato, todavía sin leer sus etiquetas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFile {
    pub path: PathBuf,
    pub extension: SupportedExtension,
    pub file_size: u64,
    pub last_modified: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FileId(u64, u64);

#[cfg(unix)]
fn file_id(path: &Path) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).ok().map(|m| FileId(m.dev(), m.ino()))
}

// Sin inodos estables no se deduplica.
#[cfg(not(unix))]
fn file_id(_path: &Path) -> Option<FileId> {
    None
}

/// `true` si ya se había visto.
async fn mark_seen(id: FileId, seen: &AsyncMutex<HashSet<FileId>>) -> bool {
    let mut g = seen.lock().await;
    !g.insert(id)
}

fn normalize_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter_map(|p| match dunce::canonicalize(p) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(path = %p.display(), error = %e, "Carpeta ignorada");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct LocalScanner {
    config: Arc<LibraryConfig>,
}

impl LocalScanner {
    pub fn new(config: LibraryConfig) -> Self {
        LocalScanner {
            config: Arc::new(config),
        }
    }

    /// Recorre las carpetas incluidas y devuelve los archivos aceptados,
    /// ordenados por ruta.
    #[instrument(level = Level::INFO, skip(self))]
    pub async fn scan(&self) -> Result<Vec<TrackFile>> {
        let seen = Arc::new(AsyncMutex::new(HashSet::<FileId>::new()));
        let included = normalize_paths(&self.config.include_paths);
        let excluded = Arc::new(normalize_paths(&self.config.exclude_paths));

        let tasks = included
            .into_iter()
            .filter(|root| !excluded.iter().any(|e| root.starts_with(e)))
            .map(|root| {
                let cfg = self.config.clone();
                let excluded = excluded.clone();
                let seen = seen.clone();
                tokio::spawn(scan_root(root, cfg, excluded, seen))
            });

        let mut found = Vec::new();
        for res in try_join_all(tasks).await? {
            found.extend(res?);
        }
        found.sort_by(|a, b| a.path.cmp(&b.path));

        info!(count = found.len(), "Escaneo completado");
        Ok(found)
    }
}

async fn scan_root(
    root: PathBuf,
    cfg: Arc<LibraryConfig>,
    excluded: Arc<Vec<PathBuf>>,
    seen: Arc<AsyncMutex<HashSet<FileId>>>,
) -> Result<Vec<TrackFile>> {
    let mut walker = WalkDir::new(&root);
    let mut found = Vec::new();

    while let Some(next) = walker.next().await {
        match next {
            Ok(de) => {
                let path = de.path();
                if excluded.iter().any(|p| path.starts_with(p)) {
                    continue;
                }

                if !cfg.follow_symlinks && is_symlink(&de).await {
                    continue;
                }

                if let Some(id) = file_id(&path) {
                    if mark_seen(id, &seen).await {
                        trace!(path = %path.display(), "Archivo repetido");
                        continue;
                    }
                }

                if let Some(track) = should_process_file(&cfg, &de).await {
                    found.push(track);
                }
            }
            Err(e) => warn!(root = %root.display(), error = %e, "Error recorriendo carpeta"),
        }
    }

    Ok(found)
}

async fn is_symlink(de: &DirEntry) -> bool {
    de.file_type()
        .await
        .map(|ft| ft.is_symlink())
        .unwrap_or(false)
}

async fn should_process_file(cfg: &LibraryConfig, de: &DirEntry) -> Option<TrackFile> {
    let path = de.path();
    let extension = SupportedExtension::from_path(&path)?;

    let md = tokio::fs::metadata(&path).await.ok()?;
    if !md.is_file() || md.len() < cfg.limits(extension).min_file_size.as_u64() {
        return None;
    }

    let last_modified = md
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Some(TrackFile {
        path,
        extension,
        file_size: md.len(),
        last_modified,
    })
}
