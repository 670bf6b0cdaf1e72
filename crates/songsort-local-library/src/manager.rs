use std::{collections::HashSet, path::Path, path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Result, bail};
use chrono::Utc;
use songsort_core::{LibraryError, MediaLibrary};
use songsort_paths::SongsortPaths;
use tracing::{Level, info, instrument, warn};

use crate::{
    access::AccessControl,
    error::MetadataError,
    library_config::LibraryConfig,
    metadata::LocalMetadata,
    provider::LocalLibrary,
    scanner::LocalScanner,
    storage::LocalStorage,
};

/// Resumen de una pasada de importación.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub found: usize,
    pub imported: usize,
    pub updated: usize,
    pub removed: usize,
    /// Archivos descartados por ser demasiado cortos.
    pub skipped: usize,
    pub failed: usize,
}

/// Punto de entrada de la biblioteca local: configuración, importación y
/// el proveedor que consume el organizador.
pub struct LibraryManager {
    paths: Arc<SongsortPaths>,
    config: LibraryConfig,
    library: Arc<LocalLibrary>,
}

impl LibraryManager {
    /// Abre la biblioteca usando el `library.toml` de `paths`, creándolo si falta.
    pub fn open(paths: Arc<SongsortPaths>) -> Result<Self> {
        let config = LibraryConfig::load_or_create(&paths.library_config_file)?;
        Self::with_config(paths, config)
    }

    pub fn with_config(paths: Arc<SongsortPaths>, config: LibraryConfig) -> Result<Self> {
        paths.ensure_structure()?;
        let storage = LocalStorage::open(&paths.library_db)?;
        let access = AccessControl::new(paths.clone(), config.include_paths.clone());

        Ok(LibraryManager {
            library: Arc::new(LocalLibrary::new(storage, access)),
            paths,
            config,
        })
    }

    pub fn library(&self) -> Arc<LocalLibrary> {
        self.library.clone()
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Añade una carpeta a escanear y guarda la configuración.
    pub fn add_include(&mut self, folder: impl AsRef<Path>) -> Result<bool> {
        let added = self.config.add_include(folder)?;
        if added {
            self.config.save(&self.paths.library_config_file)?;
            self.library.set_folders(self.config.include_paths.clone())?;
        }
        Ok(added)
    }

    /// Recorre las carpetas, lee etiquetas y sincroniza la base de datos.
    #[instrument(level = Level::INFO, skip(self), err)]
    pub async fn scan(&self) -> Result<ScanReport> {
        if !self.library.authorization().is_authorized() {
            bail!(LibraryError::AccessDenied);
        }

        info!("Iniciando escaneo de archivos...");
        let start_time = Instant::now();
        let files = LocalScanner::new(self.config.clone()).scan().await?;

        let mut report = ScanReport {
            found: files.len(),
            ..ScanReport::default()
        };
        let mut present: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();

        let metadata = LocalMetadata::new(self.paths.clone(), self.config.clone());
        let mut receiver = metadata.process(files);
        let mut records = Vec::new();

        while let Some(result) = receiver.recv().await {
            match result {
                Ok(track) => records.push(track),
                Err(MetadataError::TooShort { path, .. }) => {
                    present.remove(&path);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("No se pudo procesar una pista: {}", e);
                    report.failed += 1;
                }
            }
        }

        let storage = self.library.storage().clone();
        let (stats, removed) = tokio::task::spawn_blocking(move || -> Result<_> {
            let stats = storage.upsert_tracks(&records, Utc::now())?;
            let removed = storage.remove_missing(&present)?;
            Ok((stats, removed))
        })
        .await??;

        report.imported = stats.inserted;
        report.updated = stats.updated;
        report.removed = removed;

        info!(
            "Escaneo completado en {} ms: {} nuevas, {} actualizadas, {} eliminadas",
            start_time.elapsed().as_millis(),
            report.imported,
            report.updated,
            report.removed
        );
        Ok(report)
    }
}
