use std::{fs::File, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use songsort_core::{MediaLibrary, Organizer, PlaybackCoordinator, PlaylistWriter, SortEvent};
use songsort_local_library::{LibraryManager, TomlPreferences};
use songsort_paths::SongsortPaths;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

/// Todo lo que necesita un comando: rutas, biblioteca y organizador.
pub struct App {
    pub paths: Arc<SongsortPaths>,
    pub manager: LibraryManager,
    pub organizer: Organizer<TomlPreferences>,
    pub events: UnboundedReceiver<SortEvent>,
    _lock: File,
}

impl App {
    pub async fn open(base_dir: Option<PathBuf>) -> Result<Self> {
        let paths = match base_dir {
            Some(base) => SongsortPaths::with_base(base)?,
            None => SongsortPaths::new()?,
        };
        if paths.is_first_run() {
            info!("Primer arranque, datos en {}", paths.data_dir.display());
        }
        paths.validate_structure()?;
        let lock = paths
            .lock()
            .context("another songsort instance is already running")?;
        let paths = Arc::new(paths);

        let manager = LibraryManager::open(paths.clone())?;
        let library = manager.library();
        let preferences = TomlPreferences::new(&paths.preferences_file);

        let (mut organizer, events) = Organizer::new(
            library.clone() as Arc<dyn MediaLibrary>,
            library as Arc<dyn PlaylistWriter>,
            preferences,
            PlaybackCoordinator::without_backend(),
        )?;

        if organizer.authorization().is_authorized() {
            organizer.load_playlists().await?;
        } else {
            debug!("Sin acceso a la biblioteca, no se cargan playlists");
        }

        Ok(App {
            paths,
            manager,
            organizer,
            events,
            _lock: lock,
        })
    }
}
