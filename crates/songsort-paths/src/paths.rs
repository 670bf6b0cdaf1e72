use std::{
    env,
    fs::File,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use tracing::debug;

use crate::{errors::Error, fs_utils};

/// Variable de entorno para forzar la ruta base (modo "portable" y tests)
pub const ENV_BASE_DIR: &str = "SONGSORT_BASE_DIR";

/// Todas las rutas que usa songsort en disco
#[derive(Debug, Clone)]
pub struct SongsortPaths {
    // config_dir
    pub config_dir: PathBuf,
    pub preferences_file: PathBuf,
    pub library_config_file: PathBuf,

    // data_dir
    pub data_dir: PathBuf,
    pub library_db: PathBuf,
    pub access_file: PathBuf,

    // cache_dir
    pub cache_dir: PathBuf,
    pub artwork_dir: PathBuf,

    pub lock_file: PathBuf,
}

impl SongsortPaths {
    /// Resuelve las rutas por defecto del sistema, o las de `SONGSORT_BASE_DIR` si está definida,
    /// y crea la estructura de carpetas.
    pub fn new() -> Result<Self, Error> {
        if let Ok(base) = env::var(ENV_BASE_DIR) {
            return Self::with_base(base);
        }

        let proj = ProjectDirs::from("org", "songsort", "songsort").ok_or(Error::NoHome)?;
        let paths = Self::layout(
            proj.config_dir().to_path_buf(),
            proj.data_dir().to_path_buf(),
            proj.cache_dir().to_path_buf(),
        );

        paths.ensure_structure()?;
        paths.validate_structure()?;
        Ok(paths)
    }

    /// Todas las rutas cuelgan de `base` (`base/config`, `base/data`, `base/cache`).
    pub fn with_base(base: impl AsRef<Path>) -> Result<Self, Error> {
        let base = base.as_ref();
        let paths = Self::layout(base.join("config"), base.join("data"), base.join("cache"));

        paths.ensure_structure()?;
        paths.validate_structure()?;
        Ok(paths)
    }

    fn layout(config_dir: PathBuf, data_dir: PathBuf, cache_dir: PathBuf) -> Self {
        SongsortPaths {
            preferences_file: config_dir.join("preferences.toml"),
            library_config_file: config_dir.join("library.toml"),
            config_dir,

            library_db: data_dir.join("library.db"),
            access_file: data_dir.join("access.granted"),
            lock_file: data_dir.join("songsort.lock"),
            data_dir,

            artwork_dir: cache_dir.join("artwork"),
            cache_dir,
        }
    }

    /// `true` si nunca se ha tomado el lock (primer arranque).
    pub fn is_first_run(&self) -> bool {
        !self.lock_file.exists()
    }

    /// Toma el lock de instancia única. Mantén vivo el `File` devuelto.
    pub fn lock(&self) -> Result<File, Error> {
        fs_utils::lock_file(&self.lock_file)
    }
}

impl SongsortPaths {
    /// Ruta de una carátula cacheada a partir de su hash hex y su extensión.
    ///
    /// Estructura: `<cache_dir>/artwork/<2 primeros nibbles>/<hash>.<ext>`
    pub fn artwork_path(&self, hash: &str, ext: &str) -> Result<PathBuf, Error> {
        let hex = hash.to_lowercase();

        if hex.len() < 2 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidArtworkHash(hash.to_string()));
        }

        let file_name = format!("{}.{}", hex, ext.trim_start_matches('.'));
        Ok(self.artwork_dir.join(&hex[0..2]).join(file_name))
    }

    /// Igual que [`artwork_path`](Self::artwork_path) pero crea la carpeta contenedora.
    pub fn ensure_artwork_path(&self, hash: &str, ext: &str) -> Result<PathBuf, Error> {
        let path = self.artwork_path(hash, ext)?;
        if let Some(parent) = path.parent() {
            fs_utils::ensure_dir(parent)?;
        }
        Ok(path)
    }

    /// `true` si `dir` existe y se puede listar.
    pub fn is_readable_dir(&self, dir: &Path) -> bool {
        fs_utils::is_readable_dir(dir)
    }
}

impl SongsortPaths {
    /// Crea todas las carpetas base. Los ficheros se crean bajo demanda.
    pub fn ensure_structure(&self) -> Result<(), Error> {
        for dir in self.dirs() {
            fs_utils::ensure_dir(dir)?;
        }
        debug!(data_dir = %self.data_dir.display(), "estructura de carpetas lista");
        Ok(())
    }

    /// Valida que cada carpeta existe y es escribible, recreando las que falten.
    pub fn validate_structure(&self) -> Result<(), Error> {
        for dir in self.dirs() {
            if !dir.exists() {
                fs_utils::ensure_dir(dir)?;
            }
            fs_utils::check_writable(dir)?;
        }
        Ok(())
    }

    fn dirs(&self) -> [&PathBuf; 4] {
        [
            &self.config_dir,
            &self.data_dir,
            &self.cache_dir,
            &self.artwork_dir,
        ]
    }
}
