use std::{
    fs,
    path::{Path, PathBuf},
};

use config::{Config, File, FileFormat};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use songsort_paths::UserDirs;
use tracing::{debug, info};

use crate::{
    error::ConfigError,
    extensions::{ExtensionConfig, ExtensionLimits, SupportedExtension, default_extension_config, limits_for},
};

/// Configuración de la biblioteca local (`library.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default, build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct LibraryConfig {
    pub include_paths: Vec<PathBuf>,
    pub exclude_paths: Vec<PathBuf>,
    pub follow_symlinks: bool,
    pub extension_config: ExtensionLimits,
    /// Lectores de etiquetas en paralelo. Por defecto, uno por CPU.
    pub scan_threads: Option<usize>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let include_paths = UserDirs::new()
            .and_then(|dirs| dirs.audio_dir().map(Path::to_path_buf))
            .into_iter()
            .collect();

        LibraryConfig {
            include_paths,
            exclude_paths: Vec::new(),
            follow_symlinks: true,
            extension_config: default_extension_config(),
            scan_threads: None,
        }
    }
}

impl LibraryConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(Some(0)) = self.scan_threads {
            return Err("scan_threads must be greater than zero".into());
        }
        Ok(())
    }
}

impl LibraryConfig {
    pub fn builder() -> LibraryConfigBuilder {
        LibraryConfigBuilder::default()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let cfg = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml))
            .build()?;
        Ok(cfg.try_deserialize::<LibraryConfig>()?)
    }

    /// Lee el archivo o, si no existe, escribe uno con los valores por defecto.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            debug!(path = %path.display(), "Cargando configuración de la biblioteca");
            return Self::from_file(path);
        }

        let config = LibraryConfig::default();
        config.save(path)?;
        info!(path = %path.display(), "Configuración de la biblioteca creada");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let toml_str = toml::to_string(self)?;
        fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn threads(&self) -> usize {
        self.scan_threads.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn limits(&self, ext: SupportedExtension) -> ExtensionConfig {
        limits_for(&self.extension_config, ext)
    }

    /// Añade una carpeta a escanear. Devuelve `false` si ya estaba.
    pub fn add_include(&mut self, path: impl AsRef<Path>) -> Result<bool, ConfigError> {
        let path = dunce::canonicalize(path.as_ref())?;
        if self.include_paths.contains(&path) {
            return Ok(false);
        }
        self.include_paths.push(path);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytesize::ByteSize;

    use super::*;

    #[test]
    fn builder_validates_threads() {
        assert!(LibraryConfig::builder().scan_threads(0usize).build().is_err());

        let config = LibraryConfig::builder()
            .include_paths(vec![PathBuf::from("/music")])
            .follow_symlinks(false)
            .scan_threads(2usize)
            .build()
            .unwrap();
        assert_eq!(config.threads(), 2);
        assert!(!config.follow_symlinks);
        assert_eq!(config.limits(SupportedExtension::Flac).min_file_size, ByteSize::mib(1));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.toml");

        let mut limits = ExtensionLimits::new();
        limits.insert(
            SupportedExtension::Mp3,
            ExtensionConfig {
                min_file_size: ByteSize::kib(10),
                min_duration: Duration::from_secs(5),
            },
        );
        let config = LibraryConfig::builder()
            .include_paths(vec![dir.path().to_path_buf()])
            .extension_config(limits)
            .build()
            .unwrap();

        config.save(&path).unwrap();
        let loaded = LibraryConfig::load_or_create(&path).unwrap();

        assert_eq!(loaded.include_paths, config.include_paths);
        assert_eq!(
            loaded.limits(SupportedExtension::Mp3).min_duration,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn add_include_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LibraryConfig::builder()
            .include_paths(Vec::<PathBuf>::new())
            .build()
            .unwrap();

        assert!(config.add_include(dir.path()).unwrap());
        assert!(!config.add_include(dir.path()).unwrap());
        assert_eq!(config.include_paths.len(), 1);
        assert!(config.add_include(dir.path().join("missing")).is_err());
    }
}
