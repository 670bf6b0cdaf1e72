use std::{fs, io, path::PathBuf, sync::Arc};

use chrono::{SecondsFormat, Utc};
use songsort_core::AuthorizationStatus;
use songsort_paths::SongsortPaths;
use tracing::{info, warn};

/// Consentimiento de acceso a las carpetas de música.
///
/// El permiso se recuerda con un fichero marcador en la carpeta de datos.
#[derive(Debug, Clone)]
pub struct AccessControl {
    paths: Arc<SongsortPaths>,
    folders: Vec<PathBuf>,
}

impl AccessControl {
    pub fn new(paths: Arc<SongsortPaths>, folders: Vec<PathBuf>) -> Self {
        AccessControl { paths, folders }
    }

    pub fn set_folders(&mut self, folders: Vec<PathBuf>) {
        self.folders = folders;
    }

    pub fn status(&self) -> AuthorizationStatus {
        if !self.paths.access_file.exists() {
            return AuthorizationStatus::NotDetermined;
        }

        match self.folders.iter().find(|dir| !self.paths.is_readable_dir(dir)) {
            Some(dir) => {
                warn!("Sin acceso de lectura a {}", dir.display());
                AuthorizationStatus::Denied
            }
            None => AuthorizationStatus::Authorized,
        }
    }

    /// Registra el consentimiento y devuelve el estado resultante.
    pub fn grant(&self) -> io::Result<AuthorizationStatus> {
        if let Some(parent) = self.paths.access_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let granted_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        fs::write(&self.paths.access_file, format!("granted_at = \"{granted_at}\"\n"))?;
        info!("Acceso a la biblioteca concedido");
        Ok(self.status())
    }

    pub fn revoke(&self) -> io::Result<()> {
        match fs::remove_file(&self.paths.access_file) {
            Ok(()) => {
                info!("Acceso a la biblioteca revocado");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Arc<SongsortPaths>) {
        let dir = tempfile::tempdir().unwrap();
        let paths = SongsortPaths::with_base(dir.path()).unwrap();
        paths.ensure_structure().unwrap();
        (dir, Arc::new(paths))
    }

    #[test]
    fn consent_lifecycle() {
        let (dir, paths) = setup();
        let music = dir.path().join("music");
        fs::create_dir(&music).unwrap();
        let access = AccessControl::new(paths, vec![music]);

        assert_eq!(access.status(), AuthorizationStatus::NotDetermined);
        assert_eq!(access.grant().unwrap(), AuthorizationStatus::Authorized);
        assert_eq!(access.status(), AuthorizationStatus::Authorized);

        access.revoke().unwrap();
        access.revoke().unwrap();
        assert_eq!(access.status(), AuthorizationStatus::NotDetermined);
    }

    #[test]
    fn unreadable_folder_is_denied() {
        let (dir, paths) = setup();
        let access = AccessControl::new(paths, vec![dir.path().join("missing")]);

        assert_eq!(access.grant().unwrap(), AuthorizationStatus::Denied);
    }
}
