use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
};

use fs2::FileExt;
use tracing::{Level, instrument};

use crate::errors::Error;

/// Crea `path` y todos sus padres si todavía no existen.
#[instrument(level = Level::TRACE, err)]
pub fn ensure_dir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Crea un fichero vacío en `path` (y su carpeta padre) si no existe.
#[instrument(level = Level::TRACE, err)]
pub fn ensure_file(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

/// Abre `path` y toma un lock exclusivo sin bloquear.
/// El lock vive mientras viva el `File` devuelto.
#[instrument(level = Level::TRACE, err)]
pub fn lock_file(path: &Path) -> Result<File, Error> {
    ensure_file(path)?;
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    file.try_lock_exclusive()?;
    Ok(file)
}

/// Comprueba que se puede escribir dentro de la carpeta `dir`
/// creando y borrando un fichero de prueba.
#[instrument(level = Level::TRACE, err)]
pub fn check_writable(dir: &Path) -> Result<(), Error> {
    let probe = dir.join(".songsort-write-probe");
    match File::create(&probe) {
        Ok(_) => {
            fs::remove_file(&probe)?;
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("No write permission for {}", dir.display()),
        )
        .into()),
        Err(e) => Err(e.into()),
    }
}

/// `true` si `dir` es una carpeta cuyo contenido se puede listar.
pub fn is_readable_dir(dir: &Path) -> bool {
    dir.is_dir() && fs::read_dir(dir).is_ok()
}
