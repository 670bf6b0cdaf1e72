//! Crate `songsort_paths`: rutas, locks y caché de carátulas de songsort

mod errors;
mod fs_utils;
mod paths;

pub use errors::Error;
pub use paths::{ENV_BASE_DIR, SongsortPaths};

pub use directories::UserDirs;

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    /// Ejecuta `f` con `ENV_BASE_DIR` apuntando a `base` y restaura el valor previo.
    fn with_base_env<T>(base: &std::path::Path, f: impl FnOnce() -> T) -> T {
        let previous = std::env::var_os(ENV_BASE_DIR);
        // SAFETY: solo este test toca la variable.
        unsafe { std::env::set_var(ENV_BASE_DIR, base) };
        let out = f();
        match previous {
            Some(value) => unsafe { std::env::set_var(ENV_BASE_DIR, value) },
            None => unsafe { std::env::remove_var(ENV_BASE_DIR) },
        }
        out
    }

    #[test]
    fn env_override_is_respected() {
        let tmp = tempdir().unwrap();
        let paths = with_base_env(tmp.path(), SongsortPaths::new).unwrap();

        assert_eq!(paths.config_dir, tmp.path().join("config"));
        assert_eq!(paths.preferences_file, paths.config_dir.join("preferences.toml"));
        assert_eq!(paths.library_db, tmp.path().join("data").join("library.db"));
    }

    #[test]
    fn artwork_paths_are_sharded_by_hash_prefix() {
        let tmp = tempdir().unwrap();
        let paths = SongsortPaths::with_base(tmp.path()).unwrap();

        let p = paths.artwork_path("1A47929b", ".png").unwrap();
        assert_eq!(p, paths.artwork_dir.join("1a").join("1a47929b.png"));

        let ensured = paths.ensure_artwork_path("ff00", "jpg").unwrap();
        assert!(ensured.parent().unwrap().is_dir());
        assert!(!ensured.exists());
    }

    #[test]
    fn artwork_path_rejects_bad_hashes() {
        let tmp = tempdir().unwrap();
        let paths = SongsortPaths::with_base(tmp.path()).unwrap();

        for bad in ["f", "zzzz"] {
            match paths.artwork_path(bad, "jpg").unwrap_err() {
                Error::InvalidArtworkHash(h) => assert_eq!(h, bad),
                other => panic!("esperaba InvalidArtworkHash, llegó {other:?}"),
            }
        }
    }

    #[test]
    fn structure_and_lock() {
        let tmp = tempdir().unwrap();
        let paths = SongsortPaths::with_base(tmp.path()).unwrap();

        assert!(paths.config_dir.exists());
        assert!(paths.artwork_dir.exists());
        assert!(!paths.access_file.exists());
        assert!(paths.is_first_run());

        let _lock = paths.lock().unwrap();
        assert!(!paths.is_first_run());
    }

    #[test]
    fn readable_dirs() {
        let tmp = tempdir().unwrap();
        let paths = SongsortPaths::with_base(tmp.path()).unwrap();
        let file = tmp.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();

        assert!(paths.is_readable_dir(tmp.path()));
        assert!(!paths.is_readable_dir(&file));
        assert!(!paths.is_readable_dir(&tmp.path().join("missing")));
    }

    #[test]
    fn validate_structure_recreates_missing_dirs() {
        let tmp = tempdir().unwrap();
        let paths = SongsortPaths::with_base(tmp.path()).unwrap();

        fs::remove_dir_all(&paths.cache_dir).unwrap();
        paths.validate_structure().unwrap();

        assert!(paths.artwork_dir.exists());
    }
}
