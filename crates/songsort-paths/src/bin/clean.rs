use std::path::Path;

use songsort_paths::SongsortPaths;

fn main() {
    let paths = match SongsortPaths::new() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("No se pudieron resolver las rutas de songsort: {e}");
            std::process::exit(1);
        }
    };

    println!("Limpieza de songsort. Se eliminarán:");
    println!("- Configuración: {}", paths.config_dir.display());
    println!("- Datos: {}", paths.data_dir.display());
    println!("- Caché: {}", paths.cache_dir.display());
    println!();

    clean_directory(&paths.config_dir, "configuración");
    clean_directory(&paths.data_dir, "datos");
    clean_directory(&paths.cache_dir, "caché");

    println!("\nLimpieza completada.");
}

fn clean_directory(path: &Path, name: &str) {
    if !path.exists() {
        println!("- La carpeta de {name} no existe, se omite.");
        return;
    }

    print!("- Eliminando carpeta de {name}: ");
    match std::fs::remove_dir_all(path) {
        Ok(_) => println!("hecho"),
        Err(e) => println!("error, no se pudo eliminar: {e}"),
    }
}
