//! Steam game detection
//!
//! Finds Steam installations, expands them through `libraryfolders.vdf` and
//! turns each installed `appmanifest_*.acf` into a named game root. Every
//! library's `steamapps/common` is also added as a plain library root so
//! games without a readable manifest are still found.

use std::fs;
use std::path::{Path, PathBuf};

use super::vdf::{parse_library_folders, AppManifest};
use super::{Platform, ScanRoot};
use crate::logging::log_info;

/// Steam installation paths relative to the home directory
const STEAM_PATHS: &[&str] = &[
    ".local/share/Steam",
    ".steam/debian-installation",
    ".steam/steam",
    ".var/app/com.valvesoftware.Steam/data/Steam",
    ".var/app/com.valvesoftware.Steam/.local/share/Steam",
    "snap/steam/common/.local/share/Steam",
];

/// Windows default installation paths
const WINDOWS_STEAM_PATHS: &[&str] = &[
    r"C:\Program Files (x86)\Steam",
    r"C:\Program Files\Steam",
];

/// Roots for every Steam installation found on this machine
pub fn steam_library_roots() -> Vec<ScanRoot> {
    let mut roots = Vec::new();
    let installs = find_steam_installations();

    for install in &installs {
        roots.extend(steam_roots_from_install(install));
    }

    // Secondary libraries that are not listed anywhere we can read
    if cfg!(windows) {
        for drive in b'C'..=b'Z' {
            let library = PathBuf::from(format!("{}:\\SteamLibrary", drive as char));
            if library.join("steamapps").is_dir() {
                roots.extend(library_roots(&library));
            }
        }
    }

    log_info(&format!(
        "Steam: {} installations, {} scan roots",
        installs.len(),
        roots.len()
    ));
    roots
}

fn find_steam_installations() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.extend(STEAM_PATHS.iter().map(|p| home.join(p)));
    }
    if cfg!(windows) {
        candidates.extend(WINDOWS_STEAM_PATHS.iter().map(PathBuf::from));
    }

    let mut installations: Vec<PathBuf> = Vec::new();
    for path in candidates {
        if !path.join("steamapps").exists() && !path.join("steam.pid").exists() {
            continue;
        }
        // Symlinked installs show up under several names
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if installations
            .iter()
            .any(|i| i.canonicalize().unwrap_or_else(|_| i.clone()) == canonical)
        {
            continue;
        }
        log_info(&format!("Found Steam installation: {}", path.display()));
        installations.push(path);
    }
    installations
}

/// Roots for one Steam installation: itself plus every library it lists
pub fn steam_roots_from_install(steam_path: &Path) -> Vec<ScanRoot> {
    get_library_folders(steam_path)
        .iter()
        .flat_map(|library| library_roots(library))
        .collect()
}

fn get_library_folders(steam_path: &Path) -> Vec<PathBuf> {
    let mut folders = vec![steam_path.to_path_buf()];

    for vdf_path in [
        steam_path.join("steamapps/libraryfolders.vdf"),
        steam_path.join("config/libraryfolders.vdf"),
    ] {
        let Ok(content) = fs::read_to_string(&vdf_path) else {
            continue;
        };
        for path_str in parse_library_folders(&content) {
            let path = PathBuf::from(&path_str);
            if path.exists() && !folders.contains(&path) {
                folders.push(path);
            }
        }
    }

    folders
}

/// Named game roots from manifests, then the `common` folder as a fallback
fn library_roots(library: &Path) -> Vec<ScanRoot> {
    let steamapps = library.join("steamapps");
    let common = steamapps.join("common");
    let mut roots = Vec::new();

    if let Ok(entries) = fs::read_dir(&steamapps) {
        let mut manifests: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("appmanifest_") && n.ends_with(".acf"))
            })
            .collect();
        manifests.sort();

        for path in manifests {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let Some(manifest) = AppManifest::from_vdf(&content) else {
                continue;
            };
            if !manifest.is_installed() {
                continue;
            }
            let install_path = common.join(&manifest.install_dir);
            if install_path.is_dir() {
                roots.push(ScanRoot::game(install_path, Platform::Steam, Some(manifest.name)));
            }
        }
    }

    if common.is_dir() {
        roots.push(ScanRoot::library(common, Platform::Steam));
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_finder::RootKind;

    fn manifest(app_id: &str, name: &str, dir: &str, flags: u32) -> String {
        format!(
            "\"AppState\"\n{{\n  \"appid\" \"{}\"\n  \"name\" \"{}\"\n  \"StateFlags\" \"{}\"\n  \"installdir\" \"{}\"\n}}\n",
            app_id, name, flags, dir
        )
    }

    #[test]
    fn manifests_become_named_game_roots() {
        let steam = tempfile::tempdir().unwrap();
        let steamapps = steam.path().join("steamapps");
        fs::create_dir_all(steamapps.join("common/Cyberpunk 2077")).unwrap();
        fs::create_dir_all(steamapps.join("common/Half Done")).unwrap();
        fs::write(
            steamapps.join("appmanifest_1091500.acf"),
            manifest("1091500", "Cyberpunk 2077", "Cyberpunk 2077", 4),
        )
        .unwrap();
        fs::write(
            steamapps.join("appmanifest_2.acf"),
            manifest("2", "Half Done", "Half Done", 1026),
        )
        .unwrap();

        let roots = steam_roots_from_install(steam.path());
        assert_eq!(roots.len(), 2);
        assert_eq!(
            roots[0].kind,
            RootKind::Game { display_name: Some("Cyberpunk 2077".into()) }
        );
        assert_eq!(roots[1].kind, RootKind::Library);
        assert_eq!(roots[1].path, steamapps.join("common"));
    }

    #[test]
    fn library_folders_are_followed() {
        let steam = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir_all(steam.path().join("steamapps/common")).unwrap();
        fs::create_dir_all(second.path().join("steamapps/common")).unwrap();
        let vdf = format!(
            "\"libraryfolders\"\n{{\n  \"0\" {{ \"path\" \"{}\" }}\n  \"1\" {{ \"path\" \"{}\" }}\n}}\n",
            steam.path().display(),
            second.path().display()
        );
        fs::write(steam.path().join("steamapps/libraryfolders.vdf"), vdf).unwrap();

        let roots = steam_roots_from_install(steam.path());
        let paths: Vec<_> = roots.iter().map(|r| r.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                steam.path().join("steamapps/common"),
                second.path().join("steamapps/common")
            ]
        );
    }
}
