//! Epic Games detection
//!
//! Two sources: the Epic launcher's `*.item` manifests on Windows, and
//! Heroic's legendary library on Linux.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{Platform, ScanRoot};
use crate::logging::{log_info, log_warning};

/// Epic launcher manifest folder on Windows
pub const EPIC_MANIFEST_DIR: &str = r"C:\ProgramData\Epic\EpicGamesLauncher\Data\Manifests";

/// Possible Heroic configuration paths
const HEROIC_PATHS: &[&str] = &[
    ".config/heroic",
    ".var/app/com.heroicgameslauncher.hgl/config/heroic",
];

// ============================================================================
// Epic Launcher Manifests
// ============================================================================

#[derive(Debug, Deserialize)]
struct EpicManifest {
    #[serde(rename = "DisplayName")]
    display_name: Option<String>,
    #[serde(rename = "InstallLocation")]
    install_location: Option<String>,
    #[serde(rename = "bIsIncompleteInstall", default)]
    incomplete: bool,
}

/// Game roots from Epic launcher manifests in `dir` (the default folder when `None`)
pub fn epic_manifest_roots(dir: Option<&Path>) -> Vec<ScanRoot> {
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None if cfg!(windows) => PathBuf::from(EPIC_MANIFEST_DIR),
        None => return Vec::new(),
    };
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut items: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("item"))
        })
        .collect();
    items.sort();

    let mut roots = Vec::new();
    for item in items {
        let Ok(content) = fs::read_to_string(&item) else {
            continue;
        };
        let manifest: EpicManifest = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                log_warning(&format!("Bad Epic manifest {}: {}", item.display(), e));
                continue;
            }
        };
        if manifest.incomplete {
            continue;
        }
        let Some(location) = manifest.install_location else {
            continue;
        };
        let path = PathBuf::from(location);
        if path.is_dir() {
            roots.push(ScanRoot::game(path, Platform::Epic, manifest.display_name));
        }
    }

    log_info(&format!("Epic: {} games from manifests", roots.len()));
    roots
}

// ============================================================================
// Heroic (legendary)
// ============================================================================

/// Game roots for Epic titles installed through Heroic
pub fn heroic_epic_roots() -> Vec<ScanRoot> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    HEROIC_PATHS
        .iter()
        .map(|p| home.join(p))
        .filter(|p| p.exists())
        .flat_map(|p| legendary_roots(&p))
        .collect()
}

/// Parse `legendaryConfig/legendary/installed.json` or the store cache
fn legendary_roots(heroic_path: &Path) -> Vec<ScanRoot> {
    let installed_json = [
        heroic_path.join("legendaryConfig/legendary/installed.json"),
        heroic_path.join("store_cache/legendary_library.json"),
    ]
    .into_iter()
    .find(|p| p.exists());

    let Some(installed_json) = installed_json else {
        return Vec::new();
    };
    let Ok(content) = fs::read_to_string(&installed_json) else {
        return Vec::new();
    };
    let Ok(library) = serde_json::from_str::<serde_json::Value>(&content) else {
        log_warning(&format!("Failed to parse {}", installed_json.display()));
        return Vec::new();
    };
    let Some(games) = library.as_object() else {
        return Vec::new();
    };

    let mut roots = Vec::new();
    for (app_name, game) in games {
        if game.get("is_installed").and_then(|v| v.as_bool()) == Some(false) {
            continue;
        }
        let platform = game.get("platform").and_then(|v| v.as_str());
        if !platform.is_some_and(|p| p.eq_ignore_ascii_case("windows")) {
            continue;
        }
        let Some(install_path) = game.get("install_path").and_then(|v| v.as_str()) else {
            continue;
        };
        let path = PathBuf::from(install_path);
        if !path.is_dir() {
            continue;
        }
        let title = game
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or(app_name)
            .to_string();
        roots.push(ScanRoot::game(path, Platform::Epic, Some(title)));
    }

    log_info(&format!(
        "Heroic: {} Epic games in {}",
        roots.len(),
        heroic_path.display()
    ));
    roots
}
