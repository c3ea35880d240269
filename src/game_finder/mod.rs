//! Game detection module
//!
//! Finds game installations across launchers and reports, per game, the
//! folder the mods belong in and which mod families are already there.
//!
//! Roots come from three independent sources:
//! - fixed launcher locations (Steam libraries, Epic, Xbox)
//! - registry-derived launcher paths (Windows registry or Wine prefixes)
//! - folders registered by the user
//!
//! A failing source only loses its own roots.
//!
//! # Example
//!
//! ```rust,ignore
//! use scalerkit::config::AppConfig;
//! use scalerkit::game_finder::{collect_roots, scan, ExecutableBlacklist, ScanCache};
//!
//! let config = AppConfig::load();
//! let roots = collect_roots(&config);
//! let cache = ScanCache::persistent(&config.cache_dir);
//! for game in scan(&roots, &ExecutableBlacklist::default(), &cache, true) {
//!     println!("{} [{:?}] -> {}", game.display_name, game.platform, game.executable_name);
//! }
//! ```

mod blacklist;
mod cache;
mod epic;
mod executable;
pub mod registry;
mod steam;
mod vdf;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use blacklist::{wildcard_match, ExecutableBlacklist};
pub use cache::ScanCache;
pub use epic::{epic_manifest_roots, heroic_epic_roots};
pub use executable::{resolve_executable, ExeResolution, MAX_DEPTH};
pub use steam::{steam_library_roots, steam_roots_from_install};
pub use vdf::{parse_library_folders, parse_vdf, AppManifest, VdfValue};

use crate::config::AppConfig;
use crate::error::Result;
use crate::logging::{log_info, log_warning};
use crate::mod_source::ModKind;
use crate::utils::path_key;

// ============================================================================
// Core Types
// ============================================================================

/// The launcher/store a game was installed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Steam,
    Epic,
    Xbox,
    Custom,
}

impl Platform {
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Steam => "Steam",
            Platform::Epic => "Epic Games",
            Platform::Xbox => "Xbox / Game Pass",
            Platform::Custom => "Custom",
        }
    }
}

/// Which mod families are present in a game's executable folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModStatus {
    Absent,
    UpscalerOnly,
    FrameGenOnly,
    Complete,
}

/// A detected game installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEntry {
    /// Folder holding the main executable; mods are installed here
    pub install_path: PathBuf,
    pub display_name: String,
    pub executable_name: String,
    pub platform: Platform,
    pub mod_status: ModStatus,
}

/// How a root is turned into candidate game folders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootKind {
    /// Every immediate subfolder is a game (e.g. `steamapps/common`)
    Library,
    /// The root itself is one game folder
    Game { display_name: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRoot {
    pub path: PathBuf,
    pub platform: Platform,
    pub kind: RootKind,
}

impl ScanRoot {
    pub fn library(path: impl Into<PathBuf>, platform: Platform) -> Self {
        Self { path: path.into(), platform, kind: RootKind::Library }
    }

    pub fn game(path: impl Into<PathBuf>, platform: Platform, name: Option<String>) -> Self {
        Self {
            path: path.into(),
            platform,
            kind: RootKind::Game { display_name: name },
        }
    }
}

/// Library subfolders that are launcher runtimes, not games
const IGNORED_FOLDERS: &[&str] = &[
    "Steamworks Shared",
    "Steam Controller Configs",
    "SteamLinuxRuntime*",
    "Proton *",
    "Proton-*",
    "DirectXRedist",
];

// ============================================================================
// Mod Status
// ============================================================================

/// Pure function of marker files in `dir`
pub fn compute_mod_status(dir: &Path) -> ModStatus {
    let upscaler = ModKind::Upscaler.is_present_in(dir);
    let frame_gen = ModKind::FrameGen.is_present_in(dir);
    match (upscaler, frame_gen) {
        (true, true) => ModStatus::Complete,
        (true, false) => ModStatus::UpscalerOnly,
        (false, true) => ModStatus::FrameGenOnly,
        (false, false) => ModStatus::Absent,
    }
}

// ============================================================================
// Root Collection
// ============================================================================

/// Well-known launcher locations
pub fn fixed_roots() -> Result<Vec<ScanRoot>> {
    let mut roots = steam_library_roots();
    roots.extend(epic_manifest_roots(None));
    roots.extend(heroic_epic_roots());

    if cfg!(windows) {
        for drive in b'C'..=b'Z' {
            let drive_root = PathBuf::from(format!("{}:\\", drive as char));
            if !drive_root.exists() {
                continue;
            }
            for (relative, platform) in [
                ("Program Files\\Epic Games", Platform::Epic),
                ("Epic Games", Platform::Epic),
                ("XboxGames", Platform::Xbox),
                ("Program Files\\ModifiableWindowsApps", Platform::Xbox),
            ] {
                let path = drive_root.join(relative);
                if path.is_dir() {
                    roots.push(ScanRoot::library(path, platform));
                }
            }
        }
    }

    Ok(roots)
}

/// User-registered folders
pub fn user_roots(folders: &[PathBuf]) -> Result<Vec<ScanRoot>> {
    Ok(folders
        .iter()
        .filter(|f| {
            let exists = f.is_dir();
            if !exists {
                log_warning(&format!("Registered scan folder missing: {}", f.display()));
            }
            exists
        })
        .map(|f| ScanRoot::library(f.clone(), Platform::Custom))
        .collect())
}

/// All roots from every source, deduplicated; a failing source is logged and skipped
pub fn collect_roots(config: &AppConfig) -> Vec<ScanRoot> {
    let sources: [(&str, Result<Vec<ScanRoot>>); 3] = [
        ("fixed", fixed_roots()),
        ("registry", registry::registry_roots(&config.wine_prefixes)),
        ("user", user_roots(&config.user_scan_folders)),
    ];

    let mut seen = HashSet::new();
    let mut roots = Vec::new();
    for (name, result) in sources {
        match result {
            Ok(found) => {
                for root in found {
                    if seen.insert(path_key(&root.path)) {
                        roots.push(root);
                    }
                }
            }
            Err(e) => log_warning(&format!("Skipping {} scan roots: {}", name, e)),
        }
    }
    roots
}

// ============================================================================
// Scanning
// ============================================================================

fn is_ignored_folder(name: &str) -> bool {
    name.starts_with('.') || IGNORED_FOLDERS.iter().any(|p| wildcard_match(p, name))
}

/// Candidate game folders for one root with display names
fn candidate_folders(root: &ScanRoot) -> Vec<(PathBuf, String)> {
    match &root.kind {
        RootKind::Game { display_name } => {
            if !root.path.is_dir() {
                return Vec::new();
            }
            let name = display_name.clone().unwrap_or_else(|| folder_name(&root.path));
            vec![(root.path.clone(), name)]
        }
        RootKind::Library => {
            let entries = match fs::read_dir(&root.path) {
                Ok(entries) => entries,
                Err(e) => {
                    log_warning(&format!("Cannot read {}: {}", root.path.display(), e));
                    return Vec::new();
                }
            };
            let mut folders: Vec<(PathBuf, String)> = entries
                .flatten()
                .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                .map(|e| e.path())
                .map(|p| {
                    let name = folder_name(&p);
                    (p, name)
                })
                .filter(|(_, name)| !is_ignored_folder(name))
                .collect();
            folders.sort();
            folders
        }
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Scan all roots for games. Never fails; unreadable roots are logged and skipped.
pub fn scan(
    roots: &[ScanRoot],
    blacklist: &ExecutableBlacklist,
    cache: &ScanCache,
    use_cache: bool,
) -> Vec<GameEntry> {
    if use_cache {
        if let Some(entries) = cache.snapshot(roots) {
            log_info(&format!("Using cached scan ({} games)", entries.len()));
            return entries;
        }
    }

    let mut seen = HashSet::new();
    let mut games = Vec::new();

    for root in roots {
        for (folder, display_name) in candidate_folders(root) {
            let resolution = resolve_executable(&folder, blacklist);
            let Some(executable_name) = resolution.exe_name else {
                continue;
            };
            if !seen.insert(path_key(&resolution.dir)) {
                continue;
            }
            games.push(GameEntry {
                mod_status: compute_mod_status(&resolution.dir),
                install_path: resolution.dir,
                display_name,
                executable_name,
                platform: root.platform,
            });
        }
    }

    games.sort_by_key(|g| g.display_name.to_lowercase());
    log_info(&format!(
        "Scan complete: {} games across {} roots",
        games.len(),
        roots.len()
    ));

    cache.store(roots, &games);
    games
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn make_game(library: &Path, name: &str, exe: &str) -> PathBuf {
        let dir = library.join(name);
        fs::create_dir_all(&dir).unwrap();
        File::create(dir.join(exe)).unwrap().set_len(4096).unwrap();
        dir
    }

    #[test]
    fn scan_finds_games_and_skips_folders_without_exe() {
        let lib = tempfile::tempdir().unwrap();
        make_game(lib.path(), "Alpha", "Alpha.exe");
        make_game(lib.path(), "Beta", "Beta.exe");
        fs::create_dir_all(lib.path().join("Empty")).unwrap();
        make_game(lib.path(), "Steamworks Shared", "setup.exe");

        let roots = vec![ScanRoot::library(lib.path(), Platform::Steam)];
        let games = scan(&roots, &ExecutableBlacklist::default(), &ScanCache::new(), false);

        let names: Vec<_> = games.iter().map(|g| g.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert!(games.iter().all(|g| g.platform == Platform::Steam));
        assert!(games.iter().all(|g| g.mod_status == ModStatus::Absent));
    }

    #[test]
    fn unreadable_root_does_not_drop_others() {
        let lib = tempfile::tempdir().unwrap();
        make_game(lib.path(), "Alpha", "Alpha.exe");

        let roots = vec![
            ScanRoot::library(lib.path().join("missing"), Platform::Epic),
            ScanRoot::library(lib.path(), Platform::Custom),
        ];
        let games = scan(&roots, &ExecutableBlacklist::default(), &ScanCache::new(), false);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].platform, Platform::Custom);
    }

    #[test]
    fn cached_status_is_recomputed() {
        let lib = tempfile::tempdir().unwrap();
        let game = make_game(lib.path(), "Alpha", "Alpha.exe");
        let roots = vec![ScanRoot::library(lib.path(), Platform::Steam)];
        let cache = ScanCache::new();

        let first = scan(&roots, &ExecutableBlacklist::default(), &cache, true);
        assert_eq!(first[0].mod_status, ModStatus::Absent);

        fs::write(game.join("OptiScaler.ini"), "").unwrap();
        fs::write(game.join("fakenvapi.ini"), "").unwrap();
        let cached = cache.snapshot(&roots).unwrap();
        assert_eq!(cached[0].mod_status, ModStatus::Complete);

        cache.invalidate();
        assert!(cache.snapshot(&roots).is_none());
    }

    #[test]
    fn persistent_cache_survives_reload() {
        let lib = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        make_game(lib.path(), "Alpha", "Alpha.exe");
        let roots = vec![ScanRoot::library(lib.path(), Platform::Steam)];

        scan(&roots, &ExecutableBlacklist::default(), &ScanCache::persistent(cache_dir.path()), false);

        let reloaded = ScanCache::persistent(cache_dir.path());
        assert_eq!(reloaded.snapshot(&roots).unwrap().len(), 1);
        let other_roots = vec![ScanRoot::library(cache_dir.path(), Platform::Steam)];
        assert!(reloaded.snapshot(&other_roots).is_none());
    }

    #[test]
    fn mod_status_by_markers() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(compute_mod_status(dir.path()), ModStatus::Absent);
        fs::write(dir.path().join("dlssg_to_fsr3_amd_is_better.dll"), "").unwrap();
        assert_eq!(compute_mod_status(dir.path()), ModStatus::FrameGenOnly);
        fs::write(dir.path().join("OptiScaler.ini"), "").unwrap();
        assert_eq!(compute_mod_status(dir.path()), ModStatus::Complete);
    }

    #[test]
    fn game_roots_keep_launcher_names() {
        let lib = tempfile::tempdir().unwrap();
        let dir = make_game(lib.path(), "cp2077", "Cyberpunk2077.exe");
        let roots = vec![ScanRoot::game(&dir, Platform::Epic, Some("Cyberpunk 2077".into()))];
        let games = scan(&roots, &ExecutableBlacklist::default(), &ScanCache::new(), false);
        assert_eq!(games[0].display_name, "Cyberpunk 2077");
        assert_eq!(games[0].executable_name, "Cyberpunk2077.exe");
    }
}
