//! Main-executable resolution for a game folder
//!
//! Mods are installed next to the game's real executable, which is rarely at
//! the folder root (`Binaries/Win64` for Unreal titles, `Content` for Xbox
//! installs). The search runs in stages and stops at the first hit:
//! common subfolders, shipping-name patterns, the folder root, anything
//! else found, and finally a blacklisted binary as a degraded match.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::blacklist::{wildcard_match, ExecutableBlacklist};
use crate::logging::log_warning;
use crate::utils::{file_name_str, file_size, is_executable};

/// Maximum directory depth searched below a game folder
pub const MAX_DEPTH: usize = 4;

/// Subfolders probed first, in order
const COMMON_SUBFOLDERS: &[&str] = &[
    "Binaries/Win64",
    "Binaries/WinGDK",
    "Content",
    "bin/x64",
    "x64",
    "bin",
    "Game",
];

/// Shipping-executable name patterns, most specific first
const SHIPPING_PATTERNS: &[&str] = &[
    "*-Win64-Shipping.exe",
    "*-WinGDK-Shipping.exe",
    "*-Shipping.exe",
    "*Win64*.exe",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExeResolution {
    /// Directory holding the executable, or the game folder if none was found
    pub dir: PathBuf,
    pub exe_name: Option<String>,
    /// Only a blacklisted executable was available
    pub degraded: bool,
}

#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    size: u64,
}

impl Candidate {
    fn new(path: PathBuf) -> Self {
        let size = file_size(&path);
        Self { path, size }
    }
}

/// Largest candidate; on equal size the first one seen wins
fn largest(candidates: impl IntoIterator<Item = Candidate>) -> Option<Candidate> {
    candidates.into_iter().fold(None, |best, c| match best {
        Some(b) if b.size >= c.size => Some(b),
        _ => Some(c),
    })
}

fn exes_in(dir: &Path) -> Vec<Candidate> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_executable(p))
        .collect();
    paths.sort();
    paths.into_iter().map(Candidate::new).collect()
}

fn shipping_tier(name: &str) -> Option<usize> {
    SHIPPING_PATTERNS.iter().position(|p| wildcard_match(p, name))
}

fn resolved(folder: &Path, candidate: Candidate, degraded: bool) -> ExeResolution {
    ExeResolution {
        dir: candidate
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| folder.to_path_buf()),
        exe_name: file_name_str(&candidate.path).map(String::from),
        degraded,
    }
}

/// Locate the most probable main executable of `folder`
pub fn resolve_executable(folder: &Path, blacklist: &ExecutableBlacklist) -> ExeResolution {
    let allowed = |c: &Candidate| {
        file_name_str(&c.path).is_some_and(|n| !blacklist.is_blacklisted(n))
    };

    // 1. Well-known subfolders
    for sub in COMMON_SUBFOLDERS {
        let dir = folder.join(sub);
        if !dir.is_dir() {
            continue;
        }
        if let Some(best) = largest(exes_in(&dir).into_iter().filter(allowed)) {
            return resolved(folder, best, false);
        }
    }

    // 2. Bounded walk, scored by shipping pattern then size
    let mut shipping: Vec<(usize, Candidate)> = Vec::new();
    let mut others: Vec<Candidate> = Vec::new();
    let mut blocked: Vec<Candidate> = Vec::new();

    let walker = WalkDir::new(folder)
        .max_depth(MAX_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_executable(e.path()));

    for entry in walker {
        let candidate = Candidate::new(entry.into_path());
        let Some(name) = file_name_str(&candidate.path).map(String::from) else {
            continue;
        };
        if blacklist.is_blacklisted(&name) {
            blocked.push(candidate);
        } else if let Some(tier) = shipping_tier(&name) {
            shipping.push((tier, candidate));
        } else {
            others.push(candidate);
        }
    }

    if let Some(top) = shipping.iter().map(|(tier, _)| *tier).min() {
        let best = largest(
            shipping
                .into_iter()
                .filter(|(tier, _)| *tier == top)
                .map(|(_, c)| c),
        );
        if let Some(best) = best {
            return resolved(folder, best, false);
        }
    }

    // 3. Folder root, then anything else the walk found
    if let Some(best) = largest(exes_in(folder).into_iter().filter(allowed)) {
        return resolved(folder, best, false);
    }
    if let Some(best) = largest(others) {
        return resolved(folder, best, false);
    }

    // 4. Degraded: the largest blacklisted binary beats reporting nothing
    if let Some(best) = largest(blocked) {
        log_warning(&format!(
            "Only blacklisted executables in {}; using {}",
            folder.display(),
            best.path.display()
        ));
        return resolved(folder, best, true);
    }

    ExeResolution {
        dir: folder.to_path_buf(),
        exe_name: None,
        degraded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    const MB: u64 = 1024 * 1024;

    fn sparse(path: &Path, size: u64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap().set_len(size).unwrap();
    }

    #[test]
    fn blacklisted_crash_reporter_loses_to_game() {
        let dir = tempfile::tempdir().unwrap();
        sparse(&dir.path().join("CrashReportClient.exe"), 50 * MB);
        sparse(&dir.path().join("Game.exe"), 200 * MB);

        let res = resolve_executable(dir.path(), &ExecutableBlacklist::default());
        assert_eq!(res.exe_name.as_deref(), Some("Game.exe"));
        assert_eq!(res.dir, dir.path());
        assert!(!res.degraded);
    }

    #[test]
    fn lone_blacklisted_exe_is_degraded_match() {
        let dir = tempfile::tempdir().unwrap();
        sparse(&dir.path().join("Launcher.exe"), 10 * MB);

        let res = resolve_executable(dir.path(), &ExecutableBlacklist::default());
        assert_eq!(res.exe_name.as_deref(), Some("Launcher.exe"));
        assert!(res.degraded);
    }

    #[test]
    fn common_subfolder_wins_over_root() {
        let dir = tempfile::tempdir().unwrap();
        sparse(&dir.path().join("Game.exe"), 300 * MB);
        sparse(&dir.path().join("Binaries/Win64/Real.exe"), 100 * MB);

        let res = resolve_executable(dir.path(), &ExecutableBlacklist::default());
        assert_eq!(res.exe_name.as_deref(), Some("Real.exe"));
        assert_eq!(res.dir, dir.path().join("Binaries/Win64"));
    }

    #[test]
    fn shipping_pattern_beats_size() {
        let dir = tempfile::tempdir().unwrap();
        sparse(&dir.path().join("Proj/Tools/Big.exe"), 500 * MB);
        sparse(&dir.path().join("Proj/Out/Proj-Win64-Shipping.exe"), 90 * MB);
        sparse(&dir.path().join("Proj/Out/Proj-Shipping.exe"), 95 * MB);

        let res = resolve_executable(dir.path(), &ExecutableBlacklist::default());
        assert_eq!(res.exe_name.as_deref(), Some("Proj-Win64-Shipping.exe"));
        assert_eq!(res.dir, dir.path().join("Proj/Out"));
    }

    #[test]
    fn nothing_found_returns_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), "hi").unwrap();
        let res = resolve_executable(dir.path(), &ExecutableBlacklist::default());
        assert_eq!(res.exe_name, None);
        assert_eq!(res.dir, dir.path());
    }
}
