//! Installed-version tracking
//!
//! Each game folder (and the mod repository root) carries a `version.json`
//! describing which release is present. The record is informational: marker
//! files decide whether a mod is installed, the record only decides whether
//! it is current.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScalerError};
use crate::mod_source::{
    ModKind, SpoofName, UPSCALER_CONFIG, UPSCALER_PAYLOAD, UPSCALER_RUNTIME_DIR,
};
use crate::utils::{dir_has_entries, find_child};

pub const RECORD_FILE: &str = "version.json";

// ============================================================================
// Installation Record
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InstallationRecord {
    pub version: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub source_folder: String,
    #[serde(default)]
    pub source_url: String,
    pub installed_at: DateTime<Utc>,
    /// Spoof filename the payload was renamed to in this folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoof_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModKind>,
}

impl InstallationRecord {
    pub fn new(version: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            tag: tag.into(),
            source_folder: String::new(),
            source_url: String::new(),
            installed_at: Utc::now(),
            spoof_name: None,
            kind: None,
        }
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(RECORD_FILE)
    }

    /// Read the record in `dir`; absent or unreadable records are `None`
    pub fn read(dir: &Path) -> Option<Self> {
        let content = fs::read_to_string(Self::path_in(dir)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = Self::path_in(dir);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| ScalerError::from_io(&path, "Failed to write record", e))
    }

    /// Remove the record in `dir`; returns whether one existed
    pub fn remove(dir: &Path) -> Result<bool> {
        let path = Self::path_in(dir);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ScalerError::from_io(&path, "Failed to remove record", e)),
        }
    }

    pub fn spoof(&self) -> Option<SpoofName> {
        self.spoof_name.as_deref().and_then(SpoofName::from_file_name)
    }
}

// ============================================================================
// Version Comparison
// ============================================================================

/// Strip a leading `v`/`V` from a release tag
pub fn normalize_version(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix('v')
        .or_else(|| tag.strip_prefix('V'))
        .unwrap_or(tag)
}

/// Compare two version strings.
///
/// Dot-separated numeric segments are compared as zero-padded tuples, so
/// `1.0 == 1.0.0` and `1.10.0 > 1.9.9`. If any segment of either side is not a
/// number the whole strings are compared lexicographically instead.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = normalize_version(a);
    let b = normalize_version(b);

    let parse = |v: &str| -> Option<Vec<u64>> {
        v.split('.').map(|s| s.parse::<u64>().ok()).collect()
    };

    match (parse(a), parse(b)) {
        (Some(pa), Some(pb)) => {
            let len = pa.len().max(pb.len());
            for i in 0..len {
                let x = pa.get(i).copied().unwrap_or(0);
                let y = pb.get(i).copied().unwrap_or(0);
                match x.cmp(&y) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        }
        _ => a.cmp(b),
    }
}

pub fn is_newer_version(latest: &str, current: &str) -> bool {
    compare_versions(latest, current) == Ordering::Greater
}

// ============================================================================
// Install State
// ============================================================================

/// Upscaler present: config marker, or the payload under its own or a spoofed name
pub fn is_installed(dir: &Path) -> bool {
    if ModKind::Upscaler.is_present_in(dir) {
        return true;
    }
    // A spoof-named file alone is usually the game's own DLL; only the record vouches for it
    InstallationRecord::read(dir)
        .and_then(|r| r.spoof())
        .is_some_and(|s| find_child(dir, s.file_name()).is_some())
}

/// Stricter than `is_installed`: config, one DLL variant and a populated runtime directory
pub fn is_complete(dir: &Path) -> bool {
    if find_child(dir, UPSCALER_CONFIG).is_none() {
        return false;
    }
    // The recorded spoof name is authoritative; scan every name only without one
    let spoofs: Vec<SpoofName> = match InstallationRecord::read(dir).and_then(|r| r.spoof()) {
        Some(spoof) => vec![spoof],
        None => SpoofName::ALL.to_vec(),
    };
    let has_dll = find_child(dir, UPSCALER_PAYLOAD).is_some()
        || spoofs.iter().any(|s| find_child(dir, s.file_name()).is_some());
    if !has_dll {
        return false;
    }
    find_child(dir, UPSCALER_RUNTIME_DIR).is_some_and(|d| dir_has_entries(&d))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    NotInstalled,
    Incomplete,
    UpToDate,
    UpdateAvailable,
}

impl GameStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            GameStatus::NotInstalled => "Not installed",
            GameStatus::Incomplete => "Incomplete",
            GameStatus::UpToDate => "Up to date",
            GameStatus::UpdateAvailable => "Update available",
        }
    }
}

/// Status of a game folder against the newest release in the mod repository
pub fn compute_status(game_dir: &Path, repo_dir: &Path) -> GameStatus {
    if !is_installed(game_dir) {
        return GameStatus::NotInstalled;
    }
    if !is_complete(game_dir) {
        return GameStatus::Incomplete;
    }

    let installed = InstallationRecord::read(game_dir);
    let latest = InstallationRecord::read(repo_dir);
    match (installed, latest) {
        (Some(installed), Some(latest))
            if !installed.version.is_empty()
                && !latest.version.is_empty()
                && is_newer_version(&latest.version, &installed.version) =>
        {
            GameStatus::UpdateAvailable
        }
        _ => GameStatus::UpToDate,
    }
}
