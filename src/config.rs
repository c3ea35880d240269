use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::log_warning;

/// Default release feed for the upscaler mod
pub const DEFAULT_FEED_URL: &str = "https://api.github.com/repos/optiscaler/OptiScaler/releases";

// ============================================================================
// Main App Config
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct AppConfig {
    /// Local mod repository holding one folder per downloaded release
    pub mod_repository: PathBuf,
    /// Discovery and release-feed cache
    pub cache_dir: PathBuf,
    /// Extra library folders registered by the user
    pub user_scan_folders: Vec<PathBuf>,
    /// Extra executable names/patterns never picked as a game's main executable
    pub extra_blacklist: Vec<String>,
    /// Wine prefixes whose registry files are read for launcher install paths
    pub wine_prefixes: Vec<PathBuf>,
    /// Release feed (JSON list of releases)
    pub feed_url: String,
    /// How long a fetched feed stays valid in the cache
    pub feed_cache_minutes: i64,
    /// Reuse the persisted scan result instead of walking every library
    pub use_scan_cache: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mod_repository: app_path!("mods"),
            cache_dir: app_path!("cache"),
            user_scan_folders: Vec::new(),
            extra_blacklist: Vec::new(),
            wine_prefixes: Vec::new(),
            feed_url: DEFAULT_FEED_URL.to_string(),
            feed_cache_minutes: 30,
            use_scan_cache: true,
        }
    }
}

impl AppConfig {
    fn get_path() -> PathBuf {
        app_path!("config.json")
    }

    /// Scratch space for downloads in progress
    pub fn get_tmp_path(&self) -> PathBuf {
        self.cache_dir.join("tmp")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::get_path())
    }

    /// Load from an explicit file; a missing or corrupt file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => log_warning(&format!(
                        "Ignoring unreadable config {}: {}",
                        path.display(),
                        e
                    )),
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        self.save_to(&Self::get_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = fs::write(path, json);
        }
    }

    /// Register a user scan folder; returns false if it was already known
    pub fn add_scan_folder(&mut self, folder: &Path) -> bool {
        let folder = crate::utils::normalize_path(folder);
        if self
            .user_scan_folders
            .iter()
            .any(|f| crate::utils::normalize_path(f) == folder)
        {
            return false;
        }
        self.user_scan_folders.push(folder);
        true
    }

    pub fn remove_scan_folder(&mut self, folder: &Path) -> bool {
        let folder = crate::utils::normalize_path(folder);
        let before = self.user_scan_folders.len();
        self.user_scan_folders
            .retain(|f| crate::utils::normalize_path(f) != folder);
        self.user_scan_folders.len() != before
    }

    /// Clear the cache directory
    pub fn clear_cache(&self) -> Result<(), std::io::Error> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_scan_folder_matches_normalized_paths() {
        let mut config = AppConfig::default();
        assert!(config.add_scan_folder(Path::new("/mnt/games")));
        assert!(config.remove_scan_folder(Path::new("/mnt/./games/")));
        assert!(!config.remove_scan_folder(Path::new("/mnt/games")));
        assert!(config.user_scan_folders.is_empty());
    }

    #[test]
    fn clear_cache_empties_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            cache_dir: dir.path().join("cache"),
            ..Default::default()
        };
        config.clear_cache().unwrap();
        assert!(!config.cache_dir.exists());

        fs::create_dir_all(config.get_tmp_path()).unwrap();
        fs::write(config.cache_dir.join("scan_cache.json"), "{}").unwrap();
        config.clear_cache().unwrap();
        assert!(config.cache_dir.is_dir());
        assert_eq!(fs::read_dir(&config.cache_dir).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert!(config.user_scan_folders.is_empty());
    }

    #[test]
    fn save_and_load_keeps_scan_folders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");

        let mut config = AppConfig::default();
        assert!(config.add_scan_folder(Path::new("/mnt/games")));
        assert!(!config.add_scan_folder(Path::new("/mnt/games/")));
        config.save_to(&path);

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.user_scan_folders, vec![PathBuf::from("/mnt/games")]);
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"feed_cache_minutes": 5}"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.feed_cache_minutes, 5);
        assert!(config.use_scan_cache);
    }
}
