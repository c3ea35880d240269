//! Engine facade
//!
//! Owns the configuration, the scan cache and the per-target locks so
//! callers cannot forget either: every mutating call takes the target's lock
//! and invalidates the cache first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::game_finder::{collect_roots, scan, ExecutableBlacklist, GameEntry, ScanCache};
use crate::installers::{
    self, CombinedOutcome, InstallOptions, InstallReport, OrphanReport, TargetLocks, UninstallReport,
};
use crate::logging::log_action;
use crate::mod_source::ModSourceDescriptor;
use crate::version::{compute_status, GameStatus};

#[cfg(feature = "updater")]
use crate::github::ReleaseInfo;
#[cfg(feature = "updater")]
use crate::updater::{self, FullUpdateOutcome, GameUpdateReport, Progress};

pub struct ModManager {
    config: AppConfig,
    cache: Arc<ScanCache>,
    locks: TargetLocks,
    blacklist: ExecutableBlacklist,
}

impl ModManager {
    pub fn new(config: AppConfig) -> Self {
        let cache = if config.use_scan_cache {
            ScanCache::persistent(&config.cache_dir)
        } else {
            ScanCache::new()
        };
        Self {
            blacklist: ExecutableBlacklist::with_extra(&config.extra_blacklist),
            cache: Arc::new(cache),
            locks: TargetLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> Arc<ScanCache> {
        Arc::clone(&self.cache)
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// All games under every configured root
    pub fn scan(&self, use_cache: bool) -> Vec<GameEntry> {
        let roots = collect_roots(&self.config);
        scan(&roots, &self.blacklist, &self.cache, use_cache && self.config.use_scan_cache)
    }

    pub fn status(&self, target: &Path) -> GameStatus {
        compute_status(target, &self.config.mod_repository)
    }

    // ========================================================================
    // Mutations (locked, cache-invalidating)
    // ========================================================================

    fn mutate<T>(&self, target: &Path, f: impl FnOnce() -> T) -> T {
        self.locks.with_lock(target, || {
            self.cache.invalidate();
            f()
        })
    }

    pub fn install(
        &self,
        source: &ModSourceDescriptor,
        target: &Path,
        options: &InstallOptions,
    ) -> Result<InstallReport> {
        self.mutate(target, || installers::install(source, target, options))
    }

    pub fn install_combined(
        &self,
        primary: &ModSourceDescriptor,
        secondary: &ModSourceDescriptor,
        target: &Path,
        options: &InstallOptions,
    ) -> CombinedOutcome {
        self.mutate(target, || installers::install_combined(primary, secondary, target, options))
    }

    pub fn uninstall(&self, target: &Path) -> UninstallReport {
        self.mutate(target, || installers::uninstall(target))
    }

    pub fn restore_backups<S: AsRef<str>>(&self, target: &Path, names: &[S]) -> Result<Vec<String>> {
        self.mutate(target, || installers::restore_backups(target, names))
    }

    pub fn clean_orphan_backups(&self, target: &Path) -> Result<OrphanReport> {
        self.mutate(target, || installers::clean_orphan_backups(target))
    }

    pub fn clean_logs(&self, target: &Path) -> usize {
        self.locks.with_lock(target, || installers::clean_logs(target))
    }

    // ========================================================================
    // Batches: one result per target, a failure never stops the rest
    // ========================================================================

    pub fn install_many(
        &self,
        source: &ModSourceDescriptor,
        targets: &[PathBuf],
        options: &InstallOptions,
    ) -> Vec<(PathBuf, Result<InstallReport>)> {
        log_action(&format!("Installing into {} targets", targets.len()));
        targets
            .iter()
            .map(|t| (t.clone(), self.install(source, t, options)))
            .collect()
    }

    pub fn uninstall_many(&self, targets: &[PathBuf]) -> Vec<(PathBuf, UninstallReport)> {
        log_action(&format!("Uninstalling from {} targets", targets.len()));
        targets
            .iter()
            .map(|t| (t.clone(), self.uninstall(t)))
            .collect()
    }

    // ========================================================================
    // Updates
    // ========================================================================

    #[cfg(feature = "updater")]
    pub fn check_for_update(&self) -> Result<Option<ReleaseInfo>> {
        updater::fetch_latest_cached(&self.config)
    }

    #[cfg(feature = "updater")]
    pub fn update_game(&self, game_dir: &Path) -> Result<GameUpdateReport> {
        self.mutate(game_dir, || updater::update_game(&self.config.mod_repository, game_dir))
    }

    /// Update the repository and then every game in `game_dirs`
    #[cfg(feature = "updater")]
    pub fn update_all(&self, game_dirs: &[PathBuf], progress: Progress<'_>) -> Result<FullUpdateOutcome> {
        let release = self.check_for_update()?;
        let repo = &self.config.mod_repository;
        let tmp = self.config.get_tmp_path();

        self.cache.invalidate();
        updater::apply_release(release, repo, &[], |r| updater::install_release(r, repo, &tmp, progress)).map(
            |outcome| match outcome {
                FullUpdateOutcome::Updated { version, folder, .. } => {
                    let games = game_dirs
                        .iter()
                        .map(|dir| (dir.clone(), self.update_game(dir)))
                        .collect();
                    FullUpdateOutcome::Updated { version, folder, games }
                }
                other => other,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_finder::ModStatus;
    use crate::mod_source::ModKind;
    use std::fs;

    fn manager(root: &Path) -> ModManager {
        let config = AppConfig {
            mod_repository: root.join("repo"),
            cache_dir: root.join("cache"),
            user_scan_folders: vec![root.join("library")],
            use_scan_cache: true,
            ..Default::default()
        };
        ModManager::new(config)
    }

    #[test]
    fn install_invalidates_scan_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let game = tmp.path().join("library/Alpha");
        fs::create_dir_all(&game).unwrap();
        fs::File::create(game.join("Alpha.exe")).unwrap().set_len(1024).unwrap();

        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("OptiScaler.dll"), "payload").unwrap();
        fs::write(source.join("OptiScaler.ini"), "").unwrap();

        let manager = manager(tmp.path());
        let games = manager.scan(true);
        let alpha = games.iter().find(|g| g.display_name == "Alpha").unwrap();
        assert_eq!(alpha.mod_status, ModStatus::Absent);
        assert!(manager.cache().scanned_at().is_some());

        manager
            .install(
                &ModSourceDescriptor::new(&source, ModKind::Upscaler),
                &game,
                &InstallOptions::default(),
            )
            .unwrap();
        assert!(manager.cache().scanned_at().is_none());

        let games = manager.scan(true);
        let alpha = games.iter().find(|g| g.display_name == "Alpha").unwrap();
        assert_eq!(alpha.mod_status, ModStatus::UpscalerOnly);
        assert_eq!(manager.status(&game), GameStatus::Incomplete);
    }

    #[test]
    fn batches_report_each_target() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good");
        fs::create_dir_all(&good).unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("nvapi64.dll"), "").unwrap();
        fs::write(source.join("fakenvapi.ini"), "").unwrap();

        let manager = manager(tmp.path());
        let results = manager.install_many(
            &ModSourceDescriptor::new(&source, ModKind::FrameGen),
            &[good.clone(), tmp.path().join("missing")],
            &InstallOptions::default(),
        );
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());

        let removed = manager.uninstall_many(&[good.clone()]);
        assert!(removed[0].1.success);
        assert!(!good.join("nvapi64.dll").exists());
    }
}
