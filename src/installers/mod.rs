//! Mod installation into game folders
//!
//! `install` copies one mod family into a target folder under journal
//! discipline: file copies, directory replacement and the payload's spoof
//! rename either all land or are all undone. INI rewrite and the
//! installation record run afterwards and only produce warnings.

mod files;
mod transaction;

pub use files::{clean_logs, clean_orphan_backups, restore_backups, uninstall, OrphanReport, UninstallReport};
pub use transaction::{backup_path, DirOutcome, Journal, BACKUP_SUFFIX};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{Result, ScalerError};
use crate::ini::{write_options, ScalerOptions};
use crate::logging::{log_error, log_install, log_warning};
use crate::mod_source::{ModKind, ModSourceDescriptor, ResolvedSource, SpoofName, UPSCALER_CONFIG};
use crate::utils::{file_name_str, files_identical, find_child, path_key};
use crate::version::InstallationRecord;

// ============================================================================
// Shared Types
// ============================================================================

/// Operator choices for one install
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Filename the upscaler payload is renamed to
    pub spoof: SpoofName,
    /// INI settings to write after the files land; `None` keeps the shipped INI
    pub config: Option<ScalerOptions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub kind: ModKind,
    pub target: PathBuf,
    pub source_dir: PathBuf,
    pub files_copied: Vec<String>,
    pub dirs_replaced: Vec<String>,
    /// `.bak` files created by this install
    pub backups: Vec<PathBuf>,
    pub spoof_file: Option<String>,
    /// `Section.Key` entries the INI rewrite changed
    pub ini_changes: Vec<String>,
    /// Non-fatal problems: skipped directories, INI or record failures
    pub warnings: Vec<String>,
}

impl InstallReport {
    fn new(resolved: &ResolvedSource, target: &Path) -> Self {
        Self {
            kind: resolved.kind,
            target: target.to_path_buf(),
            source_dir: resolved.dir.clone(),
            files_copied: Vec::new(),
            dirs_replaced: Vec::new(),
            backups: Vec::new(),
            spoof_file: None,
            ini_changes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, msg: String) {
        log_warning(&msg);
        self.warnings.push(msg);
    }
}

/// Result of installing two families into one folder
#[derive(Debug)]
pub enum CombinedOutcome {
    Complete {
        primary: InstallReport,
        secondary: InstallReport,
    },
    /// The primary family is installed and stays installed
    PrimaryOnly {
        primary: InstallReport,
        secondary_error: ScalerError,
    },
    /// Nothing was installed
    Failed { error: ScalerError },
}

impl CombinedOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, CombinedOutcome::Complete { .. })
    }

    pub fn primary_installed(&self) -> bool {
        !matches!(self, CombinedOutcome::Failed { .. })
    }
}

// ============================================================================
// Per-target Locking
// ============================================================================

/// One mutex per canonical target folder. Entries live only while some
/// caller holds or waits on them.
#[derive(Debug, Default)]
pub struct TargetLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, target: &Path) -> Arc<Mutex<()>> {
        self.lock_key(path_key(target))
    }

    fn lock_key(&self, key: PathBuf) -> Arc<Mutex<()>> {
        self.locks.lock().entry(key).or_default().clone()
    }

    /// Run `f` while holding the lock of `target`
    pub fn with_lock<T>(&self, target: &Path, f: impl FnOnce() -> T) -> T {
        // The folder may appear or vanish inside `f`; keep the key it was locked under
        let key = path_key(target);
        let lock = self.lock_key(key.clone());
        let result = {
            let _guard = lock.lock();
            f()
        };
        drop(lock);
        self.prune(&key);
        result
    }

    /// Number of targets currently tracked
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&self, key: &Path) {
        let mut locks = self.locks.lock();
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }
}

// ============================================================================
// Install
// ============================================================================

/// Install the family described by `source` into `target`
pub fn install(source: &ModSourceDescriptor, target: &Path, options: &InstallOptions) -> Result<InstallReport> {
    if !target.is_dir() {
        return Err(ScalerError::config(format!(
            "Target folder does not exist: {}",
            target.display()
        )));
    }
    let resolved = source.resolve()?;
    let kind = resolved.kind;
    log_install(&format!(
        "Installing {} from {} into {}",
        kind.display_name(),
        resolved.dir.display(),
        target.display()
    ));

    let previous = InstallationRecord::read(target);
    let mut journal = Journal::new();
    let mut report = InstallReport::new(&resolved, target);

    if let Err(e) = stage_changes(&resolved, target, options, previous.as_ref(), &mut journal, &mut report) {
        log_error(&format!("Install into {} failed: {}", target.display(), e));
        for failure in journal.rollback() {
            report.warn(format!("Rollback incomplete: {}", failure));
        }
        return Err(e);
    }
    report.backups = journal.commit();

    if kind == ModKind::Upscaler {
        if let Some(config) = &options.config {
            let ini = find_child(target, UPSCALER_CONFIG).unwrap_or_else(|| target.join(UPSCALER_CONFIG));
            match write_options(&ini, config) {
                Ok(changed) => report.ini_changes = changed,
                Err(e) => report.warn(format!("INI not updated: {}", e)),
            }
        }
    }

    if let Err(e) = write_record(&resolved, target, previous.as_ref(), &report) {
        report.warn(format!("Installation record not written: {}", e));
    }

    log_install(&format!(
        "{} installed: {} files, {} dirs, {} backups",
        kind.display_name(),
        report.files_copied.len(),
        report.dirs_replaced.len(),
        report.backups.len()
    ));
    Ok(report)
}

/// Files, directories and the spoof rename. Any error here rolls back.
fn stage_changes(
    resolved: &ResolvedSource,
    target: &Path,
    options: &InstallOptions,
    previous: Option<&InstallationRecord>,
    journal: &mut Journal,
    report: &mut InstallReport,
) -> Result<()> {
    let kind = resolved.kind;
    // Files already belonging to this family are replaced without a backup
    let family_present = kind.is_present_in(target);

    for name in kind.mod_files() {
        let Some(src) = find_child(&resolved.dir, name) else {
            continue;
        };
        let dest = find_child(target, name).unwrap_or_else(|| target.join(name));
        let keep_backup = dest.exists() && !family_present && !files_identical(&src, &dest);
        journal.replace_file(&src, &dest, keep_backup)?;
        report.files_copied.push(name.to_string());
    }

    for name in kind.mod_dirs() {
        let Some(src) = find_child(&resolved.dir, name).filter(|p| p.is_dir()) else {
            continue;
        };
        let dest = find_child(target, name).unwrap_or_else(|| target.join(name));
        match journal.replace_dir(&src, &dest)? {
            DirOutcome::Replaced(_) => report.dirs_replaced.push(name.to_string()),
            DirOutcome::Skipped(reason) => {
                report.warn(format!("Skipped directory {}: {}", name, reason));
            }
        }
    }

    let Some(payload) = kind.payload() else {
        return Ok(());
    };
    let spoof = options.spoof;
    let previous_spoof = previous.and_then(|r| r.spoof());

    // Switching spoof names: drop the old payload and give the slot back its original
    if let Some(old) = previous_spoof.filter(|s| *s != spoof) {
        if let Some(old_path) = find_child(target, old.file_name()) {
            journal.remove_on_commit(&old_path)?;
            if let Some(bak) = find_child(target, &format!("{}{}", old.file_name(), BACKUP_SUFFIX)) {
                journal.move_file(&bak, &target.join(old.file_name()), false)?;
            }
        }
    }

    let spoof_dest = find_child(target, spoof.file_name()).unwrap_or_else(|| target.join(spoof.file_name()));
    match find_child(target, payload) {
        Some(payload_path) => {
            let ours = files_identical(&payload_path, &spoof_dest)
                || (previous_spoof == Some(spoof) && family_present);
            let keep_backup = spoof_dest.exists() && !ours;
            journal.move_file(&payload_path, &spoof_dest, keep_backup)?;
        }
        None if spoof_dest.exists() => {}
        None => {
            return Err(ScalerError::Installation {
                path: spoof_dest,
                reason: format!("{} missing and nothing to rename", payload),
            });
        }
    }
    report.spoof_file = file_name_str(&spoof_dest).map(String::from);
    Ok(())
}

/// Version of a release folder named like `OptiScaler_0.7.7-pre9` or `v0.7.7`
fn version_from_folder(path: &Path) -> String {
    let name = file_name_str(path).unwrap_or_default();
    match name.find(|c: char| c.is_ascii_digit()) {
        Some(i) => name[i..].to_string(),
        None => name.to_string(),
    }
}

/// The upscaler owns the record; a frame-gen install only writes one where none exists
fn write_record(
    resolved: &ResolvedSource,
    target: &Path,
    previous: Option<&InstallationRecord>,
    report: &InstallReport,
) -> Result<()> {
    if resolved.kind == ModKind::FrameGen
        && previous.is_some_and(|r| r.kind != Some(ModKind::FrameGen))
    {
        return Ok(());
    }

    let source_meta = InstallationRecord::read(&resolved.dir).or_else(|| InstallationRecord::read(&resolved.root));
    let mut record = match source_meta {
        Some(meta) => {
            let mut record = InstallationRecord::new(meta.version, meta.tag);
            record.source_url = meta.source_url;
            record
        }
        None => {
            let version = version_from_folder(&resolved.root);
            InstallationRecord::new(version.clone(), version)
        }
    };
    record.source_folder = resolved.dir.display().to_string();
    record.kind = Some(resolved.kind);
    record.spoof_name = report.spoof_file.clone();
    record.write(target)
}

/// Install `primary`, then `secondary` only if the first succeeded
pub fn install_combined(
    primary: &ModSourceDescriptor,
    secondary: &ModSourceDescriptor,
    target: &Path,
    options: &InstallOptions,
) -> CombinedOutcome {
    let primary = match install(primary, target, options) {
        Ok(report) => report,
        Err(error) => return CombinedOutcome::Failed { error },
    };
    match install(secondary, target, options) {
        Ok(secondary) => CombinedOutcome::Complete { primary, secondary },
        Err(secondary_error) => {
            log_warning(&format!(
                "{} kept in {}; second mod failed: {}",
                primary.kind.display_name(),
                target.display(),
                secondary_error
            ));
            CombinedOutcome::PrimaryOnly { primary, secondary_error }
        }
    }
}
