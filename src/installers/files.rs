//! Uninstall and backup housekeeping for a game folder

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::transaction::{backup_path, BACKUP_SUFFIX};
use crate::error::{Result, ScalerError};
use crate::logging::{log_action, log_info, log_install, log_warning};
use crate::mod_source::{is_spoof_name, ModKind, SpoofName};
use crate::utils::{file_name_str, find_child, list_files, remove_path};
use crate::version::InstallationRecord;

#[derive(Debug, Clone, Default, Serialize)]
pub struct UninstallReport {
    /// No known item failed to delete
    pub success: bool,
    pub removed: Vec<String>,
    pub failed: Vec<String>,
    /// `.bak` files of spoof names left for the caller to restore
    pub restorable_backups: Vec<PathBuf>,
    pub record_removed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrphanReport {
    pub restored: Vec<String>,
    pub removed: Vec<String>,
}

/// Every filename any mod family places directly in a game folder
fn known_file_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = ModKind::ALL
        .iter()
        .flat_map(|k| k.mod_files().iter().copied())
        .collect();
    names.extend(SpoofName::ALL.iter().map(|s| s.file_name()));
    names
}

/// Original name of a `<name>.bak` file
fn original_name(bak: &Path) -> Option<&str> {
    let name = file_name_str(bak)?;
    let split = name.len().checked_sub(BACKUP_SUFFIX.len()).filter(|n| *n > 0)?;
    let suffix = name.get(split..)?;
    suffix
        .eq_ignore_ascii_case(BACKUP_SUFFIX)
        .then(|| name.get(..split))
        .flatten()
}

fn backups_in(target: &Path) -> Vec<PathBuf> {
    list_files(target)
        .into_iter()
        .filter(|p| original_name(p).is_some())
        .collect()
}

/// Spoof files that belong to the mod in `target`
fn spoof_files_to_remove(target: &Path, record: Option<&InstallationRecord>) -> Vec<&'static str> {
    if let Some(spoof) = record.and_then(|r| r.spoof()) {
        return vec![spoof.file_name()];
    }
    if record.is_some_and(|r| r.kind == Some(ModKind::FrameGen)) {
        return Vec::new();
    }
    // Without a record only the upscaler's presence vouches for a spoof file
    if !ModKind::Upscaler.is_present_in(target) {
        return Vec::new();
    }
    log_warning(&format!(
        "No installation record in {}; removing every spoof filename",
        target.display()
    ));
    SpoofName::ALL.iter().map(|s| s.file_name()).collect()
}

/// Remove both mod families from `target`.
///
/// Per-item failures are collected, not fatal. Backups are reported, never restored.
pub fn uninstall(target: &Path) -> UninstallReport {
    log_install(&format!("Uninstalling mods from {}", target.display()));
    let record = InstallationRecord::read(target);
    let mut report = UninstallReport::default();

    let mut items: Vec<&str> = ModKind::ALL
        .iter()
        .flat_map(|k| k.mod_files().iter().chain(k.mod_dirs().iter()).copied())
        .collect();
    items.extend(spoof_files_to_remove(target, record.as_ref()));

    for name in items {
        let Some(path) = find_child(target, name) else {
            continue;
        };
        match remove_path(&path) {
            Ok(()) => report.removed.push(name.to_string()),
            Err(e) => {
                log_warning(&format!("Failed to remove {}: {}", path.display(), e));
                report.failed.push(name.to_string());
            }
        }
    }

    report.restorable_backups = backups_in(target)
        .into_iter()
        .filter(|p| original_name(p).is_some_and(is_spoof_name))
        .collect();

    match InstallationRecord::remove(target) {
        Ok(removed) => report.record_removed = removed,
        Err(e) => {
            log_warning(&format!("{}", e));
            report.failed.push(crate::version::RECORD_FILE.to_string());
        }
    }

    report.success = report.failed.is_empty();
    log_install(&format!(
        "Uninstall finished: {} removed, {} failed, {} backups restorable",
        report.removed.len(),
        report.failed.len(),
        report.restorable_backups.len()
    ));
    report
}

/// Rename `<name>.bak` back over `<name>` for each name that has a backup
pub fn restore_backups<S: AsRef<str>>(target: &Path, names: &[S]) -> Result<Vec<String>> {
    let mut restored = Vec::new();
    for name in names {
        let name = name.as_ref();
        let original = target.join(name);
        let bak = find_child(target, &format!("{}{}", name, BACKUP_SUFFIX))
            .unwrap_or_else(|| backup_path(&original));
        if !bak.is_file() {
            continue;
        }
        if let Some(current) = find_child(target, name) {
            remove_path(&current).map_err(|e| ScalerError::from_io(&current, "Failed to remove", e))?;
        }
        fs::rename(&bak, &original)
            .map_err(|e| ScalerError::from_io(&bak, "Failed to restore backup", e))?;
        log_action(&format!("Restored {}", original.display()));
        restored.push(name.to_string());
    }
    Ok(restored)
}

/// Settle `.bak` files of known names: restore into an empty slot, delete otherwise
pub fn clean_orphan_backups(target: &Path) -> Result<OrphanReport> {
    let known = known_file_names();
    let mut report = OrphanReport::default();

    for bak in backups_in(target) {
        let Some(original) = original_name(&bak).map(String::from) else {
            continue;
        };
        if !known.iter().any(|k| k.eq_ignore_ascii_case(&original)) {
            continue;
        }

        if find_child(target, &original).is_some() {
            fs::remove_file(&bak).map_err(|e| ScalerError::from_io(&bak, "Failed to remove backup", e))?;
            report.removed.push(original);
        } else {
            let dest = target.join(&original);
            fs::rename(&bak, &dest)
                .map_err(|e| ScalerError::from_io(&bak, "Failed to restore backup", e))?;
            report.restored.push(original);
        }
    }

    log_info(&format!(
        "Orphan backups in {}: {} restored, {} removed",
        target.display(),
        report.restored.len(),
        report.removed.len()
    ));
    Ok(report)
}

/// Delete the mods' log files; returns how many were removed
pub fn clean_logs(target: &Path) -> usize {
    let mut removed = 0;
    for name in ModKind::ALL.iter().flat_map(|k| k.log_files().iter()) {
        let Some(path) = find_child(target, name) else {
            continue;
        };
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => log_warning(&format!("Failed to remove {}: {}", path.display(), e)),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_name_parsing() {
        assert_eq!(original_name(Path::new("/g/dxgi.dll.bak")), Some("dxgi.dll"));
        assert_eq!(original_name(Path::new("/g/DXGI.DLL.BAK")), Some("DXGI.DLL"));
        assert_eq!(original_name(Path::new("/g/.bak")), None);
        assert_eq!(original_name(Path::new("/g/dxgi.dll")), None);
    }

    #[test]
    fn uninstall_without_record_spares_game_dlls() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dxgi.dll"), "system").unwrap();
        fs::write(dir.path().join("fakenvapi.ini"), "").unwrap();
        fs::write(dir.path().join("nvapi64.dll"), "").unwrap();

        let report = uninstall(dir.path());
        assert!(report.success);
        assert!(dir.path().join("dxgi.dll").exists());
        assert!(!dir.path().join("nvapi64.dll").exists());
    }

    #[test]
    fn uninstall_reports_spoof_backups() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("OptiScaler.ini"), "").unwrap();
        fs::write(dir.path().join("winmm.dll"), "payload").unwrap();
        fs::write(dir.path().join("winmm.dll.bak"), "system").unwrap();
        fs::write(dir.path().join("libxess.dll.bak"), "old").unwrap();
        let mut record = InstallationRecord::new("0.7.7", "v0.7.7");
        record.spoof_name = Some("winmm.dll".into());
        record.write(dir.path()).unwrap();

        let report = uninstall(dir.path());
        assert!(report.record_removed);
        assert_eq!(report.restorable_backups, vec![dir.path().join("winmm.dll.bak")]);
        assert!(!dir.path().join("winmm.dll").exists());
        assert!(dir.path().join("winmm.dll.bak").exists());
    }

    #[test]
    fn second_uninstall_converges() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("OptiScaler");
        fs::create_dir_all(source.join("D3D12_Optiscaler")).unwrap();
        fs::write(source.join("OptiScaler.dll"), "payload").unwrap();
        fs::write(source.join("OptiScaler.ini"), "[Upscalers]\n").unwrap();
        fs::write(source.join("libxess.dll"), "xess").unwrap();
        fs::write(source.join("D3D12_Optiscaler/D3D12Core.dll"), "core").unwrap();
        let target = tmp.path().join("Game");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("dxgi.dll"), "system").unwrap();

        let file_set = |dir: &Path| -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(dir)
                .unwrap()
                .flatten()
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect();
            names.sort();
            names
        };

        crate::installers::install(
            &crate::mod_source::ModSourceDescriptor::new(&source, ModKind::Upscaler),
            &target,
            &crate::installers::InstallOptions::default(),
        )
        .unwrap();

        let first = uninstall(&target);
        assert!(first.success);
        assert!(first.record_removed);
        let after_first = file_set(&target);

        let second = uninstall(&target);
        assert!(second.success);
        assert!(second.removed.is_empty());
        assert!(!second.record_removed);
        assert_eq!(second.restorable_backups, first.restorable_backups);
        assert_eq!(file_set(&target), after_first);
        assert_eq!(after_first, vec!["dxgi.dll.bak"]);
    }

    #[test]
    fn orphans_restore_or_delete() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dxgi.dll.bak"), "system").unwrap();
        fs::write(dir.path().join("nvapi64.dll"), "current").unwrap();
        fs::write(dir.path().join("nvapi64.dll.bak"), "stale").unwrap();
        fs::write(dir.path().join("save.dat.bak"), "user").unwrap();

        let report = clean_orphan_backups(dir.path()).unwrap();
        assert_eq!(report.restored, vec!["dxgi.dll"]);
        assert_eq!(report.removed, vec!["nvapi64.dll"]);
        assert_eq!(fs::read_to_string(dir.path().join("dxgi.dll")).unwrap(), "system");
        assert_eq!(fs::read_to_string(dir.path().join("nvapi64.dll")).unwrap(), "current");
        assert!(dir.path().join("save.dat.bak").exists());
    }

    #[test]
    fn restore_named_backups() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dxgi.dll"), "payload").unwrap();
        fs::write(dir.path().join("dxgi.dll.bak"), "system").unwrap();

        let restored = restore_backups(dir.path(), &["dxgi.dll", "winmm.dll"]).unwrap();
        assert_eq!(restored, vec!["dxgi.dll"]);
        assert_eq!(fs::read_to_string(dir.path().join("dxgi.dll")).unwrap(), "system");
        assert!(!dir.path().join("dxgi.dll.bak").exists());
    }

    #[test]
    fn logs_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("OptiScaler.log"), "").unwrap();
        fs::write(dir.path().join("fakenvapi.log"), "").unwrap();
        assert_eq!(clean_logs(dir.path()), 2);
        assert_eq!(clean_logs(dir.path()), 0);
    }
}
