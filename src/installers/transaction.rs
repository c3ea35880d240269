//! Install journal
//!
//! Every change an install makes to a target folder is recorded as a staged
//! action. On failure the journal is replayed in reverse so the folder ends
//! in its pre-operation state. On success, temporary stages are deleted and
//! user-visible `.bak` backups are kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScalerError};
use crate::logging::{log_action, log_error, log_warning};
use crate::utils::{copy_dir_all, remove_path};

/// Suffix of the single-slot backup kept next to a replaced original
pub const BACKUP_SUFFIX: &str = ".bak";
/// Suffix of an original moved aside for the duration of one install only
const STAGE_SUFFIX: &str = ".scalerkit-stage";

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, BACKUP_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug)]
enum Action {
    /// `original` was renamed to `staged`
    Staged {
        original: PathBuf,
        staged: PathBuf,
        keep: bool,
    },
    /// `path` did not exist before this install
    Created { path: PathBuf },
    /// `from` was renamed to `to`
    Moved { from: PathBuf, to: PathBuf },
}

/// Outcome of a lenient directory replacement
#[derive(Debug, PartialEq, Eq)]
pub enum DirOutcome {
    Replaced(u64),
    Skipped(String),
}

#[derive(Debug, Default)]
pub struct Journal {
    actions: Vec<Action>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Move an existing `original` out of the way.
    ///
    /// With `keep` the file goes to `<name>.bak` (a prior `.bak` is deleted
    /// at commit, restored on rollback) and survives commit; otherwise it goes to a temporary stage
    /// that commit deletes.
    pub fn stage_aside(&mut self, original: &Path, keep: bool) -> Result<Option<PathBuf>> {
        let staged = if keep {
            backup_path(original)
        } else {
            with_suffix(original, STAGE_SUFFIX)
        };
        self.stage(original, staged, keep)
    }

    fn stage(&mut self, original: &Path, staged: PathBuf, keep: bool) -> Result<Option<PathBuf>> {
        if fs::symlink_metadata(original).is_err() {
            return Ok(None);
        }
        // The slot's previous occupant waits in its own stage until commit
        if fs::symlink_metadata(&staged).is_ok() {
            self.stage(&staged, with_suffix(&staged, STAGE_SUFFIX), false)?;
        }
        fs::rename(original, &staged).map_err(|e| ScalerError::install_io(original, e))?;

        self.actions.push(Action::Staged {
            original: original.to_path_buf(),
            staged: staged.clone(),
            keep,
        });
        Ok(Some(staged))
    }

    /// Copy `src` to `dest`, staging any existing `dest` first
    pub fn replace_file(&mut self, src: &Path, dest: &Path, keep_backup: bool) -> Result<Option<PathBuf>> {
        let backup = self.stage_aside(dest, keep_backup)?;
        fs::copy(src, dest).map_err(|e| ScalerError::install_io(dest, e))?;
        self.actions.push(Action::Created { path: dest.to_path_buf() });
        Ok(backup.filter(|_| keep_backup))
    }

    /// Rename `from` onto `to`, staging any existing `to` first
    pub fn move_file(&mut self, from: &Path, to: &Path, keep_backup: bool) -> Result<Option<PathBuf>> {
        let backup = self.stage_aside(to, keep_backup)?;
        fs::rename(from, to).map_err(|e| ScalerError::install_io(from, e))?;
        self.actions.push(Action::Moved {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        Ok(backup.filter(|_| keep_backup))
    }

    /// Remove `path` at commit; restored on rollback
    pub fn remove_on_commit(&mut self, path: &Path) -> Result<bool> {
        Ok(self.stage_aside(path, false)?.is_some())
    }

    /// Replace directory `dest` wholesale with a copy of `src`. The old tree
    /// waits in `<dir>.bak` until commit.
    ///
    /// Access errors undo just this directory and are reported as `Skipped`;
    /// any other error is fatal.
    pub fn replace_dir(&mut self, src: &Path, dest: &Path) -> Result<DirOutcome> {
        let mark = self.actions.len();
        if let Err(e) = self.stage(dest, backup_path(dest), false) {
            self.undo_since(mark).map_err(|e| ScalerError::install_io(dest, e))?;
            return if e.is_permission_denied() {
                Ok(DirOutcome::Skipped(e.to_string()))
            } else {
                Err(e)
            };
        }

        match copy_dir_all(src, dest) {
            Ok(count) => {
                self.actions.push(Action::Created { path: dest.to_path_buf() });
                Ok(DirOutcome::Replaced(count))
            }
            Err(e) => {
                let _ = remove_path(dest);
                self.undo_since(mark).map_err(|e| ScalerError::install_io(dest, e))?;
                if e.kind() == io::ErrorKind::PermissionDenied {
                    Ok(DirOutcome::Skipped(e.to_string()))
                } else {
                    Err(ScalerError::install_io(dest, e))
                }
            }
        }
    }

    /// Undo the actions recorded after `mark`, newest first
    fn undo_since(&mut self, mark: usize) -> io::Result<()> {
        while self.actions.len() > mark {
            if let Some(action) = self.actions.pop() {
                undo(&action)?;
            }
        }
        Ok(())
    }

    /// Make the changes permanent. Returns the `.bak` files kept.
    pub fn commit(self) -> Vec<PathBuf> {
        let mut kept = Vec::new();
        for action in self.actions {
            let Action::Staged { staged, keep, .. } = action else {
                continue;
            };
            if keep {
                kept.push(staged);
            } else if let Err(e) = remove_path(&staged) {
                log_warning(&format!("Failed to remove {}: {}", staged.display(), e));
            }
        }
        kept
    }

    /// Undo every recorded action, newest first. Returns steps that could not be undone.
    pub fn rollback(self) -> Vec<String> {
        let mut failures = Vec::new();
        log_action(&format!("Rolling back {} staged actions", self.actions.len()));

        for action in self.actions.into_iter().rev() {
            if let Err(e) = undo(&action) {
                let msg = format!("{:?}: {}", action, e);
                log_error(&format!("Rollback step failed: {}", msg));
                failures.push(msg);
            }
        }
        failures
    }
}

fn undo(action: &Action) -> io::Result<()> {
    match action {
        Action::Created { path } => remove_path(path).or_else(ignore_missing),
        Action::Moved { from, to } => fs::rename(to, from),
        Action::Staged { original, staged, .. } => fs::rename(staged, original),
    }
}

fn ignore_missing(e: io::Error) -> io::Result<()> {
    if e.kind() == io::ErrorKind::NotFound {
        Ok(())
    } else {
        Err(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::list_files;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn rollback_restores_original_state() {
        let src = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.dll"), "new a").unwrap();
        fs::write(src.path().join("b.dll"), "new b").unwrap();
        fs::write(target.path().join("a.dll"), "old a").unwrap();
        fs::write(target.path().join("a.dll.bak"), "ancient a").unwrap();

        let mut journal = Journal::new();
        journal
            .replace_file(&src.path().join("a.dll"), &target.path().join("a.dll"), true)
            .unwrap();
        journal
            .replace_file(&src.path().join("b.dll"), &target.path().join("b.dll"), true)
            .unwrap();
        assert_eq!(fs::read_to_string(target.path().join("a.dll.bak")).unwrap(), "old a");

        assert!(journal.rollback().is_empty());
        assert_eq!(fs::read_to_string(target.path().join("a.dll")).unwrap(), "old a");
        assert_eq!(fs::read_to_string(target.path().join("a.dll.bak")).unwrap(), "ancient a");
        assert_eq!(names(target.path()), vec!["a.dll", "a.dll.bak"]);
    }

    #[test]
    fn commit_keeps_one_backup_per_slot() {
        let src = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.dll"), "new a").unwrap();
        fs::write(target.path().join("a.dll"), "old a").unwrap();
        fs::write(target.path().join("a.dll.bak"), "ancient a").unwrap();

        let mut journal = Journal::new();
        journal
            .replace_file(&src.path().join("a.dll"), &target.path().join("a.dll"), true)
            .unwrap();
        journal.commit();
        assert_eq!(fs::read_to_string(target.path().join("a.dll.bak")).unwrap(), "old a");
        assert_eq!(names(target.path()), vec!["a.dll", "a.dll.bak"]);
    }

    #[test]
    fn failed_dir_copy_restores_previous_dir_backup() {
        let target = tempfile::tempdir().unwrap();
        fs::create_dir_all(target.path().join("Runtime")).unwrap();
        fs::write(target.path().join("Runtime/old.dll"), "old").unwrap();
        fs::create_dir_all(target.path().join("Runtime.bak")).unwrap();
        fs::write(target.path().join("Runtime.bak/older.dll"), "older").unwrap();

        let mut journal = Journal::new();
        let missing = target.path().join("no-such-source");
        assert!(journal.replace_dir(&missing, &target.path().join("Runtime")).is_err());
        assert!(journal.is_empty());
        assert_eq!(names(target.path()), vec!["Runtime", "Runtime.bak"]);
        assert_eq!(fs::read_to_string(target.path().join("Runtime.bak/older.dll")).unwrap(), "older");
    }

    #[test]
    fn commit_keeps_backups_and_drops_stages() {
        let src = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.dll"), "new").unwrap();
        fs::write(target.path().join("a.dll"), "old").unwrap();
        fs::write(target.path().join("c.dll"), "old").unwrap();

        let mut journal = Journal::new();
        journal
            .replace_file(&src.path().join("a.dll"), &target.path().join("a.dll"), true)
            .unwrap();
        journal
            .replace_file(&src.path().join("a.dll"), &target.path().join("c.dll"), false)
            .unwrap();

        let kept = journal.commit();
        assert_eq!(kept, vec![target.path().join("a.dll.bak")]);
        assert_eq!(names(target.path()), vec!["a.dll", "a.dll.bak", "c.dll"]);
    }

    #[test]
    fn move_file_is_undone() {
        let target = tempfile::tempdir().unwrap();
        fs::write(target.path().join("payload.dll"), "payload").unwrap();
        fs::write(target.path().join("dxgi.dll"), "system").unwrap();

        let mut journal = Journal::new();
        journal
            .move_file(&target.path().join("payload.dll"), &target.path().join("dxgi.dll"), true)
            .unwrap();
        assert_eq!(names(target.path()), vec!["dxgi.dll", "dxgi.dll.bak"]);

        journal.rollback();
        assert_eq!(names(target.path()), vec!["dxgi.dll", "payload.dll"]);
        assert_eq!(fs::read_to_string(target.path().join("dxgi.dll")).unwrap(), "system");
    }

    #[test]
    fn replace_dir_stages_old_tree() {
        let src = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("Runtime")).unwrap();
        fs::write(src.path().join("Runtime/new.dll"), "new").unwrap();
        fs::create_dir_all(target.path().join("Runtime")).unwrap();
        fs::write(target.path().join("Runtime/old.dll"), "old").unwrap();

        let mut journal = Journal::new();
        let outcome = journal
            .replace_dir(&src.path().join("Runtime"), &target.path().join("Runtime"))
            .unwrap();
        assert_eq!(outcome, DirOutcome::Replaced(1));

        journal.rollback();
        assert_eq!(
            list_files(&target.path().join("Runtime")),
            vec![target.path().join("Runtime/old.dll")]
        );
        assert_eq!(names(target.path()), vec!["Runtime"]);
    }

    #[test]
    fn replace_dir_commit_removes_stage() {
        let src = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("Runtime")).unwrap();
        fs::write(src.path().join("Runtime/new.dll"), "new").unwrap();
        fs::create_dir_all(target.path().join("Runtime")).unwrap();

        let mut journal = Journal::new();
        journal
            .replace_dir(&src.path().join("Runtime"), &target.path().join("Runtime"))
            .unwrap();
        assert!(journal.commit().is_empty());
        assert_eq!(names(target.path()), vec!["Runtime"]);
    }
}
