//! Shared path and filesystem helpers used across the application

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// Lexically normalize a path: drop `.` components, fold `..`, strip trailing separators.
/// Does not touch the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonical path when it exists, lexical normalization otherwise.
/// Used as the identity of a game folder for dedup and locking.
pub fn path_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| normalize_path(path))
}

/// True for `*.exe` regardless of case
pub fn is_executable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("exe"))
}

pub fn file_name_str(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Find an immediate child by name, ignoring ASCII case (game files ship with
/// inconsistent casing and may live on case-sensitive filesystems).
pub fn find_child(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.exists() {
        return Some(exact);
    }
    let entries = fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .find(|e| e.file_name().to_str().is_some_and(|n| n.eq_ignore_ascii_case(name)))
        .map(|e| e.path())
}

/// Regular files directly inside `dir`, sorted by name
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// True if `dir` exists and has at least one entry
pub fn dir_has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Byte-for-byte comparison of two files; false if either cannot be read
pub fn files_identical(a: &Path, b: &Path) -> bool {
    let (Ok(meta_a), Ok(meta_b)) = (fs::metadata(a), fs::metadata(b)) else {
        return false;
    };
    if meta_a.len() != meta_b.len() {
        return false;
    }
    let (Ok(mut file_a), Ok(mut file_b)) = (fs::File::open(a), fs::File::open(b)) else {
        return false;
    };

    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    loop {
        let Ok(n) = file_a.read(&mut buf_a) else {
            return false;
        };
        if n == 0 {
            return true;
        }
        if file_b.read_exact(&mut buf_b[..n]).is_err() || buf_a[..n] != buf_b[..n] {
            return false;
        }
    }
}

/// Recursively copy a directory tree
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<u64> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Remove a file or a directory tree, whichever `path` is
pub fn remove_path(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c/")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_find_child_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("OptiScaler.INI"), "x").unwrap();
        let found = find_child(dir.path(), "optiscaler.ini").unwrap();
        assert_eq!(file_name_str(&found), Some("OptiScaler.INI"));
        assert!(find_child(dir.path(), "missing.dll").is_none());
    }

    #[test]
    fn test_files_identical() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        fs::write(&a, b"payload").unwrap();
        fs::write(&b, b"payload").unwrap();
        fs::write(&c, b"payloae").unwrap();
        assert!(files_identical(&a, &b));
        assert!(!files_identical(&a, &c));
        assert!(!files_identical(&a, &dir.path().join("missing")));
    }

    #[test]
    fn test_copy_dir_all() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/one.txt"), "1").unwrap();
        fs::write(src.join("two.txt"), "2").unwrap();

        let dst = dir.path().join("dst");
        assert_eq!(copy_dir_all(&src, &dst).unwrap(), 2);
        assert_eq!(fs::read_to_string(dst.join("nested/one.txt")).unwrap(), "1");
    }
}
