//! Scan-result cache
//!
//! One shared, lock-guarded value. Readers get a snapshot with mod status
//! recomputed from disk; anything that mutates a game folder must call
//! `invalidate()` first.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{compute_mod_status, GameEntry, ScanRoot};
use crate::logging::log_warning;

pub const CACHE_FILE: &str = "scan_cache.json";

#[derive(Serialize, Deserialize, Debug, Clone)]
struct CachedScan {
    roots: Vec<ScanRoot>,
    entries: Vec<GameEntry>,
    scanned_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ScanCache {
    state: Mutex<Option<CachedScan>>,
    persist_path: Option<PathBuf>,
}

impl ScanCache {
    /// In-memory cache only
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache mirrored to `<cache_dir>/scan_cache.json`
    pub fn persistent(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(None),
            persist_path: Some(cache_dir.into().join(CACHE_FILE)),
        }
    }

    /// Entries cached for exactly `roots`, with status recomputed and vanished folders dropped
    pub fn snapshot(&self, roots: &[ScanRoot]) -> Option<Vec<GameEntry>> {
        let mut state = self.state.lock();
        if state.is_none() {
            *state = self.load_persisted();
        }
        let cached = state.as_ref()?;
        if cached.roots != roots {
            return None;
        }

        Some(
            cached
                .entries
                .iter()
                .filter(|e| e.install_path.is_dir())
                .cloned()
                .map(|mut e| {
                    e.mod_status = compute_mod_status(&e.install_path);
                    e
                })
                .collect(),
        )
    }

    pub fn store(&self, roots: &[ScanRoot], entries: &[GameEntry]) {
        let cached = CachedScan {
            roots: roots.to_vec(),
            entries: entries.to_vec(),
            scanned_at: Utc::now(),
        };
        if let Some(path) = &self.persist_path {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            match serde_json::to_string(&cached) {
                Ok(json) => {
                    if let Err(e) = fs::write(path, json) {
                        log_warning(&format!("Failed to persist scan cache: {}", e));
                    }
                }
                Err(e) => log_warning(&format!("Failed to serialize scan cache: {}", e)),
            }
        }
        *self.state.lock() = Some(cached);
    }

    pub fn invalidate(&self) {
        *self.state.lock() = None;
        if let Some(path) = &self.persist_path {
            let _ = fs::remove_file(path);
        }
    }

    pub fn scanned_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().as_ref().map(|c| c.scanned_at)
    }

    fn load_persisted(&self) -> Option<CachedScan> {
        let path = self.persist_path.as_ref()?;
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }
}
