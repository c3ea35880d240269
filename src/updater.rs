//! Mod repository updater
//!
//! Checks the release feed, downloads and unpacks new releases into the
//! local mod repository and refreshes the core files of installed games.
//! Network or extraction failures never touch installed state.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::archive::extract_archive;
use crate::config::AppConfig;
use crate::error::{Result, ScalerError};
use crate::github::{latest_release, GithubRelease, ReleaseInfo};
use crate::installers::{DirOutcome, Journal};
use crate::logging::{log_download, log_error, log_info, log_warning};
use crate::mod_source::{resolve_source, ModKind, SpoofName, UPSCALER_CONFIG};
use crate::utils::{find_child, file_name_str};
use crate::version::{is_installed, is_newer_version, InstallationRecord};

const USER_AGENT: &str = concat!("ScalerKit/", env!("CARGO_PKG_VERSION"));
const FEED_CACHE_FILE: &str = "feed_cache.json";
const CHUNK_SIZE: usize = 65536;

/// Progress callback: `(bytes_done, bytes_total)`; returning `false` cancels
pub type Progress<'a> = &'a mut dyn FnMut(u64, Option<u64>) -> bool;

// ============================================================================
// Release Feed
// ============================================================================

/// Fetch and parse the feed; a single release object is accepted as a one-item feed
pub fn fetch_feed(feed_url: &str) -> Result<Vec<GithubRelease>> {
    log_info(&format!("Checking releases: {}", feed_url));
    let response = ureq::get(feed_url)
        .set("User-Agent", USER_AGENT)
        .set("Accept", "application/vnd.github+json")
        .call()
        .map_err(ScalerError::network)?;
    let value: serde_json::Value = response.into_json().map_err(ScalerError::network)?;
    parse_feed(value)
}

fn parse_feed(value: serde_json::Value) -> Result<Vec<GithubRelease>> {
    let feed = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|release| vec![release])
    };
    feed.map_err(|e| ScalerError::config(format!("Malformed release feed: {}", e)))
}

/// Newest release with a usable archive, or `None` if the feed has none
pub fn fetch_latest(feed_url: &str) -> Result<Option<ReleaseInfo>> {
    let feed = fetch_feed(feed_url)?;
    let latest = latest_release(&feed);
    match &latest {
        Some(info) => log_info(&format!("Latest release: {} ({})", info.tag_name, info.asset_name)),
        None => log_warning("Release feed has no release with a supported archive"),
    }
    Ok(latest)
}

#[derive(Serialize, Deserialize, Debug)]
struct FeedCache {
    feed_url: String,
    fetched_at: DateTime<Utc>,
    release: Option<ReleaseInfo>,
}

/// Cached answer for `feed_url` if younger than `max_age`
fn read_feed_cache(path: &Path, feed_url: &str, max_age: Duration) -> Option<Option<ReleaseInfo>> {
    let content = fs::read_to_string(path).ok()?;
    let cache: FeedCache = serde_json::from_str(&content).ok()?;
    let fresh = cache.feed_url == feed_url && Utc::now() - cache.fetched_at < max_age;
    fresh.then_some(cache.release)
}

fn write_feed_cache(path: &Path, feed_url: &str, release: &Option<ReleaseInfo>) {
    let cache = FeedCache {
        feed_url: feed_url.to_string(),
        fetched_at: Utc::now(),
        release: release.clone(),
    };
    let written = serde_json::to_string_pretty(&cache)
        .map_err(|e| e.to_string())
        .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
    if let Err(e) = written {
        log_warning(&format!("Failed to cache release feed: {}", e));
    }
}

/// `fetch_latest` memoized in the cache directory for `feed_cache_minutes`
pub fn fetch_latest_cached(config: &AppConfig) -> Result<Option<ReleaseInfo>> {
    let path = config.cache_dir.join(FEED_CACHE_FILE);
    let max_age = Duration::minutes(config.feed_cache_minutes.clamp(0, 60 * 24 * 365));
    if let Some(cached) = read_feed_cache(&path, &config.feed_url, max_age) {
        log_info("Using cached release feed");
        return Ok(cached);
    }

    let latest = fetch_latest(&config.feed_url)?;
    if fs::create_dir_all(&config.cache_dir).is_ok() {
        write_feed_cache(&path, &config.feed_url, &latest);
    }
    Ok(latest)
}

// ============================================================================
// Download
// ============================================================================

/// Copy `reader` into `dest`, reporting progress after every chunk
fn copy_with_progress(mut reader: impl Read, dest: &Path, total: Option<u64>, progress: Progress<'_>) -> Result<u64> {
    let mut file = fs::File::create(dest).map_err(|e| ScalerError::from_io(dest, "Failed to create", e))?;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut done = 0u64;

    let outcome = loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break Ok(done),
            Ok(n) => n,
            Err(e) => break Err(ScalerError::network(e)),
        };
        if let Err(e) = file.write_all(&buffer[..read]) {
            break Err(ScalerError::from_io(dest, "Failed to write", e));
        }
        done += read as u64;
        if !progress(done, total) {
            break Err(ScalerError::Cancelled);
        }
    };

    drop(file);
    if outcome.is_err() {
        let _ = fs::remove_file(dest);
    }
    outcome
}

/// Stream `url` to `dest`. On error or cancellation no partial file is left.
pub fn download(url: &str, dest: &Path, progress: Progress<'_>) -> Result<u64> {
    log_download(&format!("Downloading {}", url));
    let response = ureq::get(url)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(ScalerError::network)?;
    let total = response
        .header("Content-Length")
        .and_then(|v| v.parse::<u64>().ok());

    let bytes = copy_with_progress(response.into_reader(), dest, total, progress)?;
    log_download(&format!("Downloaded {} bytes to {}", bytes, dest.display()));
    Ok(bytes)
}

// ============================================================================
// Repository
// ============================================================================

/// Create a fresh folder for `version`. A taken name gets a timestamp
/// suffix, then a counter, so an existing release is never reused.
pub fn create_version_folder(repo_dir: &Path, version: &str) -> Result<PathBuf> {
    let safe: String = version
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .collect();
    let stamped = format!("{}_{}", safe, Utc::now().format("%Y%m%d%H%M%S"));

    let candidates = std::iter::once(safe.clone())
        .chain(std::iter::once(stamped.clone()))
        .chain((2..).map(|n| format!("{}_{}", stamped, n)));
    for name in candidates {
        let folder = repo_dir.join(name);
        match fs::create_dir(&folder) {
            Ok(()) => return Ok(folder),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(ScalerError::from_io(&folder, "Failed to create", e)),
        }
    }
    Err(ScalerError::config(format!("No free folder name for version {}", version)))
}

/// Unpack an already downloaded release archive into the repository
pub fn install_release_archive(release: &ReleaseInfo, archive: &Path, repo_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(repo_dir).map_err(|e| ScalerError::from_io(repo_dir, "Failed to create", e))?;
    // Created by this call, so it is safe to remove on failure
    let folder = create_version_folder(repo_dir, &release.version)?;

    if let Err(e) = extract_archive(archive, &folder) {
        let _ = fs::remove_dir_all(&folder);
        return Err(e);
    }

    let mut record = InstallationRecord::new(release.version.clone(), release.tag_name.clone());
    record.source_url = release.download_url.clone();
    record.source_folder = file_name_str(&folder).unwrap_or_default().to_string();
    record.kind = Some(ModKind::Upscaler);

    let written = record.write(&folder).and_then(|_| record.write(repo_dir));
    if let Err(e) = written {
        let _ = fs::remove_dir_all(&folder);
        return Err(ScalerError::config(format!("Failed to write release metadata: {}", e)));
    }

    log_info(&format!("Release {} unpacked into {}", release.tag_name, folder.display()));
    Ok(folder)
}

/// Download, unpack and register `release` in `repo_dir`
pub fn install_release(release: &ReleaseInfo, repo_dir: &Path, tmp_dir: &Path, progress: Progress<'_>) -> Result<PathBuf> {
    fs::create_dir_all(tmp_dir).map_err(|e| ScalerError::from_io(tmp_dir, "Failed to create", e))?;
    let archive = tmp_dir.join(&release.asset_name);

    download(&release.download_url, &archive, progress)?;
    let result = install_release_archive(release, &archive, repo_dir);
    let _ = fs::remove_file(&archive);
    result
}

/// Most recently modified repository folder that holds a valid upscaler release
pub fn latest_version_folder(repo_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(repo_dir).ok()?;
    entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| {
            let modified = e.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, e.path()))
        })
        .filter(|(_, path)| resolve_source(path, ModKind::Upscaler).is_ok())
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path)
}

// ============================================================================
// Game Updates
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GameUpdateReport {
    pub game_dir: PathBuf,
    pub version: String,
    pub files_updated: Vec<String>,
}

/// Refresh the core upscaler files of an installed game from the newest
/// repository folder. The user's INI is left alone.
pub fn update_game(repo_dir: &Path, game_dir: &Path) -> Result<GameUpdateReport> {
    if !is_installed(game_dir) {
        return Err(ScalerError::config(format!(
            "No upscaler installed in {}",
            game_dir.display()
        )));
    }
    let folder = latest_version_folder(repo_dir).ok_or_else(|| ScalerError::SourceResolution {
        root: repo_dir.to_path_buf(),
        reason: "no release folder in repository".to_string(),
    })?;
    let source = resolve_source(&folder, ModKind::Upscaler)?;

    let mut record = InstallationRecord::read(game_dir);
    let spoof = record.as_ref().and_then(|r| r.spoof()).unwrap_or_else(|| detect_spoof(game_dir));

    let mut journal = Journal::new();
    let mut files_updated = Vec::new();
    let staged = stage_update(&source.dir, game_dir, spoof, &mut journal, &mut files_updated);

    if let Err(e) = staged {
        log_error(&format!("Update of {} failed: {}", game_dir.display(), e));
        journal.rollback();
        return Err(e);
    }
    journal.commit();

    let repo_record = InstallationRecord::read(&folder).or_else(|| InstallationRecord::read(repo_dir));
    let version = repo_record.as_ref().map(|r| r.version.clone()).unwrap_or_default();
    let updated = match (record.take(), repo_record) {
        (Some(mut existing), Some(repo)) => {
            existing.version = repo.version;
            existing.tag = repo.tag;
            existing.source_url = repo.source_url;
            existing.source_folder = source.dir.display().to_string();
            existing.installed_at = Utc::now();
            Some(existing)
        }
        (None, Some(repo)) => {
            let mut fresh = InstallationRecord::new(repo.version, repo.tag);
            fresh.source_url = repo.source_url;
            fresh.source_folder = source.dir.display().to_string();
            fresh.kind = Some(ModKind::Upscaler);
            fresh.spoof_name = Some(spoof.file_name().to_string());
            Some(fresh)
        }
        (existing, None) => existing,
    };
    if let Some(updated) = updated {
        if let Err(e) = updated.write(game_dir) {
            log_warning(&format!("Installation record not updated: {}", e));
        }
    }

    log_info(&format!(
        "Updated {} files in {} to {}",
        files_updated.len(),
        game_dir.display(),
        version
    ));
    Ok(GameUpdateReport {
        game_dir: game_dir.to_path_buf(),
        version,
        files_updated,
    })
}

/// Core files and runtime directories, payload under the game's spoof name
fn stage_update(
    source_dir: &Path,
    game_dir: &Path,
    spoof: SpoofName,
    journal: &mut Journal,
    files_updated: &mut Vec<String>,
) -> Result<()> {
    for name in ModKind::Upscaler.mod_files() {
        if name.eq_ignore_ascii_case(UPSCALER_CONFIG) {
            continue;
        }
        let Some(src) = find_child(source_dir, name) else {
            continue;
        };
        let dest_name = if Some(*name) == ModKind::Upscaler.payload() {
            spoof.file_name()
        } else {
            name
        };
        let dest = find_child(game_dir, dest_name).unwrap_or_else(|| game_dir.join(dest_name));
        journal.replace_file(&src, &dest, false)?;
        files_updated.push(dest_name.to_string());
    }
    for name in ModKind::Upscaler.mod_dirs() {
        let Some(src) = find_child(source_dir, name).filter(|p| p.is_dir()) else {
            continue;
        };
        let dest = find_child(game_dir, name).unwrap_or_else(|| game_dir.join(name));
        if let DirOutcome::Skipped(reason) = journal.replace_dir(&src, &dest)? {
            log_warning(&format!("Skipped {}: {}", name, reason));
        }
    }
    Ok(())
}

/// Spoof name in use when no record says so: the first spoof file present, else the default
fn detect_spoof(game_dir: &Path) -> SpoofName {
    SpoofName::ALL
        .into_iter()
        .find(|s| find_child(game_dir, s.file_name()).is_some())
        .unwrap_or_default()
}

// ============================================================================
// Full Update
// ============================================================================

#[derive(Debug)]
pub enum FullUpdateOutcome {
    NoRemoteRelease,
    AlreadyLatest { version: String },
    Updated {
        version: String,
        folder: PathBuf,
        games: Vec<(PathBuf, Result<GameUpdateReport>)>,
    },
}

/// Compare `release` against the repository, install it if newer, then update every game
pub fn apply_release(
    release: Option<ReleaseInfo>,
    repo_dir: &Path,
    game_dirs: &[PathBuf],
    install: impl FnOnce(&ReleaseInfo) -> Result<PathBuf>,
) -> Result<FullUpdateOutcome> {
    let Some(release) = release else {
        return Ok(FullUpdateOutcome::NoRemoteRelease);
    };

    if let Some(local) = InstallationRecord::read(repo_dir) {
        if !local.version.is_empty() && !is_newer_version(&release.version, &local.version) {
            log_info(&format!("Repository already at {}", local.version));
            return Ok(FullUpdateOutcome::AlreadyLatest { version: local.version });
        }
    }

    let folder = install(&release)?;
    let games = game_dirs
        .iter()
        .map(|dir| (dir.clone(), update_game(repo_dir, dir)))
        .collect();

    Ok(FullUpdateOutcome::Updated {
        version: release.version,
        folder,
        games,
    })
}

/// fetch -> compare -> install_release -> update_game for each game
pub fn perform_full_update(
    repo_dir: &Path,
    tmp_dir: &Path,
    game_dirs: &[PathBuf],
    feed_url: &str,
    progress: Progress<'_>,
) -> Result<FullUpdateOutcome> {
    let release = fetch_latest(feed_url)?;
    apply_release(release, repo_dir, game_dirs, |r| install_release(r, repo_dir, tmp_dir, progress))
}
