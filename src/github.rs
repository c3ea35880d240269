//! Release feed types
//!
//! The feed is a GitHub-style JSON list of releases, newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::version::normalize_version;

/// Archive suffixes the updater can unpack
pub const ARCHIVE_SUFFIXES: &[&str] = &[".zip", ".7z", ".tar.gz", ".tgz"];

/// GitHub release metadata
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GithubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

/// GitHub release asset
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Immutable snapshot of the release the updater acts on
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReleaseInfo {
    pub version: String,
    pub tag_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub body: String,
    pub html_url: String,
    pub download_url: String,
    pub asset_name: String,
    pub size: u64,
}

pub fn is_archive_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ARCHIVE_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

impl GithubRelease {
    /// First asset with a supported archive suffix
    pub fn archive_asset(&self) -> Option<&GithubAsset> {
        self.assets.iter().find(|a| is_archive_name(&a.name))
    }

    /// `None` if the release carries no usable archive
    pub fn to_release_info(&self) -> Option<ReleaseInfo> {
        let asset = self.archive_asset()?;
        Some(ReleaseInfo {
            version: normalize_version(&self.tag_name).to_string(),
            tag_name: self.tag_name.clone(),
            published_at: self.published_at,
            body: self.body.clone().unwrap_or_default(),
            html_url: self.html_url.clone(),
            download_url: asset.browser_download_url.clone(),
            asset_name: asset.name.clone(),
            size: asset.size,
        })
    }
}

/// Newest release of a feed as a `ReleaseInfo`
pub fn latest_release(feed: &[GithubRelease]) -> Option<ReleaseInfo> {
    feed.first()?.to_release_info()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"[
        {
            "tag_name": "v0.7.7",
            "published_at": "2025-03-01T12:00:00Z",
            "body": "notes",
            "html_url": "https://example.invalid/releases/v0.7.7",
            "assets": [
                { "name": "checksums.txt", "browser_download_url": "https://example.invalid/c.txt", "size": 10 },
                { "name": "OptiScaler_0.7.7.7z", "browser_download_url": "https://example.invalid/o.7z", "size": 2048 }
            ]
        },
        {
            "tag_name": "v0.7.6",
            "assets": [
                { "name": "OptiScaler_0.7.6.zip", "browser_download_url": "https://example.invalid/o.zip" }
            ]
        }
    ]"#;

    #[test]
    fn picks_first_archive_of_newest_release() {
        let feed: Vec<GithubRelease> = serde_json::from_str(FEED).unwrap();
        let info = latest_release(&feed).unwrap();
        assert_eq!(info.version, "0.7.7");
        assert_eq!(info.asset_name, "OptiScaler_0.7.7.7z");
        assert_eq!(info.size, 2048);
        assert_eq!(info.body, "notes");
        assert!(info.published_at.is_some());
    }

    #[test]
    fn release_without_archive_is_ignored() {
        let feed: Vec<GithubRelease> = serde_json::from_str(
            r#"[{ "tag_name": "v1", "assets": [{ "name": "a.exe", "browser_download_url": "x" }] }]"#,
        )
        .unwrap();
        assert!(latest_release(&feed).is_none());
        assert!(latest_release(&[]).is_none());
        assert!(is_archive_name("Mod.TAR.GZ"));
    }
}
