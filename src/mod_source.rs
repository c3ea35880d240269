//! Mod families and mod source resolution
//!
//! A mod source is any folder tree that contains a mod's distribution files,
//! e.g. a freshly extracted release archive with an extra top-level folder.
//! Resolution walks the tree and returns the directory that actually holds
//! the required files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Result, ScalerError};
use crate::logging::log_info;

// ============================================================================
// Mod Families
// ============================================================================

/// The two independently distributed mods ScalerKit manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModKind {
    /// OptiScaler: upscaler hook loaded through a spoofed system DLL
    Upscaler,
    /// fakenvapi + dlssg-to-fsr3: frame generation for non-NVIDIA GPUs
    FrameGen,
}

/// Upscaler payload that gets renamed to a spoof filename
pub const UPSCALER_PAYLOAD: &str = "OptiScaler.dll";
/// Upscaler configuration file
pub const UPSCALER_CONFIG: &str = "OptiScaler.ini";
/// Runtime directory the upscaler needs to load its DX12 backends
pub const UPSCALER_RUNTIME_DIR: &str = "D3D12_Optiscaler";

const UPSCALER_FILES: &[&str] = &[
    UPSCALER_PAYLOAD,
    UPSCALER_CONFIG,
    "libxess.dll",
    "libxess_dx11.dll",
    "libxess_fg.dll",
    "libxell.dll",
    "amd_fidelityfx_dx12.dll",
    "amd_fidelityfx_vk.dll",
    "amd_fidelityfx_upscaler_dx12.dll",
    "amd_fidelityfx_framegeneration_dx12.dll",
];

const UPSCALER_DIRS: &[&str] = &[UPSCALER_RUNTIME_DIR, "DlssOverrides"];

const FRAMEGEN_FILES: &[&str] = &[
    "nvapi64.dll",
    "fakenvapi.ini",
    "dlssg_to_fsr3_amd_is_better.dll",
];

const UPSCALER_LOGS: &[&str] = &["OptiScaler.log"];
const FRAMEGEN_LOGS: &[&str] = &["fakenvapi.log", "dlssg_to_fsr3.log"];

impl ModKind {
    pub const ALL: [ModKind; 2] = [ModKind::Upscaler, ModKind::FrameGen];

    pub fn display_name(&self) -> &'static str {
        match self {
            ModKind::Upscaler => "OptiScaler",
            ModKind::FrameGen => "fakenvapi / dlssg-to-fsr3",
        }
    }

    /// Files that must all sit in one directory for a source to be valid
    pub fn required_files(&self) -> &'static [&'static str] {
        match self {
            ModKind::Upscaler => &[UPSCALER_PAYLOAD, UPSCALER_CONFIG],
            ModKind::FrameGen => &["nvapi64.dll", "fakenvapi.ini"],
        }
    }

    /// Every file the family may place into a game folder (before spoof rename)
    pub fn mod_files(&self) -> &'static [&'static str] {
        match self {
            ModKind::Upscaler => UPSCALER_FILES,
            ModKind::FrameGen => FRAMEGEN_FILES,
        }
    }

    /// Directories the family replaces wholesale
    pub fn mod_dirs(&self) -> &'static [&'static str] {
        match self {
            ModKind::Upscaler => UPSCALER_DIRS,
            ModKind::FrameGen => &[],
        }
    }

    /// Files whose presence alone proves the family is installed
    pub fn markers(&self) -> &'static [&'static str] {
        match self {
            ModKind::Upscaler => &[UPSCALER_CONFIG, UPSCALER_PAYLOAD, "OptiScaler.asi"],
            ModKind::FrameGen => &["fakenvapi.ini", "dlssg_to_fsr3_amd_is_better.dll"],
        }
    }

    pub fn log_files(&self) -> &'static [&'static str] {
        match self {
            ModKind::Upscaler => UPSCALER_LOGS,
            ModKind::FrameGen => FRAMEGEN_LOGS,
        }
    }

    /// The file renamed to a spoof filename after copying, if any
    pub fn payload(&self) -> Option<&'static str> {
        match self {
            ModKind::Upscaler => Some(UPSCALER_PAYLOAD),
            ModKind::FrameGen => None,
        }
    }

    /// True if any marker of this family exists in `dir`
    pub fn is_present_in(&self, dir: &Path) -> bool {
        self.markers()
            .iter()
            .any(|m| crate::utils::find_child(dir, m).is_some())
    }
}

// ============================================================================
// Spoof Filenames
// ============================================================================

/// System library names the upscaler payload can masquerade as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpoofName {
    #[default]
    Dxgi,
    Winmm,
    Version,
    Dbghelp,
    D3d12,
    Wininet,
    Winhttp,
    Asi,
}

impl SpoofName {
    pub const ALL: [SpoofName; 8] = [
        SpoofName::Dxgi,
        SpoofName::Winmm,
        SpoofName::Version,
        SpoofName::Dbghelp,
        SpoofName::D3d12,
        SpoofName::Wininet,
        SpoofName::Winhttp,
        SpoofName::Asi,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            SpoofName::Dxgi => "dxgi.dll",
            SpoofName::Winmm => "winmm.dll",
            SpoofName::Version => "version.dll",
            SpoofName::Dbghelp => "dbghelp.dll",
            SpoofName::D3d12 => "d3d12.dll",
            SpoofName::Wininet => "wininet.dll",
            SpoofName::Winhttp => "winhttp.dll",
            SpoofName::Asi => "OptiScaler.asi",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.file_name().eq_ignore_ascii_case(name))
    }

    /// Accepts `dxgi`, `dxgi.dll`, `DXGI.DLL`, ...
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::from_file_name(value).or_else(|| {
            Self::ALL.into_iter().find(|s| {
                s.file_name()
                    .rsplit_once('.')
                    .is_some_and(|(stem, _)| stem.eq_ignore_ascii_case(value))
            })
        })
    }
}

/// True if `name` is one of the spoof filenames
pub fn is_spoof_name(name: &str) -> bool {
    SpoofName::from_file_name(name).is_some()
}

// ============================================================================
// Source Resolution
// ============================================================================

/// A candidate mod distribution folder
#[derive(Debug, Clone)]
pub struct ModSourceDescriptor {
    pub root_path: PathBuf,
    pub kind: ModKind,
    pub required_files: Vec<String>,
}

/// A validated mod source: `dir` holds every required file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub kind: ModKind,
    pub root: PathBuf,
    pub dir: PathBuf,
}

impl ModSourceDescriptor {
    pub fn new(root_path: impl Into<PathBuf>, kind: ModKind) -> Self {
        Self {
            root_path: root_path.into(),
            kind,
            required_files: kind.required_files().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Find the first directory (deepest first, name order) whose immediate
    /// listing contains every required file.
    pub fn resolve(&self) -> Result<ResolvedSource> {
        if !self.root_path.is_dir() {
            return Err(ScalerError::SourceResolution {
                root: self.root_path.clone(),
                reason: "not a directory".to_string(),
            });
        }

        let walker = WalkDir::new(&self.root_path)
            .contents_first(true)
            .sort_by_file_name();

        for entry in walker.into_iter().flatten() {
            if !entry.file_type().is_dir() {
                continue;
            }
            if self.dir_qualifies(entry.path()) {
                log_info(&format!(
                    "Resolved {} source: {}",
                    self.kind.display_name(),
                    entry.path().display()
                ));
                return Ok(ResolvedSource {
                    kind: self.kind,
                    root: self.root_path.clone(),
                    dir: entry.path().to_path_buf(),
                });
            }
        }

        Err(ScalerError::SourceResolution {
            root: self.root_path.clone(),
            reason: format!("no folder contains all of: {}", self.required_files.join(", ")),
        })
    }

    fn dir_qualifies(&self, dir: &Path) -> bool {
        let Ok(entries) = fs::read_dir(dir) else {
            return false;
        };
        let names: Vec<String> = entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(str::to_lowercase))
            .collect();

        self.required_files
            .iter()
            .all(|req| names.contains(&req.to_lowercase()))
    }
}

/// Resolve `root` for `kind` in one call
pub fn resolve_source(root: &Path, kind: ModKind) -> Result<ResolvedSource> {
    ModSourceDescriptor::new(root, kind).resolve()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_nested_release_folder() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("OptiScaler_0.7.7/bin");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("OptiScaler.dll"), "dll").unwrap();
        fs::write(nested.join("optiscaler.ini"), "ini").unwrap();

        let resolved = resolve_source(dir.path(), ModKind::Upscaler).unwrap();
        assert_eq!(resolved.dir, nested);
        assert_eq!(resolved.root, dir.path());
    }

    #[test]
    fn deepest_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["", "deep/er"] {
            let d = dir.path().join(sub);
            fs::create_dir_all(&d).unwrap();
            fs::write(d.join("nvapi64.dll"), "x").unwrap();
            fs::write(d.join("fakenvapi.ini"), "x").unwrap();
        }
        let resolved = resolve_source(dir.path(), ModKind::FrameGen).unwrap();
        assert_eq!(resolved.dir, dir.path().join("deep/er"));
    }

    #[test]
    fn missing_file_is_a_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("OptiScaler.dll"), "dll").unwrap();
        let err = resolve_source(dir.path(), ModKind::Upscaler).unwrap_err();
        assert!(matches!(err, ScalerError::SourceResolution { .. }));

        let err = resolve_source(&dir.path().join("nope"), ModKind::Upscaler).unwrap_err();
        assert!(matches!(err, ScalerError::SourceResolution { .. }));
    }

    #[test]
    fn spoof_name_parsing() {
        assert_eq!(SpoofName::parse("dxgi"), Some(SpoofName::Dxgi));
        assert_eq!(SpoofName::parse("WINMM.DLL"), Some(SpoofName::Winmm));
        assert_eq!(SpoofName::parse("OptiScaler.asi"), Some(SpoofName::Asi));
        assert_eq!(SpoofName::parse("kernel32"), None);
        assert!(is_spoof_name("Version.dll"));
    }
}
