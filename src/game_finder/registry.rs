//! Registry-derived launcher locations
//!
//! On Windows the Steam and Epic install paths come from the real registry.
//! Elsewhere the same keys are read out of the `system.reg` files of the
//! configured Wine prefixes.

use std::fs;
use std::path::{Path, PathBuf};

use super::epic::epic_manifest_roots;
use super::steam::steam_roots_from_install;
use super::ScanRoot;
use crate::error::Result;
use crate::logging::log_info;

const STEAM_KEY: &str = r"Software\Valve\Steam";
const STEAM_VALUE: &str = "InstallPath";
const EPIC_KEY: &str = r"Software\Epic Games\EpicGamesLauncher";
const EPIC_VALUE: &str = "AppDataPath";

/// Launcher roots found through registry keys
pub fn registry_roots(wine_prefixes: &[PathBuf]) -> Result<Vec<ScanRoot>> {
    let mut roots = windows_registry_roots()?;

    for prefix in wine_prefixes {
        if !prefix.join("system.reg").exists() {
            log_info(&format!("No system.reg in Wine prefix {}", prefix.display()));
            continue;
        }
        roots.extend(wine_prefix_roots(prefix));
    }

    Ok(roots)
}

/// Launcher roots recorded in one Wine prefix
pub fn wine_prefix_roots(prefix: &Path) -> Vec<ScanRoot> {
    let mut roots = Vec::new();

    if let Some(steam) = read_registry_value(prefix, STEAM_KEY, STEAM_VALUE)
        .and_then(|p| wine_path_to_linux(prefix, &p))
    {
        roots.extend(steam_roots_from_install(&steam));
    }

    if let Some(app_data) = read_registry_value(prefix, EPIC_KEY, EPIC_VALUE)
        .and_then(|p| wine_path_to_linux(prefix, &p))
    {
        roots.extend(epic_manifest_roots(Some(&app_data.join("Manifests"))));
    }

    roots
}

#[cfg(windows)]
fn windows_registry_roots() -> Result<Vec<ScanRoot>> {
    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let mut roots = Vec::new();

    for key in [r"SOFTWARE\WOW6432Node\Valve\Steam", r"SOFTWARE\Valve\Steam"] {
        let Ok(steam) = hklm.open_subkey(key) else {
            continue;
        };
        let install: String = steam.get_value(STEAM_VALUE)?;
        roots.extend(steam_roots_from_install(Path::new(&install)));
        break;
    }

    for key in [
        r"SOFTWARE\WOW6432Node\Epic Games\EpicGamesLauncher",
        r"SOFTWARE\Epic Games\EpicGamesLauncher",
    ] {
        let Ok(epic) = hklm.open_subkey(key) else {
            continue;
        };
        let app_data: String = epic.get_value(EPIC_VALUE)?;
        roots.extend(epic_manifest_roots(Some(&Path::new(&app_data).join("Manifests"))));
        break;
    }

    Ok(roots)
}

#[cfg(not(windows))]
fn windows_registry_roots() -> Result<Vec<ScanRoot>> {
    Ok(Vec::new())
}

// ============================================================================
// Wine .reg Parsing
// ============================================================================

/// Read a value from a prefix's `system.reg`, then `user.reg`
pub fn read_registry_value(prefix_path: &Path, key_path: &str, value_name: &str) -> Option<String> {
    ["system.reg", "user.reg"]
        .iter()
        .find_map(|file| read_value_from_reg_file(&prefix_path.join(file), key_path, value_name))
}

fn read_value_from_reg_file(reg_file: &Path, key_path: &str, value_name: &str) -> Option<String> {
    let content = fs::read_to_string(reg_file).ok()?;

    // Wine writes keys with doubled backslashes; 32-bit apps land under Wow6432Node
    let escaped = |k: &str| format!("[{}]", k.to_lowercase().replace('\\', "\\\\"));
    let relative = key_path.strip_prefix(r"Software\").unwrap_or(key_path);
    let candidates = [
        escaped(key_path),
        escaped(&format!(r"Software\Wow6432Node\{}", relative)),
    ];

    candidates
        .iter()
        .find_map(|key| find_value_in_content(&content, key, value_name))
}

fn find_value_in_content(content: &str, key: &str, value_name: &str) -> Option<String> {
    let mut in_target_key = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') {
            // Section headers carry a trailing timestamp: [key] 1700000000
            let header = trimmed.split(']').next().map(|h| format!("{}]", h));
            in_target_key = header.is_some_and(|h| h.eq_ignore_ascii_case(key));
            continue;
        }
        if !in_target_key || trimmed.is_empty() {
            continue;
        }
        if let Some((name, value)) = parse_reg_value_line(trimmed) {
            if name.eq_ignore_ascii_case(value_name) {
                return Some(value);
            }
        }
    }

    None
}

/// `"Name"="value"`, `"Name"=dword:0000000a` or `@="default"`
fn parse_reg_value_line(line: &str) -> Option<(String, String)> {
    let (name_part, value_part) = if let Some(rest) = line.strip_prefix('"') {
        let end = rest.find("\"=")?;
        (&rest[..end], &rest[end + 2..])
    } else {
        line.split_once('=')?
    };

    let value = if value_part.starts_with('"') {
        parse_quoted_reg_value(value_part)?
    } else if let Some(hex) = value_part.strip_prefix("dword:") {
        u32::from_str_radix(hex.trim(), 16).ok()?.to_string()
    } else {
        value_part.to_string()
    };

    Some((name_part.trim().to_string(), value))
}

fn parse_quoted_reg_value(s: &str) -> Option<String> {
    let mut chars = s.trim().strip_prefix('"')?.chars();
    let mut result = String::new();

    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(result),
            '\\' => match chars.next()? {
                'n' => result.push('\n'),
                't' => result.push('\t'),
                other => result.push(other),
            },
            other => result.push(other),
        }
    }

    Some(result)
}

/// Map a Windows path seen inside `prefix` to a host path
pub fn wine_path_to_linux(prefix: &Path, wine_path: &str) -> Option<PathBuf> {
    let path = wine_path.trim();
    let mut chars = path.chars();
    let drive = chars.next()?.to_ascii_lowercase();
    if chars.next()? != ':' || !drive.is_ascii_alphabetic() {
        return None;
    }
    let rest = path[2..].trim_start_matches('\\').replace('\\', "/");

    let base = match drive {
        'z' => PathBuf::from("/"),
        'c' => prefix.join("drive_c"),
        other => prefix.join("dosdevices").join(format!("{}:", other)),
    };
    Some(if rest.is_empty() { base } else { base.join(rest) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reg_value_line() {
        let (name, value) =
            parse_reg_value_line(r#""InstallPath"="C:\\Program Files (x86)\\Steam""#).unwrap();
        assert_eq!(name, "InstallPath");
        assert_eq!(value, r"C:\Program Files (x86)\Steam");

        let (_, value) = parse_reg_value_line(r#""Flags"=dword:0000000a"#).unwrap();
        assert_eq!(value, "10");
    }

    #[test]
    fn test_wine_path_to_linux() {
        let prefix = Path::new("/home/u/.wine");
        assert_eq!(
            wine_path_to_linux(prefix, r"Z:\mnt\games").unwrap(),
            PathBuf::from("/mnt/games")
        );
        assert_eq!(
            wine_path_to_linux(prefix, r"C:\Program Files (x86)\Steam").unwrap(),
            PathBuf::from("/home/u/.wine/drive_c/Program Files (x86)/Steam")
        );
        assert!(wine_path_to_linux(prefix, "relative").is_none());
    }

    #[test]
    fn steam_from_wine_prefix() {
        let prefix = tempfile::tempdir().unwrap();
        let steam = prefix.path().join("drive_c/Program Files (x86)/Steam");
        fs::create_dir_all(steam.join("steamapps/common")).unwrap();
        fs::write(
            prefix.path().join("system.reg"),
            "WINE REGISTRY Version 2\n\n[Software\\\\Wow6432Node\\\\Valve\\\\Steam] 1700000000\n#time=1d9\n\"InstallPath\"=\"C:\\\\Program Files (x86)\\\\Steam\"\n",
        )
        .unwrap();

        let roots = wine_prefix_roots(prefix.path());
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].path, steam.join("steamapps/common"));
    }
}
