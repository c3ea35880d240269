//! Executables that are never a game's main binary

/// Installers, crash reporters, anti-cheat bootstrappers, redistributables and launchers
const DEFAULT_PATTERNS: &[&str] = &[
    "unins*.exe",
    "*setup*.exe",
    "*installer*.exe",
    "*redist*.exe",
    "vcredist*.exe",
    "dotnet*.exe",
    "ue4prereq*.exe",
    "uerequire*.exe",
    "crashreportclient.exe",
    "*crashreport*.exe",
    "*crashhandler*.exe",
    "*crashpad*.exe",
    "easyanticheat*.exe",
    "start_protected_game.exe",
    "battleye*.exe",
    "beservice*.exe",
    "*launcher*.exe",
    "cefsharp*.exe",
    "*webhelper*.exe",
    "dxsetup.exe",
];

#[derive(Debug, Clone)]
pub struct ExecutableBlacklist {
    patterns: Vec<String>,
}

impl Default for ExecutableBlacklist {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ExecutableBlacklist {
    /// Default patterns plus caller-supplied names or `*` patterns
    pub fn with_extra<S: AsRef<str>>(extra: &[S]) -> Self {
        let mut list = Self::default();
        list.patterns
            .extend(extra.iter().map(|p| p.as_ref().trim().to_string()).filter(|p| !p.is_empty()));
        list
    }

    pub fn is_blacklisted(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|p| wildcard_match(p, file_name))
    }
}

/// Case-insensitive match where `*` stands for any run of characters
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = t;
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some(s) = star {
            p = s + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*-Win64-Shipping.exe", "Stalker2-Win64-Shipping.exe"));
        assert!(wildcard_match("unins*.exe", "unins000.exe"));
        assert!(!wildcard_match("unins*.exe", "game.exe"));
        assert!(wildcard_match("*", ""));
        assert!(!wildcard_match("a*b", "ab_"));
    }

    #[test]
    fn default_blacklist() {
        let list = ExecutableBlacklist::default();
        assert!(list.is_blacklisted("CrashReportClient.exe"));
        assert!(list.is_blacklisted("Launcher.exe"));
        assert!(list.is_blacklisted("VC_redist.x64.exe"));
        assert!(!list.is_blacklisted("Game.exe"));

        let list = ExecutableBlacklist::with_extra(&["Tool.exe"]);
        assert!(list.is_blacklisted("tool.exe"));
    }
}
