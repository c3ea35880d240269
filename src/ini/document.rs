//! Line-preserving INI document
//!
//! Every line of the original file is kept as-is; only lines whose value is
//! changed through `set` are rewritten. Sections and keys are matched without
//! regard to ASCII case. Files that are not valid UTF-8 are read byte-per-char
//! and written back with the same bytes.

use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
enum Line {
    /// Comments, blank lines and anything that does not parse
    Raw(String),
    Section { raw: String, name: String },
    Entry { key: String, value: String, raw: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Encoding {
    #[default]
    Utf8,
    /// Each byte maps to the char of the same value
    Latin1,
}

#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    lines: Vec<Line>,
    crlf: bool,
    trailing_newline: bool,
    encoding: Encoding,
}

impl IniDocument {
    pub fn parse(content: &str) -> Self {
        let crlf = content.contains("\r\n");
        let trailing_newline = content.ends_with('\n');
        let lines = content
            .lines()
            .map(|line| parse_line(line.strip_suffix('\r').unwrap_or(line)))
            .collect();

        Self {
            lines,
            crlf,
            trailing_newline,
            encoding: Encoding::Utf8,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::parse(text),
            Err(_) => {
                let text: String = bytes.iter().map(|&b| char::from(b)).collect();
                Self {
                    encoding: Encoding::Latin1,
                    ..Self::parse(&text)
                }
            }
        }
    }

    /// Rendered document in the encoding it was read with
    pub fn to_bytes(&self) -> Vec<u8> {
        let text = self.render();
        match self.encoding {
            Encoding::Utf8 => text.into_bytes(),
            Encoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }

    /// Read a file; a missing file is an empty document
    pub fn load(path: &Path) -> std::io::Result<Self> {
        match fs::read(path) {
            Ok(bytes) => Ok(Self::from_bytes(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        fs::write(path, self.to_bytes())
    }

    /// Value of `key` in `section`, trimmed
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let mut current: Option<&str> = None;
        for line in &self.lines {
            match line {
                Line::Section { name, .. } => current = Some(name),
                Line::Entry { key: k, value, .. } => {
                    if current.is_some_and(|s| s.eq_ignore_ascii_case(section))
                        && k.eq_ignore_ascii_case(key)
                    {
                        return Some(value);
                    }
                }
                Line::Raw(_) => {}
            }
        }
        None
    }

    /// Set `key` in `section`. Returns true if the document changed.
    ///
    /// Existing entries keep their spacing and position; missing keys are
    /// appended after the last entry of the section, missing sections at the end.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> bool {
        let mut current: Option<String> = None;
        let mut last_in_section: Option<usize> = None;

        for (idx, line) in self.lines.iter_mut().enumerate() {
            match line {
                Line::Section { name, .. } => current = Some(name.clone()),
                Line::Entry { key: k, value: v, raw } => {
                    let in_section = current
                        .as_deref()
                        .is_some_and(|s| s.eq_ignore_ascii_case(section));
                    if !in_section {
                        continue;
                    }
                    last_in_section = Some(idx);
                    if k.eq_ignore_ascii_case(key) {
                        if v == value {
                            return false;
                        }
                        *raw = replace_value(raw, value);
                        *v = value.to_string();
                        return true;
                    }
                }
                Line::Raw(_) => {}
            }
        }

        let entry = Line::Entry {
            key: key.to_string(),
            value: value.to_string(),
            raw: format!("{}={}", key, value),
        };

        if let Some(idx) = last_in_section {
            self.lines.insert(idx + 1, entry);
            return true;
        }

        if let Some(idx) = self.section_header_index(section) {
            self.lines.insert(idx + 1, entry);
            return true;
        }

        if !self.lines.is_empty()
            && !matches!(self.lines.last(), Some(Line::Raw(r)) if r.trim().is_empty())
        {
            self.lines.push(Line::Raw(String::new()));
        }
        self.lines.push(Line::Section {
            raw: format!("[{}]", section),
            name: section.to_string(),
        });
        self.lines.push(entry);
        true
    }

    fn section_header_index(&self, section: &str) -> Option<usize> {
        self.lines.iter().position(
            |l| matches!(l, Line::Section { name, .. } if name.eq_ignore_ascii_case(section)),
        )
    }

    pub fn render(&self) -> String {
        let eol = if self.crlf { "\r\n" } else { "\n" };
        let mut out = String::new();
        for (idx, line) in self.lines.iter().enumerate() {
            let text = match line {
                Line::Raw(raw) | Line::Section { raw, .. } | Line::Entry { raw, .. } => raw,
            };
            out.push_str(text);
            if idx + 1 < self.lines.len() || self.trailing_newline {
                out.push_str(eol);
            }
        }
        out
    }
}

fn parse_line(line: &str) -> Line {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
        return Line::Raw(line.to_string());
    }
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        return Line::Section {
            raw: line.to_string(),
            name: trimmed[1..trimmed.len() - 1].trim().to_string(),
        };
    }
    if let Some((key, value)) = trimmed.split_once('=') {
        return Line::Entry {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
            raw: line.to_string(),
        };
    }
    Line::Raw(line.to_string())
}

/// Swap the value part of `key = value` keeping the key and the spacing around '='
fn replace_value(raw: &str, value: &str) -> String {
    let Some(eq) = raw.find('=') else {
        return raw.to_string();
    };
    let after = &raw[eq + 1..];
    let leading_ws = after.len() - after.trim_start().len();
    format!("{}{}", &raw[..eq + 1 + leading_ws], value)
}
