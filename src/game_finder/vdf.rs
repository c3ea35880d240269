//! Minimal VDF (Valve Data Format) reader
//!
//! Enough of the format for `libraryfolders.vdf` and `appmanifest_*.acf`:
//! quoted keys, quoted values, nested `{}` blocks and `//` comments.
//! Key lookup ignores ASCII case since Steam is inconsistent about it.

#[derive(Debug, Clone, PartialEq)]
pub enum VdfValue {
    String(String),
    Object(Vec<(String, VdfValue)>),
}

impl VdfValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VdfValue::String(s) => Some(s),
            VdfValue::Object(_) => None,
        }
    }

    pub fn entries(&self) -> &[(String, VdfValue)] {
        match self {
            VdfValue::Object(entries) => entries,
            VdfValue::String(_) => &[],
        }
    }

    pub fn get(&self, key: &str) -> Option<&VdfValue> {
        self.entries()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Str(String),
    Open,
    Close,
}

fn tokenize(content: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => tokens.push(Token::Open),
            '}' => tokens.push(Token::Close),
            '"' => {
                let mut s = String::new();
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            other => s.push(other),
                        },
                        other => s.push(other),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|c| *c != '\n').is_some() {}
            }
            _ => {}
        }
    }

    Some(tokens)
}

fn parse_block(tokens: &mut std::vec::IntoIter<Token>) -> Option<Vec<(String, VdfValue)>> {
    let mut entries = Vec::new();
    while let Some(token) = tokens.next() {
        match token {
            Token::Close => return Some(entries),
            Token::Open => return None,
            Token::Str(key) => match tokens.next()? {
                Token::Str(value) => entries.push((key, VdfValue::String(value))),
                Token::Open => entries.push((key, VdfValue::Object(parse_block(tokens)?))),
                Token::Close => return None,
            },
        }
    }
    Some(entries)
}

/// Parse VDF text into a root object
pub fn parse_vdf(content: &str) -> Option<VdfValue> {
    let mut tokens = tokenize(content)?.into_iter();
    parse_block(&mut tokens).map(VdfValue::Object)
}

/// The fields of an `appmanifest_*.acf` the scanner needs
#[derive(Debug, Clone)]
pub struct AppManifest {
    pub app_id: String,
    pub name: String,
    pub install_dir: String,
    pub state_flags: u32,
}

impl AppManifest {
    pub fn from_vdf(content: &str) -> Option<Self> {
        let root = parse_vdf(content)?;
        let state = root.get("AppState")?;

        Some(Self {
            app_id: state.get_str("appid")?.to_string(),
            name: state.get_str("name")?.to_string(),
            install_dir: state.get_str("installdir")?.to_string(),
            state_flags: state
                .get_str("StateFlags")
                .and_then(|f| f.parse().ok())
                .unwrap_or(0),
        })
    }

    /// Bit 2 (value 4) is "fully installed"; other bits mark pending updates
    pub fn is_installed(&self) -> bool {
        self.state_flags & 4 != 0
    }
}

/// Library paths listed in `libraryfolders.vdf` (old flat and new nested layouts)
pub fn parse_library_folders(content: &str) -> Vec<String> {
    let Some(root) = parse_vdf(content) else {
        return Vec::new();
    };
    let Some(folders) = root.get("libraryfolders") else {
        return Vec::new();
    };

    folders
        .entries()
        .iter()
        .filter(|(key, _)| key.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|(_, value)| match value {
            VdfValue::String(path) => Some(path.clone()),
            VdfValue::Object(_) => value.get_str("path").map(String::from),
        })
        .collect()
}
