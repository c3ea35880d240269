//! Error taxonomy shared by every engine operation

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Remediation shown for access errors; almost always a running game holding the DLL open.
pub const ACCESS_HINT: &str = "the game may still be running - close it and try again";

/// Error type for all engine operations
#[derive(Debug)]
pub enum ScalerError {
    /// Bad configuration, unreadable metadata or invalid caller input
    Configuration { reason: String },
    /// A copy/rename failed in the middle of an install transaction
    Installation { path: PathBuf, reason: String },
    /// No usable mod distribution folder was found
    SourceResolution { root: PathBuf, reason: String },
    /// Release feed or download failure
    Network { reason: String },
    /// Archive could not be unpacked
    Extraction { archive: PathBuf, reason: String },
    /// Access denied on a target path
    PermissionDenied { path: PathBuf, hint: &'static str },
    /// Caller aborted through the progress callback
    Cancelled,
    /// Generic filesystem error with context
    Io { context: String, source: io::Error },
}

impl ScalerError {
    pub fn config(reason: impl Into<String>) -> Self {
        ScalerError::Configuration { reason: reason.into() }
    }

    pub fn network(reason: impl fmt::Display) -> Self {
        ScalerError::Network { reason: reason.to_string() }
    }

    /// Wrap an io error raised while touching `path`, keeping access errors distinguishable
    pub fn from_io(path: &Path, context: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            return ScalerError::PermissionDenied {
                path: path.to_path_buf(),
                hint: ACCESS_HINT,
            };
        }
        ScalerError::Io {
            context: format!("{} '{}'", context, path.display()),
            source: err,
        }
    }

    /// Like `from_io`, but reported as a mid-transaction installation failure
    pub fn install_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            return ScalerError::PermissionDenied {
                path: path.to_path_buf(),
                hint: ACCESS_HINT,
            };
        }
        ScalerError::Installation {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ScalerError::PermissionDenied { .. })
    }
}

impl fmt::Display for ScalerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalerError::Configuration { reason } => write!(f, "Configuration error: {}", reason),
            ScalerError::Installation { path, reason } => {
                write!(f, "Installation failed at '{}': {}", path.display(), reason)
            }
            ScalerError::SourceResolution { root, reason } => {
                write!(f, "No usable mod source under '{}': {}", root.display(), reason)
            }
            ScalerError::Network { reason } => write!(f, "Network error: {}", reason),
            ScalerError::Extraction { archive, reason } => {
                write!(f, "Failed to extract '{}': {}", archive.display(), reason)
            }
            ScalerError::PermissionDenied { path, hint } => {
                write!(f, "Access denied to '{}' ({})", path.display(), hint)
            }
            ScalerError::Cancelled => write!(f, "Operation cancelled"),
            ScalerError::Io { context, source } => write!(f, "{}: {}", context, source),
        }
    }
}

impl std::error::Error for ScalerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScalerError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for ScalerError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            return ScalerError::PermissionDenied {
                path: PathBuf::new(),
                hint: ACCESS_HINT,
            };
        }
        ScalerError::Io {
            context: "I/O error".to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for ScalerError {
    fn from(err: serde_json::Error) -> Self {
        ScalerError::Configuration { reason: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, ScalerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_distinguished() {
        let err = ScalerError::install_io(
            Path::new("/games/x/dxgi.dll"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(err.is_permission_denied());
        assert!(err.to_string().contains("still be running"));

        let err = ScalerError::install_io(
            Path::new("/games/x/dxgi.dll"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(matches!(err, ScalerError::Installation { .. }));
    }
}
