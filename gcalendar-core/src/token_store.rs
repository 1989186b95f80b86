//! File-backed storage for the credential record.
//!
//! The token file is looked up in this order:
//!   1. `GCALENDAR_MCP_TOKEN_PATH` (used verbatim)
//!   2. ~/.config/gcalendar-mcp/tokens.json, if it exists
//!   3. ./.tokens.json, if it exists
//!   4. ~/.config/gcalendar-mcp/tokens.json (created on first write)

use std::path::{Path, PathBuf};

use crate::credentials::CredentialRecord;
use crate::error::{GcalError, GcalResult};
use crate::settings::Settings;

/// File name used by the interactive setup in the working directory.
pub const PROJECT_TOKEN_FILE: &str = ".tokens.json";

/// Candidate locations for the token file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPaths {
    pub override_path: Option<PathBuf>,
    pub standard: PathBuf,
    pub project: PathBuf,
}

impl TokenPaths {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            override_path: settings.token_path().map(PathBuf::from),
            standard: standard_token_path(),
            project: project_token_path(),
        }
    }

    /// Resolve to a single path. Never fails; falls back to the standard path.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.override_path {
            return path.clone();
        }

        if self.standard.exists() {
            return self.standard.clone();
        }

        if self.project.exists() {
            return self.project.clone();
        }

        self.standard.clone()
    }
}

/// ~/.config/gcalendar-mcp/tokens.json
pub fn standard_token_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("gcalendar-mcp")
        .join("tokens.json")
}

/// ./.tokens.json in the current working directory.
pub fn project_token_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_default()
        .join(PROJECT_TOKEN_FILE)
}

/// Reads, writes and deletes the credential record.
///
/// The path is resolved on every call so a file written by this process
/// (e.g. after an OAuth callback) is picked up immediately.
#[derive(Debug, Clone)]
pub struct TokenStore {
    paths: TokenPaths,
}

impl TokenStore {
    pub fn new(paths: TokenPaths) -> Self {
        Self { paths }
    }

    /// A store pinned to one file, ignoring the lookup order.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(TokenPaths {
            override_path: Some(path.clone()),
            standard: path.clone(),
            project: path,
        })
    }

    pub fn resolve_path(&self) -> PathBuf {
        self.paths.resolve()
    }

    pub fn read(&self) -> GcalResult<CredentialRecord> {
        let path = self.resolve_path();
        read_record(&path)
    }

    pub fn write(&self, record: &CredentialRecord) -> GcalResult<PathBuf> {
        let path = self.resolve_path();
        write_record(&path, record)?;
        Ok(path)
    }

    /// Remove the token file. A missing file is not an error.
    pub fn delete(&self) -> GcalResult<()> {
        let path = self.resolve_path();

        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "deleted token file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(GcalError::Io { path, source }),
        }
    }
}

fn read_record(path: &Path) -> GcalResult<CredentialRecord> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GcalError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(GcalError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&contents).map_err(|source| GcalError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_record(path: &Path, record: &CredentialRecord) -> GcalResult<()> {
    let io_err = |source| GcalError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| GcalError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let contents = serde_json::to_string_pretty(record).map_err(|source| GcalError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::write(path, contents).map_err(io_err)?;

    // Owner-only, the file holds OAuth tokens
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(io_err)?;
    }

    Ok(())
}
