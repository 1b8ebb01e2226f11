//! Credential file I/O.
//!
//! Reads and writes a versioned `credentials.json` with secure file
//! permissions (0o600). [`FileTokenStore`] reads through to the file on every
//! lookup so a token rotated by another process is picked up immediately.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::CredentialError;
use crate::store::TokenStore;

/// Default credential file name.
const CREDENTIAL_FILE_NAME: &str = "credentials.json";

/// Supported credential file format version.
const CREDENTIAL_FILE_VERSION: u32 = 1;

/// On-disk credential format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialFile {
    /// Format version; readers reject anything they don't know.
    pub version: u32,
    /// The bearer token, absent when logged out.
    pub token: Option<String>,
    /// RFC 3339 timestamp of the last write.
    pub last_updated: String,
}

impl CredentialFile {
    /// A version-1 file holding the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            version: CREDENTIAL_FILE_VERSION,
            token: Some(token.into()),
            last_updated: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Get the credential file path under the given data directory.
pub fn credential_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CREDENTIAL_FILE_NAME)
}

/// Load the credential file.
///
/// Returns `None` if the file doesn't exist, is invalid, or has an
/// unsupported version.
pub fn load_credential_file(path: &Path) -> Option<CredentialFile> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("failed to read credential file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<CredentialFile>(&data) {
        Ok(file) if file.version == CREDENTIAL_FILE_VERSION => Some(file),
        Ok(file) => {
            tracing::warn!("unsupported credential file version: {}", file.version);
            None
        }
        Err(e) => {
            tracing::warn!("failed to parse credential file: {e}");
            None
        }
    }
}

/// Save the credential file.
///
/// Creates parent directories if needed. Sets file permissions to 0o600.
pub fn save_credential_file(path: &Path, file: &mut CredentialFile) -> Result<(), CredentialError> {
    file.last_updated = chrono::Utc::now().to_rfc3339();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(file)?;
    std::fs::write(path, &json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }

    Ok(())
}

/// Delete the credential file. No-op when it doesn't exist.
pub fn clear_credential_file(path: &Path) -> Result<(), CredentialError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CredentialError::Io(e)),
    }
}

/// Token store backed by the credential file, read fresh on every lookup.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store over the given credential file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this store reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        load_credential_file(&self.path)?.token
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
