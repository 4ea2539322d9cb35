//! Session token storage: access/refresh tokens under fixed keys.
//!
//! Tokens are opaque strings; nothing here inspects them.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use crate::error::{ClientError, Result};

/// Which of the two session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Short-lived bearer credential.
    Access,
    /// Longer-lived credential used to mint access tokens.
    Refresh,
}

impl TokenKind {
    /// Fixed storage key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Access => "accessToken",
            Self::Refresh => "refreshToken",
        }
    }
}

/// Access token plus an optional (rotated) refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// New access token.
    pub access_token: String,
    /// New refresh token, when the backend rotates it.
    pub refresh_token: Option<String>,
}

/// Key-value store owning the session tokens.
pub trait TokenStore: Send + Sync {
    /// Stored token, or `None`.
    ///
    /// # Errors
    /// Returns [`ClientError::TokenStore`] if the backing storage cannot be read.
    fn get(&self, kind: TokenKind) -> Result<Option<String>>;

    /// Overwrite one token.
    ///
    /// # Errors
    /// Returns [`ClientError::TokenStore`] if the backing storage cannot be written.
    fn set(&self, kind: TokenKind, value: &str) -> Result<()>;

    /// Remove both tokens.
    ///
    /// # Errors
    /// Returns [`ClientError::TokenStore`] if the backing storage cannot be written.
    fn clear(&self) -> Result<()>;

    /// Store a fresh pair; the refresh token is only overwritten when present.
    ///
    /// # Errors
    /// Propagates [`TokenStore::set`] failures.
    fn store_pair(&self, pair: &TokenPair) -> Result<()> {
        self.set(TokenKind::Access, &pair.access_token)?;
        if let Some(refresh) = pair.refresh_token.as_deref() {
            self.set(TokenKind::Refresh, refresh)?;
        }
        Ok(())
    }
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<HashMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with both tokens.
    #[must_use]
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        {
            let mut map = store.inner.write().unwrap_or_else(PoisonError::into_inner);
            map.insert(TokenKind::Access, access.to_string());
            map.insert(TokenKind::Refresh, refresh.to_string());
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, kind: TokenKind) -> Result<Option<String>> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(&kind).cloned())
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<()> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(kind, value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.clear();
        Ok(())
    }
}

/// Token store persisted as a small JSON object file, surviving restarts.
///
/// Other keys present in the file are preserved.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Store backed by `path`; the file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(error) => {
                return Err(ClientError::TokenStore(format!(
                    "read {}: {error}",
                    self.path.display()
                )));
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|error| {
            ClientError::TokenStore(format!("parse {}: {error}", self.path.display()))
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(map).map_err(ClientError::Encode)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|error| {
            ClientError::TokenStore(format!("create {}: {error}", dir.display()))
        })?;
        // Write beside the target and rename over it so readers never see a partial file.
        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|error| {
            ClientError::TokenStore(format!("stage in {}: {error}", dir.display()))
        })?;
        restrict_to_owner(staged.as_file()).map_err(|error| {
            ClientError::TokenStore(format!("chmod {}: {error}", staged.path().display()))
        })?;
        staged
            .write_all(&encoded)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|error| {
                ClientError::TokenStore(format!("write {}: {error}", staged.path().display()))
            })?;
        staged.persist(&self.path).map_err(|error| {
            ClientError::TokenStore(format!("replace {}: {}", self.path.display(), error.error))
        })?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        apply(&mut map);
        self.write_map(&map)
    }
}

#[cfg(unix)]
fn restrict_to_owner(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn get(&self, kind: TokenKind) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(kind.key()))
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(kind.key().to_string(), value.to_string());
        })
    }

    fn clear(&self) -> Result<()> {
        self.update(|map| {
            map.remove(TokenKind::Access.key());
            map.remove(TokenKind::Refresh.key());
        })
    }
}
