use directories::BaseDirs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// Which half of the credential pair a store operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Durable storage for the access/refresh token pair.
///
/// An empty string reads back for any token that was never set or was
/// cleared; callers treat empty as "absent". The store is the only owner of
/// the pair — every outgoing request re-fetches from it rather than caching
/// a copy.
pub trait CredentialStore: Send + Sync {
    fn get(&self, kind: TokenKind) -> String;
    fn set(&self, kind: TokenKind, value: &str);
    fn clear(&self);
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default)]
    access: String,
    #[serde(default)]
    refresh: String,
}

impl StoredTokens {
    fn slot(&mut self, kind: TokenKind) -> &mut String {
        match kind {
            TokenKind::Access => &mut self.access,
            TokenKind::Refresh => &mut self.refresh,
        }
    }

    fn value(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

/// Credential store backed by a JSON file so the pair survives a restart.
///
/// Writes go through an in-memory cache and are flushed to disk under the
/// same lock, so a sequential caller never observes one token updated
/// without the other after `clear`.
pub struct FileCredentialStore {
    path: PathBuf,
    cache: RwLock<StoredTokens>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = RwLock::new(Self::read_from(&path));
        Self { path, cache }
    }

    /// Store at a throwaway location under the system temp directory.
    pub fn ephemeral() -> Self {
        let mut path = std::env::temp_dir();
        path.push(format!("abacus-{}.json", Uuid::new_v4()));
        Self::new(path)
    }

    /// Default on-disk location for the credential pair.
    pub fn default_path() -> PathBuf {
        if let Some(base) = BaseDirs::new() {
            base.config_dir().join("abacus").join("credentials.json")
        } else {
            PathBuf::from("abacus-credentials.json")
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_from(path: &Path) -> StoredTokens {
        let Ok(contents) = fs::read_to_string(path) else {
            return StoredTokens::default();
        };
        serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("path" = %path.display(), %err, "ignoring unreadable credential file");
            StoredTokens::default()
        })
    }

    fn persist(&self, tokens: &StoredTokens) {
        if let Err(err) = self.write_file(tokens) {
            warn!("path" = %self.path.display(), %err, "failed to persist credentials");
        }
    }

    fn write_file(&self, tokens: &StoredTokens) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_vec_pretty(tokens).map_err(std::io::Error::other)?;

        // Tokens are secrets; keep the file owner-only where the platform
        // supports it.
        #[cfg(unix)]
        {
            use std::fs::OpenOptions;
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)?;
            file.write_all(&contents)?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, &contents)?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, kind: TokenKind) -> String {
        self.cache.read().value(kind).to_string()
    }

    fn set(&self, kind: TokenKind, value: &str) {
        let mut cache = self.cache.write();
        *cache.slot(kind) = value.to_string();
        self.persist(&cache);
    }

    fn clear(&self) {
        let mut cache = self.cache.write();
        *cache = StoredTokens::default();
        self.persist(&cache);
    }
}

/// In-memory store for tests and smoke runs; holds no external resources.
#[derive(Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<HashMap<TokenKind, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, kind: TokenKind) -> String {
        self.tokens.read().get(&kind).cloned().unwrap_or_default()
    }

    fn set(&self, kind: TokenKind, value: &str) {
        self.tokens.write().insert(kind, value.to_string());
    }

    fn clear(&self) {
        self.tokens.write().clear();
    }
}
