//! Persistence of the engine bearer token across process invocations.

use crate::error::{OvirtError, OvirtResult};
use crate::types::Token;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Default location of the persisted token.
pub const DEFAULT_TOKEN_PATH: &str = "/tmp/ovirt-flexdriver.token";

/// Storage for the session token.
///
/// A failed `load` is treated by the session as "no cached token".
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> OvirtResult<Option<Token>>;

    async fn save(&self, token: &Token) -> OvirtResult<()>;

    /// Forget the stored token. Clearing an empty store succeeds.
    async fn clear(&self) -> OvirtResult<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  File store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// JSON token file readable only by its owner.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_PATH)
    }
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> OvirtResult<Option<Token>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(OvirtError::io(format!(
                    "Cannot read token file {}: {e}",
                    self.path.display()
                )))
            }
        };
        let token = serde_json::from_slice(&raw).map_err(|e| {
            OvirtError::parse(format!("Corrupt token file {}: {e}", self.path.display()))
        })?;
        Ok(Some(token))
    }

    async fn save(&self, token: &Token) -> OvirtResult<()> {
        let body = serde_json::to_vec(token)?;
        let write_err = |e: std::io::Error| {
            OvirtError::io(format!("Cannot write token file {}: {e}", self.path.display()))
        };

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).await.map_err(write_err)?;

        // `mode` only applies on creation; narrow a pre-existing file before writing
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_err)?;
        }

        file.write_all(&body).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        Ok(())
    }

    async fn clear(&self) -> OvirtResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OvirtError::io(format!(
                "Cannot remove token file {}: {e}",
                self.path.display()
            ))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Memory store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-process store for tests and long-running hosts.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Token>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        Self { token: Mutex::new(Some(token)) }
    }

    pub async fn current(&self) -> Option<Token> {
        self.token.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> OvirtResult<Option<Token>> {
        Ok(self.token.lock().await.clone())
    }

    async fn save(&self, token: &Token) -> OvirtResult<()> {
        *self.token.lock().await = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> OvirtResult<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn token() -> Token {
        Token {
            value: "eyJhbGciOi".into(),
            expiry: Utc::now() + Duration::hours(1),
            token_type: "Bearer".into(),
        }
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("ovirt.token"));

        assert_eq!(store.load().await.unwrap(), None);
        let t = token();
        store.save(&t).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(t));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        // Clearing twice is fine
        store.clear().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("ovirt.token"));
        store.save(&token()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn world_readable_file_is_narrowed_on_save() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ovirt.token");
        std::fs::write(&path, b"{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileTokenStore::new(&path);
        let t = token();
        store.save(&t).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().await.unwrap(), Some(t));
    }

    #[tokio::test]
    async fn corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ovirt.token");
        std::fs::write(&path, b"not json").unwrap();

        let err = FileTokenStore::new(&path).load().await.unwrap_err();
        assert_eq!(err.kind, crate::error::OvirtErrorKind::ParseError);
    }

    #[tokio::test]
    async fn memory_store() {
        let store = MemoryTokenStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.save(&token()).await.unwrap();
        assert!(store.current().await.is_some());
        store.clear().await.unwrap();
        assert!(store.current().await.is_none());
    }
}
