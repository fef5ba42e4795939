//! Persistence capability for the bearer token.
//!
//! The client treats credential storage as an opaque async key-value store.
//! Every operation may fail; the client logs failures and carries on as if no
//! credential were stored.
//!
//! [`KeyringCredentialStore`] keeps tokens in the OS credential store and is
//! the one to use for real hosts. [`FileCredentialStore`] writes plaintext
//! JSON readable only by the owner, for machines without a keyring.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;

/// Errors that can occur when accessing the credential store.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

pub type CredentialStoreResult<T> = Result<T, CredentialStoreError>;

/// Async key-value persistence for credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Read a value. A missing key is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> CredentialStoreResult<Option<String>>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> CredentialStoreResult<()>;

    /// Remove a value. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> CredentialStoreResult<()>;
}

/// Process-lifetime credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_values<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> T {
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut values)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> CredentialStoreResult<Option<String>> {
        Ok(self.with_values(|values| values.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: &str) -> CredentialStoreResult<()> {
        self.with_values(|values| values.insert(key.to_owned(), value.to_owned()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CredentialStoreResult<()> {
        self.with_values(|values| values.remove(key));
        Ok(())
    }
}

/// Credential store backed by the OS keyring.
///
/// Every key becomes one keyring entry under `service`. Keyring calls block,
/// so they run on tokio's blocking pool.
pub struct KeyringCredentialStore {
    service: String,
    entries: Mutex<HashMap<String, Arc<keyring::Entry>>>,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> CredentialStoreResult<Arc<keyring::Entry>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(key) {
            return Ok(Arc::clone(entry));
        }
        let entry = Arc::new(keyring::Entry::new(&self.service, key)?);
        entries.insert(key.to_owned(), Arc::clone(&entry));
        Ok(entry)
    }
}

impl std::fmt::Debug for KeyringCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringCredentialStore")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

async fn run_blocking<T, F>(f: F) -> CredentialStoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CredentialStoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CredentialStoreError::Unavailable(e.to_string()))?
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn get(&self, key: &str) -> CredentialStoreResult<Option<String>> {
        let entry = self.entry(key)?;
        run_blocking(move || match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> CredentialStoreResult<()> {
        let entry = self.entry(key)?;
        let value = value.to_owned();
        run_blocking(move || Ok(entry.set_password(&value)?)).await?;
        tracing::debug!(key, service = %self.service, "stored credential in keyring");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CredentialStoreResult<()> {
        let entry = self.entry(key)?;
        run_blocking(move || match entry.delete_credential() {
            // Already gone.
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        })
        .await?;
        tracing::debug!(key, service = %self.service, "deleted credential from keyring");
        Ok(())
    }
}

/// Credential store backed by a JSON object in a single file.
///
/// The file is created on the first write and, on Unix, is readable only by
/// its owner. Writes go to a sibling temporary file that is then renamed over
/// the original.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: AsyncMutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: AsyncMutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> CredentialStoreResult<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, values: &HashMap<String, String>) -> CredentialStoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        write_owner_only(&tmp, &serde_json::to_vec_pretty(values)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

async fn write_owner_only(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path).await?;
    // A leftover file keeps its old mode; `mode` only applies on creation.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> CredentialStoreResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> CredentialStoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        values.insert(key.to_owned(), value.to_owned());
        self.save(&values).await?;
        tracing::debug!(key, path = %self.path.display(), "stored credential");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CredentialStoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        if values.remove(key).is_some() {
            self.save(&values).await?;
            tracing::debug!(key, path = %self.path.display(), "deleted credential");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get("token").await.unwrap(), None);

        store.set("token", "abc").await.unwrap();
        assert_eq!(store.get("token").await.unwrap().as_deref(), Some("abc"));

        store.delete("token").await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), None);
        // Deleting again is fine.
        store.delete("token").await.unwrap();
    }

    #[tokio::test]
    async fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::new(&path);
        store.set("client_accessToken", "secret").await.unwrap();
        store.set("other", "value").await.unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(
            reopened.get("client_accessToken").await.unwrap().as_deref(),
            Some("secret")
        );

        reopened.delete("client_accessToken").await.unwrap();
        assert_eq!(store.get("client_accessToken").await.unwrap(), None);
        assert_eq!(store.get("other").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get("anything").await.unwrap(), None);
        store.delete("anything").await.unwrap();
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_store_is_readable_by_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, b"{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileCredentialStore::new(&path);
        store.set("widget_accessToken", "SECRET").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    fn mock_keyring() -> KeyringCredentialStore {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        KeyringCredentialStore::new("remote-player-client-tests")
    }

    #[tokio::test]
    async fn keyring_store_round_trip() {
        let store = mock_keyring();
        assert_eq!(store.service(), "remote-player-client-tests");
        assert_eq!(store.get("widget_accessToken").await.unwrap(), None);

        store.set("widget_accessToken", "tok").await.unwrap();
        assert_eq!(
            store.get("widget_accessToken").await.unwrap().as_deref(),
            Some("tok")
        );
        assert_eq!(store.get("other_accessToken").await.unwrap(), None);

        store.delete("widget_accessToken").await.unwrap();
        assert_eq!(store.get("widget_accessToken").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keyring_delete_of_missing_entry_succeeds() {
        let store = mock_keyring();
        store.delete("never_stored").await.unwrap();
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileCredentialStore::new(&path);
        let err = store.get("token").await.unwrap_err();
        assert!(matches!(err, CredentialStoreError::Corrupt(_)));
    }
}
