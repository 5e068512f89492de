use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::providers::{ObjectStorage, ProviderError};

/// Stores objects as files under a root directory and serves them from a
/// static base URL (e.g. a directory exposed by a web server).
pub struct FsObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolves an object path under the root, rejecting anything that could
    /// escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, ProviderError> {
        let rel = Path::new(path);
        let safe = !path.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(ProviderError::Validation(format!("invalid object path: {path}")));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn upload(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<(), ProviderError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path)
    }

    async fn remove(&self, path: &str) -> Result<(), ProviderError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(target).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsObjectStorage::new(dir.path(), "https://cdn.example/crops/");

        storage.upload("u1/a.png", b"png", "image/png").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("u1/a.png")).unwrap(), b"png");
        assert_eq!(storage.public_url("u1/a.png"), "https://cdn.example/crops/u1/a.png");

        storage.remove("u1/a.png").await.unwrap();
        assert!(!dir.path().join("u1/a.png").exists());
    }

    #[tokio::test]
    async fn upload_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsObjectStorage::new(dir.path(), "http://localhost");

        storage.upload("x.jpg", b"1", "image/jpeg").await.unwrap();
        let err = storage.upload("x.jpg", b"2", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, ProviderError::Io(_)));
        assert_eq!(std::fs::read(dir.path().join("x.jpg")).unwrap(), b"1");
    }

    #[tokio::test]
    async fn rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsObjectStorage::new(dir.path(), "http://localhost");

        let err = storage.upload("../escape.png", b"x", "image/png").await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(storage.remove("/etc/passwd").await.is_err());
    }
}
