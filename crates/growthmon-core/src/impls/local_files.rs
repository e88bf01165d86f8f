//! LocalFileStore - ローカルディスク上の media root

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::ports::FileStore;

/// Resolves every relative path against `media_root`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    media_root: PathBuf,
}

impl LocalFileStore {
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
        }
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.media_root.join(path)
    }

    async fn ensure_parent(path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) => tokio::fs::create_dir_all(parent).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let path = self.resolve(path);
        Self::ensure_parent(&path).await?;
        tokio::fs::write(path, bytes).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let to = self.resolve(to);
        Self::ensure_parent(&to).await?;
        tokio::fs::rename(self.resolve(from), to).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(self.resolve(path)).await
    }

    async fn remove_tree(&self, path: &Path) -> io::Result<()> {
        match tokio::fs::remove_dir_all(self.resolve(path)).await {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(self.resolve(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_rename_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store
            .write(Path::new("a/tmp/x/data/f.txt"), b"hi")
            .await
            .unwrap();
        store
            .rename(Path::new("a/tmp/x/data/f.txt"), Path::new("a/1/data/f.txt"))
            .await
            .unwrap();

        assert!(!store.exists(Path::new("a/tmp/x/data/f.txt")).await.unwrap());
        assert_eq!(
            std::fs::read(dir.path().join("a/1/data/f.txt")).unwrap(),
            b"hi"
        );

        store.remove_tree(Path::new("a/1")).await.unwrap();
        assert!(!store.exists(Path::new("a/1")).await.unwrap());
    }

    #[tokio::test]
    async fn removing_a_missing_tree_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        store.remove_tree(Path::new("nope")).await.unwrap();
    }
}
