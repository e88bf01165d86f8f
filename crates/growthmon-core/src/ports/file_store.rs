//! FileStore port - ジョブごとのファイル置き場
//!
//! パスはすべて media root からの相対パスです。

use std::path::Path;

use async_trait::async_trait;

/// FileStore は job ディレクトリへの読み書きを抽象化
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `bytes` to `path`, creating parent directories.
    async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()>;

    /// Move a file, creating the destination's parent directories.
    async fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Remove a directory tree. A missing tree is not an error.
    async fn remove_tree(&self, path: &Path) -> std::io::Result<()>;

    async fn exists(&self, path: &Path) -> std::io::Result<bool>;
}
