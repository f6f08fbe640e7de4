// Scratch storage for uploaded documents
//
// An upload lives on disk only while its request is being served. Deletion is
// scheduled when the last `ScratchCleanup` handle is dropped and its outcome is
// never reported.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::debug;

use crate::types::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ScratchStore {
    data_dir: PathBuf,
}

impl ScratchStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// `<data_dir>/<analysis_id>_<basename>`; directory parts of the client name are dropped
    pub fn path_for(&self, analysis_id: &str, file_name: &str) -> PathBuf {
        let base = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        self.data_dir.join(format!("{}_{}", analysis_id, base))
    }

    pub async fn persist(&self, path: &Path, bytes: &[u8]) -> AppResult<()> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| AppError::Storage(format!("cannot create {}: {}", self.data_dir.display(), e)))?;
        fs::write(path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("cannot write {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Stored upload");
        Ok(())
    }
}

/// Deferred best-effort removal of one scratch file
#[derive(Debug, Clone)]
pub struct ScratchCleanup {
    inner: Arc<CleanupTarget>,
}

#[derive(Debug)]
struct CleanupTarget {
    path: PathBuf,
}

impl ScratchCleanup {
    pub fn new(path: PathBuf) -> Self {
        Self {
            inner: Arc::new(CleanupTarget { path }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

impl Drop for CleanupTarget {
    fn drop(&mut self) {
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    remove_quietly(&path).await;
                });
            }
            Err(_) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    debug!(path = %path.display(), error = %e, "Scratch cleanup skipped");
                }
            }
        }
    }
}

async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed scratch file"),
        Err(e) => debug!(path = %path.display(), error = %e, "Scratch cleanup skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn wait_until_gone(path: &Path) -> bool {
        for _ in 0..50 {
            if !path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        !path.exists()
    }

    #[test]
    fn test_path_strips_directories() {
        let store = ScratchStore::new("data");
        assert_eq!(
            store.path_for("abc", "../../etc/report.pdf"),
            PathBuf::from("data/abc_report.pdf")
        );
        assert_eq!(store.path_for("abc", "report.PDF"), PathBuf::from("data/abc_report.PDF"));
    }

    #[tokio::test]
    async fn test_persist_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = ScratchStore::new(dir.path().join("nested/data"));
        let path = store.path_for("id1", "report.pdf");

        store.persist(&path, b"%PDF-1.5").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");
    }

    #[tokio::test]
    async fn test_cleanup_runs_after_last_handle_drops() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scratch.pdf");
        std::fs::write(&path, b"x").unwrap();

        let cleanup = ScratchCleanup::new(path.clone());
        let second = cleanup.clone();
        drop(cleanup);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(path.exists());

        drop(second);
        assert!(wait_until_gone(&path).await);
    }

    #[tokio::test]
    async fn test_cleanup_of_missing_file_is_silent() {
        let dir = TempDir::new().unwrap();
        drop(ScratchCleanup::new(dir.path().join("never-written.pdf")));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[test]
    fn test_cleanup_without_runtime() {
        let dir = TempDir::new().unwrap();
        let store = ScratchStore::new(dir.path());
        let path = store.path_for("id2", "sync.pdf");
        tokio_test::block_on(store.persist(&path, b"x")).unwrap();
        assert!(path.exists());

        drop(ScratchCleanup::new(path.clone()));
        assert!(!path.exists());
    }
}
