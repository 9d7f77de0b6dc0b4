//! Locating (and if needed installing) the external miner executable.

pub mod xmrig;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use xmrig::XmrigInstaller;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AcquisitionError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("File system error: {0}")]
    FileSystemError(String),
    #[error("Archive extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("Executable not found at {}", .0.display())]
    ExecutableMissing(PathBuf),
}

#[async_trait]
pub trait ExecutableSource: Send + Sync {
    async fn resolved_executable_path(&self) -> Result<PathBuf, AcquisitionError>;
}

/// A miner binary supplied by the user.
pub struct LocalExecutable {
    path: PathBuf,
}

impl LocalExecutable {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ExecutableSource for LocalExecutable {
    async fn resolved_executable_path(&self) -> Result<PathBuf, AcquisitionError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => Ok(self.path.clone()),
            _ => Err(AcquisitionError::ExecutableMissing(self.path.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_executable_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = LocalExecutable::new(dir.path().join("xmrig"));
        assert!(matches!(
            missing.resolved_executable_path().await,
            Err(AcquisitionError::ExecutableMissing(_))
        ));

        let path = dir.path().join("xmrig");
        std::fs::write(&path, b"binary").unwrap();
        let present = LocalExecutable::new(&path);
        assert_eq!(present.resolved_executable_path().await.unwrap(), path);
    }

    #[tokio::test]
    async fn test_local_executable_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalExecutable::new(dir.path());
        assert!(source.resolved_executable_path().await.is_err());
    }
}
