use crate::core::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Directory standing in for a bucket when running locally.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    fn location(&self, path: &str) -> String {
        self.base_path.join(path).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_file("raw/orders.csv", b"id\n1\n").await.unwrap();
        assert_eq!(storage.read_file("raw/orders.csv").await.unwrap(), b"id\n1\n");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        match storage.read_file("missing.json").await {
            Err(EtlError::IoError(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
