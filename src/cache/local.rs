//! Local filesystem cache engine

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::CacheEngine;
use crate::error::CacheError;

/// One `<key>.json` file per entry under a directory.
#[derive(Debug, Clone)]
pub struct LocalFsEngine {
    dir: PathBuf,
}

impl LocalFsEngine {
    /// Use `dir`, creating it and its parents when missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(CacheError::storage)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CacheError::storage(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid cache key '{key}'"),
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl CacheEngine for LocalFsEngine {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.entry_path(key)?;
        Ok(tokio::fs::read(path).await?)
    }

    async fn set(&self, key: &str, data: Vec<u8>) -> Result<(), CacheError> {
        let path = self.entry_path(key)?;
        // Readers only ever see complete files.
        let tmp = self.dir.join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4()));

        tokio::fs::write(&tmp, data).await.map_err(CacheError::storage)?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::storage(err));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_uses_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LocalFsEngine::new(dir.path()).unwrap();

        engine.set("test-key", b"test-data".to_vec()).await.unwrap();
        assert!(dir.path().join("test-key.json").is_file());
        assert_eq!(engine.get("test-key").await.unwrap(), b"test-data");
    }

    #[tokio::test]
    async fn missing_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LocalFsEngine::new(dir.path()).unwrap();
        assert!(engine.get("non-existent").await.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("cache");
        LocalFsEngine::new(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn overwrite_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LocalFsEngine::new(dir.path()).unwrap();
        engine.set("k", b"one".to_vec()).await.unwrap();
        engine.set("k", b"two".to_vec()).await.unwrap();

        assert_eq!(engine.get("k").await.unwrap(), b"two");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let engine = LocalFsEngine::new(dir.path()).unwrap();
        let err = engine.get("../escape").await.unwrap_err();
        assert!(matches!(err, CacheError::Storage(_)));
    }
}
