use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::types::KvStore;

/// Store backed by a single JSON document on disk.
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, so a crash never leaves a half-written document behind. Values must
/// be valid JSON; they are kept as structured JSON in the file so it stays
/// readable.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    path: PathBuf,
    inner: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl FileKvStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let kv = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("state file {} is not a JSON object", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        tracing::debug!(path=%path.display(), keys=kv.len(), "opened state file");
        Ok(Self {
            path,
            inner: Arc::new(RwLock::new(kv)),
        })
    }

    async fn flush(&self, kv: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(kv)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().await;
        inner
            .get(key)
            .map(|v| serde_json::to_vec(v).map_err(Into::into))
            .transpose()
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let value: Value = serde_json::from_slice(&value)
            .with_context(|| format!("value for {key} is not JSON"))?;
        let mut inner = self.inner.write().await;
        let mut next = inner.clone();
        next.insert(key.to_string(), value);
        self.flush(&next).await?;
        *inner = next;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if !inner.contains_key(key) {
            return Ok(false);
        }
        let mut next = inner.clone();
        next.remove(key);
        self.flush(&next).await?;
        *inner = next;
        Ok(true)
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let inner = self.inner.read().await;
        let mut out = Vec::new();
        for (k, v) in inner
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            out.push((k.clone(), serde_json::to_vec(v)?));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = FileKvStore::open(&path).await.unwrap();
        store.put("registry/jobs", b"[1,2]".to_vec()).await.unwrap();
        store.put("settings/add", b"\"5\"".to_vec()).await.unwrap();
        assert!(store.delete("settings/add").await.unwrap());

        let reopened = FileKvStore::open(&path).await.unwrap();
        let value = reopened.get("registry/jobs").await.unwrap().unwrap();
        assert_eq!(serde_json::from_slice::<Vec<u32>>(&value).unwrap(), vec![1, 2]);
        assert_eq!(reopened.get("settings/add").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_non_json_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().join("state.json")).await.unwrap();
        assert!(store.put("k", b"{oops".to_vec()).await.is_err());
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"[not an object").await.unwrap();
        assert!(FileKvStore::open(&path).await.is_err());
    }
}
