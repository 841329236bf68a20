use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use tokio::sync::RwLock;

use crate::types::KvStore;

/// Process-local store; state is lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().await;
        Ok(inner.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.remove(key).is_some())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let inner = self.inner.read().await;
        Ok(inner
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
