use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Minimal key-value capability the client persists its state through.
///
/// Keys are opaque strings; values are JSON documents encoded as bytes.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;
}

pub async fn get_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to decode value stored under {key}"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

pub async fn put_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .with_context(|| format!("failed to encode value for {key}"))?;
    store.put(key, bytes).await
}
