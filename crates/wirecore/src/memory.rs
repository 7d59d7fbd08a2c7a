use crate::{MemoryError, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Key-value store injected into every node context.
///
/// A `get` that follows a `set` for the same key returns the stored value
/// until the key is deleted or the store is cleared.
#[async_trait]
pub trait Memory: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, MemoryError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), MemoryError>;

    async fn delete(&self, key: &str) -> Result<(), MemoryError>;

    async fn clear(&self) -> Result<(), MemoryError>;
}

/// In-memory store backed by a `HashMap` protected by `RwLock`.
#[derive(Default)]
pub struct InMemoryMemory {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Memory for InMemoryMemory {
    async fn get(&self, key: &str) -> Result<Option<Value>, MemoryError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), MemoryError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), MemoryError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.entries.write().await.clear();
        Ok(())
    }
}
