//! Sync-to-async engine adapter
//!
//! Wraps a synchronous engine so it exposes the asynchronous capability
//! set: every call resolves immediately with the wrapped call's result and
//! errors pass through unchanged. A pure capability-shape adapter — no
//! retries, no buffering.

use crate::engine::{AsyncStorageEngine, StorageEngine};
use crate::error::EngineError;
use async_trait::async_trait;
use std::sync::Arc;

/// Adapter exposing a [`StorageEngine`] as an [`AsyncStorageEngine`]
#[derive(Debug, Clone)]
pub struct SyncEngineAdapter {
    inner: Arc<dyn StorageEngine>,
}

impl SyncEngineAdapter {
    /// Wrap an owned synchronous engine
    #[inline]
    pub fn new(engine: impl StorageEngine + 'static) -> Self {
        Self {
            inner: Arc::new(engine),
        }
    }

    /// Wrap a shared synchronous engine
    #[inline]
    #[must_use]
    pub fn from_arc(engine: Arc<dyn StorageEngine>) -> Self {
        Self { inner: engine }
    }
}

#[async_trait]
impl AsyncStorageEngine for SyncEngineAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        self.inner.get(key)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), EngineError> {
        self.inner.set(key, value)
    }

    async fn remove(&self, key: &str) -> Result<(), EngineError> {
        self.inner.remove(key)
    }

    async fn clear(&self) -> Result<(), EngineError> {
        self.inner.clear()
    }

    async fn count(&self) -> Result<usize, EngineError> {
        self.inner.count()
    }

    async fn key_at(&self, index: usize) -> Result<Option<String>, EngineError> {
        self.inner.key_at(index)
    }
}
