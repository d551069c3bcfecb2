//! Storage engine capability traits
//!
//! Engines expose six operations over a flat keyspace of serialized
//! fragments: `get`, `set`, `remove`, `clear`, `count`, `key_at`. Both a
//! synchronous and an asynchronous shape exist; the synchronizer always
//! works against the asynchronous one, normalizing through
//! [`Engine::into_async`].
//!
//! Engines are constructed and owned by the host and handed to the
//! synchronizer explicitly; there is no process-wide default instance.

use crate::adapter::SyncEngineAdapter;
use crate::error::EngineError;
use async_trait::async_trait;
use std::sync::Arc;

/// Synchronous storage engine capability set
///
/// Each fragment key is an independent keyspace entry; implementations
/// provide per-key atomicity only, never cross-key transactions.
pub trait StorageEngine: Send + Sync + std::fmt::Debug {
    /// Read the stored representation for a key, `None` when absent
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend read fails.
    fn get(&self, key: &str) -> Result<Option<String>, EngineError>;

    /// Store a representation under a key
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend write fails.
    fn set(&self, key: &str, value: String) -> Result<(), EngineError>;

    /// Remove a key
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend write fails.
    fn remove(&self, key: &str) -> Result<(), EngineError>;

    /// Remove every key
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend write fails.
    fn clear(&self) -> Result<(), EngineError>;

    /// Number of stored keys
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend cannot be enumerated.
    fn count(&self) -> Result<usize, EngineError>;

    /// Key at a stable enumeration index, `None` when out of range
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend cannot be enumerated.
    fn key_at(&self, index: usize) -> Result<Option<String>, EngineError>;
}

impl<T: StorageEngine + ?Sized> StorageEngine for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), EngineError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), EngineError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), EngineError> {
        (**self).clear()
    }

    fn count(&self) -> Result<usize, EngineError> {
        (**self).count()
    }

    fn key_at(&self, index: usize) -> Result<Option<String>, EngineError> {
        (**self).key_at(index)
    }
}

/// Asynchronous storage engine capability set
///
/// Identical operations to [`StorageEngine`], each returning a deferred
/// result.
#[async_trait]
pub trait AsyncStorageEngine: Send + Sync + std::fmt::Debug {
    /// Read the stored representation for a key, `None` when absent
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend read fails.
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError>;

    /// Store a representation under a key
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend write fails.
    async fn set(&self, key: &str, value: String) -> Result<(), EngineError>;

    /// Remove a key
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend write fails.
    async fn remove(&self, key: &str) -> Result<(), EngineError>;

    /// Remove every key
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend write fails.
    async fn clear(&self) -> Result<(), EngineError>;

    /// Number of stored keys
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend cannot be enumerated.
    async fn count(&self) -> Result<usize, EngineError>;

    /// Key at a stable enumeration index, `None` when out of range
    ///
    /// # Errors
    /// Returns [`EngineError`] if the backend cannot be enumerated.
    async fn key_at(&self, index: usize) -> Result<Option<String>, EngineError>;
}

#[async_trait]
impl<T: AsyncStorageEngine + ?Sized> AsyncStorageEngine for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), EngineError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), EngineError> {
        (**self).remove(key).await
    }

    async fn clear(&self) -> Result<(), EngineError> {
        (**self).clear().await
    }

    async fn count(&self) -> Result<usize, EngineError> {
        (**self).count().await
    }

    async fn key_at(&self, index: usize) -> Result<Option<String>, EngineError> {
        (**self).key_at(index).await
    }
}

/// Engine selection, tagged by capability shape
///
/// The shape is declared by the host at configuration time; nothing probes
/// it at runtime.
#[derive(Debug, Clone)]
pub enum Engine {
    /// A synchronous engine, adapted to the async set on construction
    Sync(Arc<dyn StorageEngine>),
    /// A natively asynchronous engine
    Async(Arc<dyn AsyncStorageEngine>),
}

impl Engine {
    /// Wrap a synchronous engine
    #[inline]
    pub fn sync(engine: impl StorageEngine + 'static) -> Self {
        Self::Sync(Arc::new(engine))
    }

    /// Wrap an asynchronous engine
    #[inline]
    pub fn asynchronous(engine: impl AsyncStorageEngine + 'static) -> Self {
        Self::Async(Arc::new(engine))
    }

    /// Normalize to the asynchronous capability set
    ///
    /// Synchronous engines are wrapped in a [`SyncEngineAdapter`]; the
    /// synchronizer never branches on engine kind after this point.
    #[must_use]
    pub fn into_async(self) -> Arc<dyn AsyncStorageEngine> {
        match self {
            Self::Sync(engine) => Arc::new(SyncEngineAdapter::from_arc(engine)),
            Self::Async(engine) => engine,
        }
    }
}
