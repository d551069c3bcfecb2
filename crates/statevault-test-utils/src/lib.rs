//! Testing utilities for the StateVault workspace
//!
//! Shared engines, a dispatch harness, and reducers used by scenario tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use statevault::{
    get_path, set_path, Action, AsyncStorageEngine, EngineError, StateSynchronizer, StorageEngine,
    SyncError,
};
use std::collections::HashSet;
use std::sync::Arc;

/// In-memory synchronous engine over an insertion-ordered map.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    entries: Mutex<IndexMap<String, String>>,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw stored representation, bypassing any codec.
    pub fn seed_raw(&self, key: impl Into<String>, raw: impl Into<String>) {
        self.entries.lock().insert(key.into(), raw.into());
    }

    /// Seed a JSON value under a key.
    pub fn seed_json(&self, key: impl Into<String>, value: &Value) {
        self.seed_raw(key, value.to_string());
    }

    /// Raw stored representation for a key.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Stored representation decoded as JSON.
    #[must_use]
    pub fn json(&self, key: &str) -> Option<Value> {
        self.raw(key).and_then(|raw| serde_json::from_str(&raw).ok())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl StorageEngine for MemoryEngine {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), EngineError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), EngineError> {
        self.entries.lock().shift_remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), EngineError> {
        self.entries.lock().clear();
        Ok(())
    }

    fn count(&self) -> Result<usize, EngineError> {
        Ok(self.entries.lock().len())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>, EngineError> {
        Ok(self
            .entries
            .lock()
            .get_index(index)
            .map(|(key, _)| key.clone()))
    }
}

/// Natively asynchronous engine: yields to the scheduler before completing
/// each operation, exercising genuinely deferred completion paths.
#[derive(Debug, Default)]
pub struct NativeAsyncEngine {
    inner: MemoryEngine,
}

impl NativeAsyncEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_json(&self, key: impl Into<String>, value: &Value) {
        self.inner.seed_json(key, value);
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.raw(key)
    }

    #[must_use]
    pub fn json(&self, key: &str) -> Option<Value> {
        self.inner.json(key)
    }
}

#[async_trait]
impl AsyncStorageEngine for NativeAsyncEngine {
    async fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        tokio::task::yield_now().await;
        StorageEngine::get(&self.inner, key)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), EngineError> {
        tokio::task::yield_now().await;
        StorageEngine::set(&self.inner, key, value)
    }

    async fn remove(&self, key: &str) -> Result<(), EngineError> {
        tokio::task::yield_now().await;
        StorageEngine::remove(&self.inner, key)
    }

    async fn clear(&self) -> Result<(), EngineError> {
        tokio::task::yield_now().await;
        StorageEngine::clear(&self.inner)
    }

    async fn count(&self) -> Result<usize, EngineError> {
        tokio::task::yield_now().await;
        StorageEngine::count(&self.inner)
    }

    async fn key_at(&self, index: usize) -> Result<Option<String>, EngineError> {
        tokio::task::yield_now().await;
        StorageEngine::key_at(&self.inner, index)
    }
}

/// Engine with injectable per-key read/write failures.
#[derive(Debug, Default)]
pub struct FailingEngine {
    inner: MemoryEngine,
    failing_reads: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
}

impl FailingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_json(&self, key: impl Into<String>, value: &Value) {
        self.inner.seed_json(key, value);
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.raw(key)
    }

    pub fn fail_reads_on(&self, key: impl Into<String>) {
        self.failing_reads.lock().insert(key.into());
    }

    pub fn fail_writes_on(&self, key: impl Into<String>) {
        self.failing_writes.lock().insert(key.into());
    }
}

impl StorageEngine for FailingEngine {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        if self.failing_reads.lock().contains(key) {
            return Err(EngineError::read(key, "injected read failure"));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), EngineError> {
        if self.failing_writes.lock().contains(key) {
            return Err(EngineError::write(key, "injected write failure"));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), EngineError> {
        self.inner.remove(key)
    }

    fn clear(&self) -> Result<(), EngineError> {
        self.inner.clear()
    }

    fn count(&self) -> Result<usize, EngineError> {
        self.inner.count()
    }

    fn key_at(&self, index: usize) -> Result<Option<String>, EngineError> {
        self.inner.key_at(index)
    }
}

/// One recorded engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOp {
    Get(String),
    Set(String),
    Remove(String),
    Clear,
    Count,
    KeyAt(usize),
}

/// Engine wrapper recording every operation, for write-count assertions.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    inner: MemoryEngine,
    ops: Mutex<Vec<EngineOp>>,
}

impl RecordingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_json(&self, key: impl Into<String>, value: &Value) {
        self.inner.seed_json(key, value);
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.raw(key)
    }

    #[must_use]
    pub fn json(&self, key: &str) -> Option<Value> {
        self.inner.json(key)
    }

    #[must_use]
    pub fn ops(&self) -> Vec<EngineOp> {
        self.ops.lock().clone()
    }

    /// Total number of `set` operations.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.ops
            .lock()
            .iter()
            .filter(|op| matches!(op, EngineOp::Set(_)))
            .count()
    }

    /// Number of `set` operations for one key.
    #[must_use]
    pub fn writes_for(&self, key: &str) -> usize {
        self.ops
            .lock()
            .iter()
            .filter(|op| matches!(op, EngineOp::Set(k) if k == key))
            .count()
    }
}

impl StorageEngine for RecordingEngine {
    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        self.ops.lock().push(EngineOp::Get(key.to_string()));
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), EngineError> {
        self.ops.lock().push(EngineOp::Set(key.to_string()));
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), EngineError> {
        self.ops.lock().push(EngineOp::Remove(key.to_string()));
        self.inner.remove(key)
    }

    fn clear(&self) -> Result<(), EngineError> {
        self.ops.lock().push(EngineOp::Clear);
        self.inner.clear()
    }

    fn count(&self) -> Result<usize, EngineError> {
        self.ops.lock().push(EngineOp::Count);
        self.inner.count()
    }

    fn key_at(&self, index: usize) -> Result<Option<String>, EngineError> {
        self.ops.lock().push(EngineOp::KeyAt(index));
        self.inner.key_at(index)
    }
}

pub type Reducer = dyn Fn(Value, &Action) -> Value + Send + Sync;

/// Minimal dispatch harness: a state tree, a reducer, and a synchronizer
/// sitting between them, the way the middleware sits in a host pipeline.
///
/// The initial state carries the fragment defaults, mirroring a host store
/// that establishes defaults before its plugins run.
pub struct TestStore {
    synchronizer: StateSynchronizer,
    state: Value,
    reducer: Arc<Reducer>,
}

impl TestStore {
    pub fn new<F>(synchronizer: StateSynchronizer, defaults: Value, reducer: F) -> Self
    where
        F: Fn(Value, &Action) -> Value + Send + Sync + 'static,
    {
        Self {
            synchronizer,
            state: defaults,
            reducer: Arc::new(reducer),
        }
    }

    /// Dispatch one action through the synchronizer and the reducer.
    ///
    /// # Errors
    /// Returns [`SyncError`] if the synchronizer invocation fails; the
    /// held state is left unchanged in that case.
    pub async fn dispatch(&mut self, action: &Action) -> Result<(), SyncError> {
        let reducer = Arc::clone(&self.reducer);
        let next_state = self
            .synchronizer
            .handle(self.state.clone(), action, move |state, action| {
                let reduced = reducer.as_ref()(state, &action);
                std::future::ready(Ok(reduced))
            })
            .await?;
        self.state = next_state;
        Ok(())
    }

    /// Dispatch the store-initialization action.
    ///
    /// # Errors
    /// Returns [`SyncError`] if the synchronizer invocation fails.
    pub async fn init(&mut self) -> Result<(), SyncError> {
        self.dispatch(&Action::init()).await
    }

    /// Register a feature fragment after startup: adds its default to the
    /// tree and dispatches the state-replacement action, the way a host
    /// store registers lazily loaded modules.
    ///
    /// # Errors
    /// Returns [`SyncError`] if the synchronizer invocation fails.
    pub async fn register_fragment(
        &mut self,
        key: &str,
        default: Value,
    ) -> Result<(), SyncError> {
        self.state = set_path(self.state.clone(), key, default);
        self.dispatch(&Action::update()).await
    }

    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    #[must_use]
    pub fn fragment(&self, key: &str) -> Option<&Value> {
        get_path(&self.state, key)
    }
}

/// Reducer for a `counter` fragment handling `INCREMENT` and `DECREMENT`.
#[must_use]
pub fn counter_reducer(state: Value, action: &Action) -> Value {
    let count = get_path(&state, "counter.count")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    match action.kind.as_str() {
        "INCREMENT" => set_path(state, "counter.count", json!(count + 1)),
        "DECREMENT" => set_path(state, "counter.count", json!(count - 1)),
        _ => state,
    }
}

/// Reducer that returns the state unchanged for every action.
#[must_use]
pub fn identity_reducer(state: Value, _action: &Action) -> Value {
    state
}
