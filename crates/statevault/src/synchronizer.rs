//! Fragment synchronizer
//!
//! The orchestrator of the load → deserialize → migrate → merge →
//! (continue) → serialize → write-back pipeline. One invocation moves
//! through four phases: hydrating (lifecycle actions only), awaiting the
//! continuation, writing back, idle again. The synchronizer has the same
//! call shape as the continuation it wraps, so it composes as a stage of
//! the pipeline it sits inside.

use crate::action::Action;
use crate::engine::{AsyncStorageEngine, Engine};
use crate::error::SyncError;
use crate::keypath::{get_path, set_path};
use crate::migration::{resolve_for_fragment, resolve_for_tree};
use crate::observer::{SyncObserver, TracingObserver};
use crate::options::SyncOptions;
use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Boxed continuation passed to a [`PipelineStage`]
///
/// Invoked exactly once per invocation with the (possibly hydrated) state
/// and the original action; resolves to the authoritative next state.
pub type Next<'a> =
    Box<dyn FnOnce(Value, Action) -> BoxFuture<'a, Result<Value, SyncError>> + Send + 'a>;

/// A stage of the host dispatch pipeline
///
/// The synchronizer implements this trait with exactly the shape of the
/// continuation it wraps, so stages compose transparently.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Handle one action, forwarding to `next` for the rest of the pipeline
    ///
    /// # Errors
    /// Returns [`SyncError`] if the stage or the continuation fails.
    async fn handle(&self, state: Value, action: &Action, next: Next<'_>)
        -> Result<Value, SyncError>;
}

/// Result of hydrating one invocation's fragment key set
struct HydrationPass {
    /// Per-key migrated flags, parallel to the fragment key set
    migrated: Vec<bool>,
    /// Whether the whole-tree strategy rewrote the folded tree
    tree_migrated: bool,
}

impl HydrationPass {
    fn any_migrated(&self) -> bool {
        self.tree_migrated || self.migrated.iter().any(|flag| *flag)
    }
}

/// The fragment synchronizer
///
/// Owns its engine and configuration; holds no reference to any state tree
/// beyond a single `handle` invocation. One engine instance may be used by
/// only one synchronizer.
#[derive(Debug)]
pub struct StateSynchronizer {
    engine: Arc<dyn AsyncStorageEngine>,
    options: SyncOptions,
    observer: Arc<dyn SyncObserver>,
}

impl StateSynchronizer {
    /// Create a synchronizer over an engine with validated options
    ///
    /// # Errors
    /// Returns [`SyncError::Options`] if the configuration is invalid.
    pub fn new(engine: Engine, options: SyncOptions) -> Result<Self, SyncError> {
        options.validate()?;
        Ok(Self {
            engine: engine.into_async(),
            options,
            observer: Arc::new(TracingObserver),
        })
    }

    /// Replace the default tracing observer
    #[inline]
    #[must_use]
    pub fn with_observer(mut self, observer: impl SyncObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Configured options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run one action through hydrate, continuation, and write-back
    ///
    /// Lifecycle actions hydrate the fragment key set from storage before
    /// the continuation runs; all other actions go straight through. After
    /// the continuation resolves, fragments are persisted: every key on
    /// ordinary actions, only migrated keys after a hydrate.
    ///
    /// # Errors
    /// Returns [`SyncError`] on engine read failures, migration transform
    /// failures, continuation failures, or aggregated write failures.
    pub async fn handle<F, Fut>(
        &self,
        state: Value,
        action: &Action,
        next: F,
    ) -> Result<Value, SyncError>
    where
        F: FnOnce(Value, Action) -> Fut + Send,
        Fut: Future<Output = Result<Value, SyncError>> + Send,
    {
        let is_lifecycle = self.options.lifecycle_matcher().as_ref()(action);
        let keys = self.options.selector().keys_for(&state);

        let (state, pass) = if is_lifecycle {
            tracing::debug!(action = %action.kind, fragments = keys.len(), "hydrating");
            let (state, pass) = self.hydrate(&keys, state).await?;
            (state, Some(pass))
        } else {
            (state, None)
        };

        let next_state = next(state, action.clone()).await?;

        self.write_back(&keys, pass.as_ref(), &next_state).await?;
        Ok(next_state)
    }

    /// Load, decode, and migrate every fragment, folding into the tree
    ///
    /// Loads are sequential in key order so the fold is deterministic
    /// regardless of engine latency; the whole-tree migration runs over
    /// the completed fold.
    async fn hydrate(
        &self,
        keys: &[String],
        mut tree: Value,
    ) -> Result<(Value, HydrationPass), SyncError> {
        let mut migrated = Vec::with_capacity(keys.len());

        for key in keys {
            let mut fragment_migrated = false;
            if let Some(value) = self.load_fragment(key).await? {
                let value = match resolve_for_fragment(
                    self.options.migrations(),
                    &value,
                    key,
                    self.observer.as_ref(),
                ) {
                    Some(strategy) => {
                        let upgraded = strategy.apply(value)?;
                        self.observer.fragment_migrated(key, strategy.target_version());
                        fragment_migrated = true;
                        upgraded
                    }
                    None => value,
                };
                tree = set_path(tree, key, value);
            }
            migrated.push(fragment_migrated);
        }

        let tree_migrated = match resolve_for_tree(
            self.options.migrations(),
            &tree,
            self.options.selector().is_whole_tree(),
            self.observer.as_ref(),
        ) {
            Some(strategy) => {
                tracing::debug!(
                    target_version = strategy.target_version(),
                    "applying whole-tree migration"
                );
                tree = strategy.apply(tree)?;
                true
            }
            None => false,
        };

        Ok((
            tree,
            HydrationPass {
                migrated,
                tree_migrated,
            },
        ))
    }

    /// Load one fragment's persisted value, or `None` when empty
    ///
    /// Absent records, records that fail to decode, and decoded `null`
    /// all resolve to `None`: the fragment keeps the default the
    /// continuation establishes. Engine read failures propagate.
    async fn load_fragment(&self, key: &str) -> Result<Option<Value>, SyncError> {
        let Some(raw) = self.engine.get(key).await? else {
            return Ok(None);
        };
        match self.options.codec().deserialize(&raw) {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                self.observer.deserialize_error(key, &error);
                Ok(None)
            }
        }
    }

    /// Persist fragments from the continuation's next state
    ///
    /// Policy: after a hydrate, write exactly the keys whose hydrate
    /// outcome was migrated — every key when the whole-tree migration
    /// applied, none when no migration applied at all. Without a hydrate
    /// (ordinary actions), write every key. Keys absent from the next
    /// state are skipped. Writes run concurrently; every key is attempted
    /// before failures are reported together.
    async fn write_back(
        &self,
        keys: &[String],
        pass: Option<&HydrationPass>,
        next_state: &Value,
    ) -> Result<(), SyncError> {
        if pass.is_some_and(|pass| !pass.any_migrated()) {
            return Ok(());
        }

        let mut writes = Vec::new();
        for (index, key) in keys.iter().enumerate() {
            if let Some(pass) = pass {
                if !pass.tree_migrated && !pass.migrated[index] {
                    continue;
                }
            }
            let Some(value) = get_path(next_state, key) else {
                continue;
            };
            let repr = self.options.codec().serialize(value)?;
            writes.push(async move { (key.clone(), self.engine.set(key, repr).await) });
        }

        tracing::debug!(writes = writes.len(), "writing back");
        let failures: Vec<_> = join_all(writes)
            .await
            .into_iter()
            .filter_map(|(key, result)| result.err().map(|error| (key, error)))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SyncError::WriteBack { failures })
        }
    }
}

#[async_trait]
impl PipelineStage for StateSynchronizer {
    async fn handle(
        &self,
        state: Value,
        action: &Action,
        next: Next<'_>,
    ) -> Result<Value, SyncError> {
        StateSynchronizer::handle(self, state, action, move |state, action| next(state, action))
            .await
    }
}
