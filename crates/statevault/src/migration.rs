//! Version-aware migration strategies
//!
//! A [`MigrationStrategy`] upgrades stale persisted data before it is
//! merged into the live tree. Each strategy declares the version it
//! targets, where to find the version marker (a dotted key path), and an
//! optional fragment scope. At most one strategy applies per fragment per
//! invocation: the first match in configured order wins.

use crate::error::MigrationError;
use crate::keypath::get_path;
use crate::observer::SyncObserver;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Fallible transform applied to a matching persisted value
pub type MigrateFn = dyn Fn(Value) -> Result<Value, MigrationError> + Send + Sync;

/// Default location of the version marker inside a persisted value
pub const DEFAULT_VERSION_KEY: &str = "version";

/// One migration step from a persisted version to the current shape
#[derive(Clone)]
pub struct MigrationStrategy {
    target_version: u64,
    version_key: String,
    fragment_key: Option<String>,
    migrate: Arc<MigrateFn>,
}

impl MigrationStrategy {
    /// Create a strategy targeting persisted values at `target_version`
    ///
    /// Defaults: version marker at `"version"`, applicable in whole-tree
    /// mode only (no fragment scope).
    pub fn new<F>(target_version: u64, migrate: F) -> Self
    where
        F: Fn(Value) -> Result<Value, MigrationError> + Send + Sync + 'static,
    {
        Self {
            target_version,
            version_key: DEFAULT_VERSION_KEY.to_string(),
            fragment_key: None,
            migrate: Arc::new(migrate),
        }
    }

    /// Resolve the version marker at a dotted path instead of `"version"`
    #[inline]
    #[must_use]
    pub fn with_version_key(mut self, path: impl Into<String>) -> Self {
        self.version_key = path.into();
        self
    }

    /// Scope the strategy to one fragment key
    ///
    /// Unscoped strategies apply to the whole tree (in whole-tree mode);
    /// scoped strategies apply only to their fragment.
    #[inline]
    #[must_use]
    pub fn for_fragment(mut self, key: impl Into<String>) -> Self {
        self.fragment_key = Some(key.into());
        self
    }

    /// Version this strategy targets
    #[inline]
    #[must_use]
    pub fn target_version(&self) -> u64 {
        self.target_version
    }

    /// Fragment scope, `None` for whole-tree strategies
    #[inline]
    #[must_use]
    pub fn fragment_key(&self) -> Option<&str> {
        self.fragment_key.as_deref()
    }

    /// Check whether the value's version marker matches the target
    fn version_matches(&self, value: &Value) -> bool {
        get_path(value, &self.version_key).and_then(Value::as_u64) == Some(self.target_version)
    }

    /// Run the transform on a matching value
    ///
    /// The transform is developer-authored and trusted; its failure is
    /// fatal to the invocation.
    ///
    /// # Errors
    /// Returns [`MigrationError`] if the transform fails.
    pub fn apply(&self, value: Value) -> Result<Value, MigrationError> {
        (self.migrate)(value)
    }
}

impl fmt::Debug for MigrationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStrategy")
            .field("target_version", &self.target_version)
            .field("version_key", &self.version_key)
            .field("fragment_key", &self.fragment_key)
            .finish_non_exhaustive()
    }
}

/// Select the strategy for one fragment's persisted value
///
/// Applicable when the version marker matches and the strategy is scoped
/// to exactly this fragment. More than one applicable strategy is a
/// configuration smell, reported through the observer; the first in list
/// order wins.
pub(crate) fn resolve_for_fragment<'a>(
    strategies: &'a [MigrationStrategy],
    value: &Value,
    key: &str,
    observer: &dyn SyncObserver,
) -> Option<&'a MigrationStrategy> {
    let mut matches = strategies
        .iter()
        .filter(|strategy| strategy.version_matches(value) && strategy.fragment_key() == Some(key));
    let selected = matches.next();
    let extra = matches.count();
    if extra > 0 {
        observer.ambiguous_migrations(Some(key), extra + 1);
    }
    selected
}

/// Select the whole-tree strategy for the folded state
///
/// Applicable only in whole-tree mode, for unscoped strategies whose
/// version marker matches against the tree itself.
pub(crate) fn resolve_for_tree<'a>(
    strategies: &'a [MigrationStrategy],
    tree: &Value,
    whole_tree_mode: bool,
    observer: &dyn SyncObserver,
) -> Option<&'a MigrationStrategy> {
    if !whole_tree_mode {
        return None;
    }
    let mut matches = strategies
        .iter()
        .filter(|strategy| strategy.version_matches(tree) && strategy.fragment_key().is_none());
    let selected = matches.next();
    let extra = matches.count();
    if extra > 0 {
        observer.ambiguous_migrations(None, extra + 1);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::TracingObserver;
    use serde_json::json;

    fn bump_to_v2(value: Value) -> Result<Value, MigrationError> {
        let count = value.get("count").and_then(Value::as_u64).unwrap_or(0);
        Ok(json!({"counts": count, "version": 2}))
    }

    #[test]
    fn fragment_strategy_matches_version_and_key() {
        let strategies = vec![MigrationStrategy::new(1, bump_to_v2).for_fragment("counter")];
        let value = json!({"count": 100, "version": 1});

        let hit = resolve_for_fragment(&strategies, &value, "counter", &TracingObserver);
        assert!(hit.is_some());

        let wrong_key = resolve_for_fragment(&strategies, &value, "settings", &TracingObserver);
        assert!(wrong_key.is_none());

        let wrong_version = json!({"count": 100, "version": 2});
        assert!(resolve_for_fragment(&strategies, &wrong_version, "counter", &TracingObserver).is_none());
    }

    #[test]
    fn missing_version_marker_never_matches() {
        let strategies = vec![MigrationStrategy::new(1, Ok).for_fragment("counter")];
        let value = json!({"count": 100});
        assert!(resolve_for_fragment(&strategies, &value, "counter", &TracingObserver).is_none());
    }

    #[test]
    fn non_numeric_version_never_matches() {
        let strategies = vec![MigrationStrategy::new(1, Ok).for_fragment("counter")];
        let value = json!({"count": 100, "version": "1"});
        assert!(resolve_for_fragment(&strategies, &value, "counter", &TracingObserver).is_none());
    }

    #[test]
    fn first_match_wins() {
        let strategies = vec![
            MigrationStrategy::new(1, |_| Ok(json!("first"))).for_fragment("counter"),
            MigrationStrategy::new(1, |_| Ok(json!("second"))).for_fragment("counter"),
        ];
        let value = json!({"version": 1});

        let hit = resolve_for_fragment(&strategies, &value, "counter", &TracingObserver).unwrap();
        assert_eq!(hit.apply(value).unwrap(), json!("first"));
    }

    #[test]
    fn tree_strategy_requires_whole_tree_mode() {
        let strategies =
            vec![MigrationStrategy::new(1, Ok).with_version_key("counter.version")];
        let tree = json!({"counter": {"count": 100, "version": 1}});

        assert!(resolve_for_tree(&strategies, &tree, true, &TracingObserver).is_some());
        assert!(resolve_for_tree(&strategies, &tree, false, &TracingObserver).is_none());
    }

    #[test]
    fn scoped_strategy_never_applies_to_tree() {
        let strategies = vec![MigrationStrategy::new(1, Ok).for_fragment("counter")];
        let tree = json!({"version": 1});
        assert!(resolve_for_tree(&strategies, &tree, true, &TracingObserver).is_none());
    }

    #[test]
    fn apply_propagates_transform_failure() {
        let strategy = MigrationStrategy::new(1, |_| {
            Err(MigrationError::new(1, "counter", "missing field"))
        })
        .for_fragment("counter");

        assert!(strategy.apply(json!({"version": 1})).is_err());
    }
}
