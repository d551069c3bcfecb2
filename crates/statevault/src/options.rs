//! Synchronizer configuration
//!
//! [`SyncOptions`] describes which fragments to hydrate and persist, the
//! codec for their stored representation, the configured migrations, and
//! the lifecycle-action matcher. Validated once when the synchronizer is
//! constructed.

use crate::action::{default_lifecycle_matcher, LifecycleMatcher};
use crate::codec::{Codec, JsonCodec};
use crate::error::OptionsError;
use crate::migration::MigrationStrategy;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Which fragments the synchronizer manages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentSelector {
    /// Every top-level key of the state tree at invocation time
    WholeTree,
    /// An explicit list of fragment keys, in configured order
    Keys(Vec<String>),
}

impl FragmentSelector {
    /// Whether this selector covers the whole tree
    #[inline]
    #[must_use]
    pub fn is_whole_tree(&self) -> bool {
        matches!(self, Self::WholeTree)
    }

    /// The fragment key set for one invocation
    ///
    /// Whole-tree mode reads the tree's top-level names in insertion
    /// order; scoped mode returns the configured list. Stable across the
    /// hydrate and write-back phases of the same invocation.
    #[must_use]
    pub fn keys_for(&self, state: &Value) -> Vec<String> {
        match self {
            Self::WholeTree => state
                .as_object()
                .map(|map| map.keys().cloned().collect())
                .unwrap_or_default(),
            Self::Keys(keys) => keys.clone(),
        }
    }
}

/// Resolved synchronizer configuration
#[derive(Clone)]
pub struct SyncOptions {
    selector: FragmentSelector,
    codec: Arc<dyn Codec>,
    migrations: Vec<MigrationStrategy>,
    lifecycle_matcher: LifecycleMatcher,
}

impl SyncOptions {
    /// Default configuration: whole tree, JSON codec, no migrations
    #[must_use]
    pub fn new() -> Self {
        Self {
            selector: FragmentSelector::WholeTree,
            codec: Arc::new(JsonCodec::new()),
            migrations: Vec::new(),
            lifecycle_matcher: default_lifecycle_matcher(),
        }
    }

    /// Manage a single fragment key
    #[inline]
    #[must_use]
    pub fn with_fragment_key(self, key: impl Into<String>) -> Self {
        self.with_fragment_keys(vec![key.into()])
    }

    /// Manage an explicit list of fragment keys
    #[inline]
    #[must_use]
    pub fn with_fragment_keys(mut self, keys: Vec<String>) -> Self {
        self.selector = FragmentSelector::Keys(keys);
        self
    }

    /// Replace the codec
    #[inline]
    #[must_use]
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Replace the migration list
    #[inline]
    #[must_use]
    pub fn with_migrations(mut self, migrations: Vec<MigrationStrategy>) -> Self {
        self.migrations = migrations;
        self
    }

    /// Append one migration strategy
    #[inline]
    #[must_use]
    pub fn with_migration(mut self, migration: MigrationStrategy) -> Self {
        self.migrations.push(migration);
        self
    }

    /// Replace the lifecycle-action matcher
    #[inline]
    #[must_use]
    pub fn with_lifecycle_matcher(mut self, matcher: LifecycleMatcher) -> Self {
        self.lifecycle_matcher = matcher;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`OptionsError`] for an empty scoped key list, empty keys,
    /// or duplicate keys.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if let FragmentSelector::Keys(keys) = &self.selector {
            if keys.is_empty() {
                return Err(OptionsError::NoFragmentKeys);
            }
            let mut seen = HashSet::new();
            for key in keys {
                if key.is_empty() {
                    return Err(OptionsError::EmptyFragmentKey);
                }
                if !seen.insert(key.as_str()) {
                    return Err(OptionsError::DuplicateFragmentKey(key.clone()));
                }
            }
        }
        Ok(())
    }

    /// Fragment selector
    #[inline]
    #[must_use]
    pub fn selector(&self) -> &FragmentSelector {
        &self.selector
    }

    /// Configured codec
    #[inline]
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    /// Configured migrations, in resolution order
    #[inline]
    #[must_use]
    pub fn migrations(&self) -> &[MigrationStrategy] {
        &self.migrations
    }

    /// Lifecycle-action matcher
    #[inline]
    #[must_use]
    pub fn lifecycle_matcher(&self) -> &LifecycleMatcher {
        &self.lifecycle_matcher
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("selector", &self.selector)
            .field("codec", &self.codec)
            .field("migrations", &self.migrations)
            .finish_non_exhaustive()
    }
}
