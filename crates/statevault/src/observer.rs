//! Observation channel for recoverable events
//!
//! Deserialization failures degrade the affected fragment to its default
//! instead of failing the invocation; ambiguous migration configuration is
//! resolved first-match-wins. Both still deserve visibility, so they are
//! reported through an injectable [`SyncObserver`] rather than written to a
//! console. The default observer forwards to `tracing`.

use crate::error::CodecError;

/// Receiver for recoverable synchronizer events
///
/// All methods have default no-consequence semantics: observing never
/// changes what the synchronizer does, only what the host learns about it.
pub trait SyncObserver: Send + Sync + std::fmt::Debug {
    /// A persisted record failed to deserialize and falls back to defaults
    fn deserialize_error(&self, key: &str, error: &CodecError) {
        tracing::warn!(fragment = key, %error, "persisted record unreadable, using defaults");
    }

    /// Several migration strategies matched one candidate; the first won
    fn ambiguous_migrations(&self, key: Option<&str>, matched: usize) {
        tracing::warn!(
            fragment = key.unwrap_or("<whole tree>"),
            matched,
            "multiple migration strategies matched, first in list order wins"
        );
    }

    /// A fragment's persisted value was upgraded by a migration
    fn fragment_migrated(&self, key: &str, target_version: u64) {
        tracing::debug!(fragment = key, target_version, "fragment migrated");
    }
}

/// Default observer reporting through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {}
