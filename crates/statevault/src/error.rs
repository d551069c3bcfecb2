//! Error types for StateVault
//!
//! Provides typed errors for:
//! - Storage engine failures
//! - Codec (serialize/deserialize) failures
//! - Migration transform failures
//! - Configuration violations
//! - Invocation-level synchronizer failures

/// Storage engine errors
///
/// Raised by [`crate::StorageEngine`] / [`crate::AsyncStorageEngine`]
/// implementations. Engine implementors pick the variant that matches the
/// failed operation, or fall back to [`EngineError::Backend`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Reading a key failed
    #[error("read failed for key '{key}': {reason}")]
    Read {
        /// Fragment key being read
        key: String,
        /// Backend-specific reason
        reason: String,
    },

    /// Writing a key failed
    #[error("write failed for key '{key}': {reason}")]
    Write {
        /// Fragment key being written
        key: String,
        /// Backend-specific reason
        reason: String,
    },

    /// Key enumeration (count/key_at) failed
    #[error("key enumeration failed: {0}")]
    Enumeration(String),

    /// Any other backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl EngineError {
    /// Create a read error
    #[inline]
    #[must_use]
    pub fn read(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Read {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a write error
    #[inline]
    #[must_use]
    pub fn write(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Write {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization to the stored representation failed
    #[error("serialize failed: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Deserialization from the stored representation failed
    #[error("deserialize failed: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// The stored representation is a known-invalid marker
    ///
    /// Legacy writers persisted the literal token `undefined` for fragments
    /// that were absent from the state at write time.
    #[error("invalid stored representation: {0}")]
    InvalidRepresentation(String),
}

/// Migration transform errors
///
/// Migration transforms are developer-authored and trusted; their failures
/// are fatal to the invocation rather than degraded to defaults.
#[derive(Debug, thiserror::Error)]
#[error("migration to version {target_version} failed for {scope}: {reason}")]
pub struct MigrationError {
    /// Version the failing strategy targets
    pub target_version: u64,
    /// Fragment key, or "whole tree" for tree-scoped strategies
    pub scope: String,
    /// Transform-specific reason
    pub reason: String,
}

impl MigrationError {
    /// Create a migration error for a fragment-scoped strategy
    #[inline]
    #[must_use]
    pub fn new(target_version: u64, scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target_version,
            scope: scope.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration violations detected when a synchronizer is constructed
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// Scoped mode configured with an empty key list
    #[error("scoped fragment selection requires at least one key")]
    NoFragmentKeys,

    /// A configured fragment key is empty
    #[error("fragment keys must be non-empty")]
    EmptyFragmentKey,

    /// The same fragment key is configured twice
    #[error("duplicate fragment key '{0}'")]
    DuplicateFragmentKey(String),
}

/// Invocation-level synchronizer error
///
/// One `handle` call either yields the next state or exactly one of these.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A storage engine operation failed during hydration
    #[error("storage engine error: {0}")]
    Engine(#[from] EngineError),

    /// A migration transform failed
    #[error("migration failed: {0}")]
    Migration(#[from] MigrationError),

    /// The configuration is invalid
    #[error("invalid options: {0}")]
    Options(#[from] OptionsError),

    /// Serializing a fragment for write-back failed
    ///
    /// Deserialize failures never surface here; they degrade the fragment
    /// to its default during hydration.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The wrapped pipeline continuation failed
    #[error("pipeline continuation failed: {0}")]
    Continuation(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// One or more fragment writes failed during write-back
    ///
    /// Writes are independent; every key is attempted before the failures
    /// are reported together.
    #[error("write-back failed for {} fragment(s)", failures.len())]
    WriteBack {
        /// Failed key with its engine error, in attempt order
        failures: Vec<(String, EngineError)>,
    },
}

impl SyncError {
    /// Wrap a continuation failure
    #[inline]
    pub fn continuation(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Continuation(error.into())
    }

    /// Check whether this error came out of the storage engine
    #[inline]
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::WriteBack { .. })
    }
}
