//! StateVault — state-tree persistence middleware
//!
//! Keeps an in-memory, tree-shaped application state synchronized with a
//! pluggable key-value engine. On lifecycle actions (store init, state
//! replacement) it rehydrates named fragments from storage, applying
//! version-aware migrations to stale data before merging it into the live
//! tree; after every state-changing action it re-serializes the affected
//! fragments and writes them back.
//!
//! # Core Concepts
//!
//! - [`StateSynchronizer`]: the orchestrator, shaped like the pipeline
//!   stage it wraps
//! - [`StorageEngine`] / [`AsyncStorageEngine`]: the engine capability
//!   sets, unified through [`Engine`] and [`SyncEngineAdapter`]
//! - [`MigrationStrategy`]: version-aware upgrades for stale persisted data
//! - [`Codec`]: pluggable serialize/deserialize pair, [`JsonCodec`] default
//! - [`SyncOptions`]: fragment selection, codec, migrations, matcher
//! - [`SyncObserver`]: structured channel for recoverable events
//!
//! # Example
//!
//! ```rust,ignore
//! use statevault::{Action, Engine, StateSynchronizer, SyncOptions};
//!
//! let sync = StateSynchronizer::new(
//!     Engine::sync(my_engine),
//!     SyncOptions::new().with_fragment_key("counter"),
//! )?;
//!
//! // First dispatch hydrates "counter" from storage.
//! let state = sync.handle(initial_state, &Action::init(), reduce).await?;
//! ```

mod action;
mod adapter;
mod codec;
mod engine;
mod error;
mod keypath;
mod migration;
mod observer;
mod options;
mod synchronizer;

// Re-exports
pub use action::{
    default_lifecycle_matcher, Action, LifecycleMatcher, INIT_KIND, UPDATE_KIND,
};
pub use adapter::SyncEngineAdapter;
pub use codec::{Codec, JsonCodec};
pub use engine::{AsyncStorageEngine, Engine, StorageEngine};
pub use error::{CodecError, EngineError, MigrationError, OptionsError, SyncError};
pub use keypath::{get_path, set_path};
pub use migration::{MigrateFn, MigrationStrategy, DEFAULT_VERSION_KEY};
pub use observer::{SyncObserver, TracingObserver};
pub use options::{FragmentSelector, SyncOptions};
pub use synchronizer::{Next, PipelineStage, StateSynchronizer};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
