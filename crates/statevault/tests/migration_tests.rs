//! Migration and write-back policy scenarios.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use statevault::{
    Action, Engine, MigrationError, MigrationStrategy, StateSynchronizer, SyncError, SyncOptions,
};
use statevault_test_utils::{counter_reducer, identity_reducer, FailingEngine, RecordingEngine, TestStore};
use std::sync::Arc;

fn flatten_counter(value: Value) -> Result<Value, MigrationError> {
    let count = value.get("count").and_then(Value::as_u64).unwrap_or(0);
    Ok(json!({"counts": count, "version": 2}))
}

#[tokio::test]
async fn fragment_migration_upgrades_and_persists() {
    let engine = Arc::new(RecordingEngine::new());
    engine.seed_json("counter", &json!({"count": 100, "version": 1}));

    let sync = StateSynchronizer::new(
        Engine::sync(Arc::clone(&engine)),
        SyncOptions::new()
            .with_fragment_key("counter")
            .with_migration(MigrationStrategy::new(1, flatten_counter).for_fragment("counter")),
    )
    .unwrap();
    let mut store = TestStore::new(sync, json!({"counter": {"count": 0}}), identity_reducer);

    store.init().await.unwrap();

    assert_eq!(
        store.fragment("counter"),
        Some(&json!({"counts": 100, "version": 2}))
    );
    assert_eq!(engine.json("counter"), Some(json!({"counts": 100, "version": 2})));
    assert_eq!(engine.writes_for("counter"), 1);
}

#[tokio::test]
async fn migration_writes_only_the_migrated_fragment() {
    let engine = Arc::new(RecordingEngine::new());
    engine.seed_json("counter", &json!({"count": 100, "version": 1}));
    engine.seed_json("settings", &json!({"theme": "dark"}));

    let sync = StateSynchronizer::new(
        Engine::sync(Arc::clone(&engine)),
        SyncOptions::new()
            .with_migration(MigrationStrategy::new(1, flatten_counter).for_fragment("counter")),
    )
    .unwrap();
    let defaults = json!({"counter": {"count": 0}, "settings": {"theme": "light"}});
    let mut store = TestStore::new(sync, defaults, identity_reducer);

    store.init().await.unwrap();

    // Hydrating "settings" alone is no reason to rewrite it.
    assert_eq!(engine.writes_for("counter"), 1);
    assert_eq!(engine.writes_for("settings"), 0);
}

#[tokio::test]
async fn whole_tree_migration_with_nested_version_key() {
    let engine = Arc::new(RecordingEngine::new());
    engine.seed_json("counter", &json!({"count": 100, "version": 1}));

    let migrate_tree = |tree: Value| -> Result<Value, MigrationError> {
        let count = tree
            .get("counter")
            .and_then(|counter| counter.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Ok(json!({"counter": {"counts": count, "version": 2}}))
    };

    let sync = StateSynchronizer::new(
        Engine::sync(Arc::clone(&engine)),
        SyncOptions::new().with_migration(
            MigrationStrategy::new(1, migrate_tree).with_version_key("counter.version"),
        ),
    )
    .unwrap();
    let mut store = TestStore::new(sync, json!({"counter": {"count": 0}}), identity_reducer);

    store.init().await.unwrap();

    assert_eq!(
        store.fragment("counter"),
        Some(&json!({"counts": 100, "version": 2}))
    );
    assert_eq!(engine.json("counter"), Some(json!({"counts": 100, "version": 2})));
}

#[tokio::test]
async fn whole_tree_migration_ignored_in_scoped_mode() {
    let engine = Arc::new(RecordingEngine::new());
    engine.seed_json("counter", &json!({"count": 100, "version": 1}));

    let sync = StateSynchronizer::new(
        Engine::sync(Arc::clone(&engine)),
        SyncOptions::new()
            .with_fragment_key("counter")
            .with_migration(MigrationStrategy::new(1, |tree| Ok(tree)).with_version_key("counter.version")),
    )
    .unwrap();
    let mut store = TestStore::new(sync, json!({"counter": {"count": 0}}), identity_reducer);

    store.init().await.unwrap();

    // The unscoped strategy only applies in whole-tree mode; nothing
    // migrated, nothing written.
    assert_eq!(store.fragment("counter"), Some(&json!({"count": 100, "version": 1})));
    assert_eq!(engine.write_count(), 0);
}

#[tokio::test]
async fn migration_free_lifecycle_writes_nothing() {
    let engine = Arc::new(RecordingEngine::new());
    engine.seed_json("counter", &json!({"count": 100}));
    engine.seed_json("settings", &json!({"theme": "dark"}));

    let sync = StateSynchronizer::new(Engine::sync(Arc::clone(&engine)), SyncOptions::new()).unwrap();
    let defaults = json!({"counter": {"count": 0}, "settings": {"theme": "light"}});
    let mut store = TestStore::new(sync, defaults, identity_reducer);

    store.init().await.unwrap();

    assert_eq!(engine.write_count(), 0);
}

#[tokio::test]
async fn ordinary_action_writes_every_managed_fragment() {
    let engine = Arc::new(RecordingEngine::new());

    let sync = StateSynchronizer::new(Engine::sync(Arc::clone(&engine)), SyncOptions::new()).unwrap();
    let defaults = json!({"counter": {"count": 0}, "settings": {"theme": "light"}});
    let mut store = TestStore::new(sync, defaults, counter_reducer);

    store.dispatch(&Action::new("INCREMENT")).await.unwrap();

    assert_eq!(engine.writes_for("counter"), 1);
    assert_eq!(engine.writes_for("settings"), 1);
    assert_eq!(engine.json("counter"), Some(json!({"count": 1})));
}

#[tokio::test]
async fn migration_transform_failure_is_fatal() {
    let engine = Arc::new(RecordingEngine::new());
    engine.seed_json("counter", &json!({"count": 100, "version": 1}));

    let sync = StateSynchronizer::new(
        Engine::sync(Arc::clone(&engine)),
        SyncOptions::new().with_migration(
            MigrationStrategy::new(1, |_| Err(MigrationError::new(1, "counter", "bad shape")))
                .for_fragment("counter"),
        ),
    )
    .unwrap();
    let mut store = TestStore::new(sync, json!({"counter": {"count": 0}}), identity_reducer);

    let result = store.init().await;
    assert!(matches!(result, Err(SyncError::Migration(_))));
    // Nothing was committed for the failed invocation.
    assert_eq!(store.fragment("counter"), Some(&json!({"count": 0})));
    assert_eq!(engine.write_count(), 0);
}

#[tokio::test]
async fn write_failures_are_attempted_independently_then_reported() {
    let engine = Arc::new(FailingEngine::new());
    engine.fail_writes_on("counter");

    let sync = StateSynchronizer::new(Engine::sync(Arc::clone(&engine)), SyncOptions::new()).unwrap();
    let defaults = json!({"counter": {"count": 0}, "settings": {"theme": "light"}});
    let mut store = TestStore::new(sync, defaults, identity_reducer);

    let result = store.dispatch(&Action::new("TOUCH")).await;

    match result {
        Err(SyncError::WriteBack { failures }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "counter");
        }
        other => panic!("expected write-back failure, got {other:?}"),
    }
    // The independent write still landed.
    assert_eq!(
        engine.raw("settings").as_deref(),
        Some(r#"{"theme":"light"}"#)
    );
}

#[tokio::test]
async fn all_write_failures_are_collected() {
    let engine = Arc::new(FailingEngine::new());
    engine.fail_writes_on("counter");
    engine.fail_writes_on("settings");

    let sync = StateSynchronizer::new(Engine::sync(Arc::clone(&engine)), SyncOptions::new()).unwrap();
    let defaults = json!({"counter": {"count": 0}, "settings": {"theme": "light"}});
    let mut store = TestStore::new(sync, defaults, identity_reducer);

    match store.dispatch(&Action::new("TOUCH")).await {
        Err(SyncError::WriteBack { failures }) => assert_eq!(failures.len(), 2),
        other => panic!("expected write-back failure, got {other:?}"),
    }
}
