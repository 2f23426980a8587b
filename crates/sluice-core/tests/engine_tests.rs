mod common;

use std::{sync::Arc, thread};

use common::{create_initialized_instance, create_test_instance};
use rusqlite::Connection;
use sluice_core::{
    history::{HistoryStore, HISTORY_TABLE},
    ExecutionOutcome, LogMessage, SluiceError,
};

const RELEASE_1: &[(i32, &str, &str)] = &[
    (
        100,
        "100-customers",
        "CREATE TABLE customers (\n    id INTEGER PRIMARY KEY,\n    name TEXT NOT NULL\n)\nGO\nCREATE INDEX ix_customers_name ON customers (name)\nGO\n",
    ),
    (
        110,
        "110-orders",
        "CREATE TABLE orders (\n    id INTEGER PRIMARY KEY,\n    customer_id INTEGER REFERENCES customers (id)\n)\ngo\n",
    ),
    (
        120,
        "120-seed",
        "INSERT INTO customers (name) VALUES ('acme')\nGO\nINSERT INTO customers (name) VALUES ('globex')\n",
    ),
];

#[test]
fn test_full_release_workflow() {
    let instance = create_initialized_instance();
    let (registry, handle) = (&instance.registry, instance.handle);

    for (script_id, name, text) in RELEASE_1 {
        let result = registry
            .execute_change_script(handle, 1, *script_id, name, text)
            .expect("Failed to execute script");
        assert_eq!(result.outcome, ExecutionOutcome::Success, "{}", result.message);
    }

    assert_eq!(registry.schema_version(handle).unwrap(), 1);
    let history = registry.change_history(handle).unwrap();
    let names: Vec<_> = history.iter().map(|s| s.batch_name.as_str()).collect();
    assert_eq!(names, vec!["100-customers", "110-orders", "120-seed"]);
    assert!(history.iter().all(|s| s.success));

    // Running the whole release again is a no-op.
    for (script_id, name, text) in RELEASE_1 {
        let result = registry
            .execute_change_script(handle, 1, *script_id, name, text)
            .unwrap();
        assert_eq!(result.outcome, ExecutionOutcome::Skipped);
    }
    assert_eq!(registry.change_history(handle).unwrap(), history);
}

#[test]
fn test_history_is_append_only() {
    let instance = create_initialized_instance();
    instance
        .registry
        .execute_change_script(instance.handle, 1, 1, "001", "CREATE TABLE t (v)")
        .unwrap();

    let conn = Connection::open(instance.db_path()).unwrap();
    let update = conn.execute(
        &format!("UPDATE {HISTORY_TABLE} SET Success_Indicator = 'N'"),
        [],
    );
    assert!(update.is_err());
    let delete = conn.execute(&format!("DELETE FROM {HISTORY_TABLE}"), []);
    assert!(delete.is_err());

    let store = HistoryStore::new(&conn);
    assert_eq!(store.statement_records(1).unwrap().len(), 1);
}

#[test]
fn test_history_written_by_hand_is_honoured() {
    let instance = create_initialized_instance();

    let conn = Connection::open(instance.db_path()).unwrap();
    HistoryStore::new(&conn)
        .record_statement(5, 500, 1, "500-applied-elsewhere", true)
        .unwrap();

    let result = instance
        .registry
        .execute_change_script(instance.handle, 5, 500, "500-applied-elsewhere", "CREATE TABLE x (v)")
        .unwrap();
    assert_eq!(result.outcome, ExecutionOutcome::Skipped);
    assert_eq!(instance.registry.schema_version(instance.handle).unwrap(), 5);
}

#[test]
fn test_concurrent_callers_share_one_instance() {
    let instance = create_initialized_instance();
    let registry = instance.registry.clone();
    let handle = instance.handle;

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let registry = registry.clone();
            thread::spawn(move || {
                let script_id = 1000 + worker;
                let text = format!("CREATE TABLE worker_{worker} (v)");
                registry
                    .execute_change_script(handle, 2, script_id, &format!("worker-{worker}"), &text)
                    .expect("Failed to execute script")
            })
        })
        .collect();

    for worker in workers {
        let result = worker.join().expect("worker panicked");
        assert_eq!(result.outcome, ExecutionOutcome::Success);
    }

    let engine = registry.get(handle).unwrap();
    assert_eq!(engine.usage().usage_count(), 0);
    assert!(engine.usage().is_idle_timer_armed());
    assert_eq!(registry.change_history(handle).unwrap().len(), 4);
}

#[test]
fn test_persistent_connection_supports_transactions() {
    let instance = create_test_instance();
    let (registry, handle) = (&instance.registry, instance.handle);

    registry
        .execute_query(handle, "CREATE TABLE ledger (amount INTEGER)")
        .unwrap();
    registry.open_connection(handle).unwrap();

    registry.execute_query(handle, "BEGIN").unwrap();
    registry
        .execute_query(handle, "INSERT INTO ledger VALUES (10)\nGO\nINSERT INTO ledger VALUES (20)")
        .unwrap();
    registry.execute_query(handle, "ROLLBACK").unwrap();

    registry
        .execute_query(handle, "INSERT INTO ledger SELECT COUNT(*) FROM ledger")
        .unwrap();
    registry.close_connection(handle).unwrap();

    let conn = Connection::open(instance.db_path()).unwrap();
    let rows: Vec<i64> = conn
        .prepare("SELECT amount FROM ledger")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, vec![0]);
}

#[test]
fn test_query_output_is_returned_in_order() {
    let instance = create_test_instance();

    let messages = instance
        .registry
        .execute_queries(
            instance.handle,
            &[
                "CREATE TABLE notes (v)\nGO\nINSERT INTO notes SELECT print('one')",
                "INSERT INTO notes SELECT raise_message(16, 'two')",
                "INSERT INTO notes SELECT raise_message(1, 'three')",
            ],
        )
        .unwrap();

    assert_eq!(
        messages,
        vec![
            LogMessage::information("one"),
            LogMessage::error("two"),
            LogMessage::information("three"),
        ]
    );
}

#[test]
fn test_backup_restore_through_registry() {
    let instance = create_initialized_instance();
    let (registry, handle) = (&instance.registry, instance.handle);
    registry
        .execute_change_script(handle, 1, 1, "001", "CREATE TABLE keep (v)")
        .unwrap();

    let backup = instance.temp_dir.path().join("snapshot.db");
    registry.backup_database(handle, "main", &backup).unwrap();
    registry
        .execute_change_script(handle, 2, 2, "002", "CREATE TABLE discard (v)")
        .unwrap();

    registry.restore_database(handle, "main", &backup).unwrap();
    let history = registry.change_history(handle).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].script_id, 1);
}

#[test]
fn test_unknown_handle_is_reported() {
    let instance = create_test_instance();
    instance.registry.dispose(instance.handle);

    let err = instance
        .registry
        .validate_connection(instance.handle)
        .unwrap_err();
    assert!(matches!(err, SluiceError::InstanceNotFound { .. }));
}

#[test]
fn test_engine_handle_outlives_registry_entry() {
    let instance = create_test_instance();
    let engine: Arc<_> = instance.registry.get(instance.handle).unwrap();

    instance.registry.dispose(instance.handle);
    assert!(matches!(engine.schema_version(), Err(SluiceError::Disposed)));
}
