use rusqlite::Connection;
use seedbank_core::db::migrations::latest_version;
use seedbank_core::db::{open_db, open_db_in_memory, open_db_with, DbError};
use seedbank_core::model::projection::JUNCTION_TABLES;
use seedbank_core::CoreConfig;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["documents", "revisions", "vegetables", "vegetable_translations"] {
        assert_table_exists(&conn, table);
    }
    for junction in JUNCTION_TABLES {
        assert_table_exists(&conn, junction.table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seedbank.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "revisions");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn open_db_with_config_uses_configured_file_and_enables_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.db");
    let config = CoreConfig {
        database_path: Some(path.clone()),
        busy_timeout_ms: 250,
        ..CoreConfig::default()
    };

    let conn = open_db_with(&config).unwrap();
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
    assert!(path.exists());
}

#[test]
fn revision_evaluation_values_are_constrained() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO documents (id, canonical_snapshot, current_frontier, created_at, updated_at)
         VALUES ('doc', x'00', '[]', 1, 1);",
        [],
    )
    .unwrap();

    let result = conn.execute(
        "INSERT INTO revisions (id, document_id, author_id, crdt_update, evaluation, created_at)
         VALUES ('rev', 'doc', 'author', x'00', 'maybe', 1);",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
