use dit_core::db::migrations::latest_version;
use dit_core::db::{open_db, open_db_in_memory, DbError};
use dit_core::{SqliteTodoStore, StoreError, TodoStore};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "todos");
    assert_index_exists(&conn, "idx_todos_done_updated_at");
}

#[test]
fn reopening_file_database_keeps_todos() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dit.sqlite3");

    let id = {
        let conn = open_db(&path).unwrap();
        let store = SqliteTodoStore::try_new(&conn).unwrap();
        let todo = store.create_todo("persist me", 1_000).unwrap();
        store.set_done(todo.id, true, 2_000).unwrap();
        todo.id
    };

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let store = SqliteTodoStore::try_new(&conn).unwrap();
    let loaded = store.get_todo(id).unwrap().unwrap();
    assert!(loaded.is_done);
    assert_eq!(loaded.updated_at, 2_000);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
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
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteTodoStore::try_new(&conn).err().unwrap();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

#[test]
fn schema_rejects_updated_before_created() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO todos (uuid, text, is_done, created_at, updated_at)
         VALUES ('11111111-2222-4333-8444-555555555555', 'x', 0, 10, 5);",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn corrupt_row_is_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO todos (uuid, text, is_done, created_at, updated_at)
         VALUES ('not-a-uuid', 'x', 1, 1, 5);",
        [],
    )
    .unwrap();

    let store = SqliteTodoStore::try_new(&conn).unwrap();
    let err = store.query_done_between(0, 10).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_master_entry(conn, "table", table_name);
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert_master_entry(conn, "index", index_name);
}

fn assert_master_entry(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
