use imsreg_core::db::migrations::{current_user_version, latest_version};
use imsreg_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

const REGISTER_TABLES: [&str; 10] = [
    "users",
    "interested_parties",
    "organizational_context",
    "improvements",
    "maintenance_items",
    "audits",
    "audit_documents",
    "documents",
    "legal_register",
    "legal_register_reviews",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(latest_version(), 2);
    assert_eq!(schema_version(&conn), latest_version());
    for table in REGISTER_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn foreign_keys_are_enabled() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imsreg.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn_second).unwrap(), latest_version());
    assert_table_exists(&conn_second, "legal_register");
}

#[test]
fn database_at_first_version_is_upgraded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_registers.sql"))
        .unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    drop(conn);

    let upgraded = open_db(&path).unwrap();
    assert_eq!(schema_version(&upgraded), latest_version());
    assert_table_exists(&upgraded, "legal_register_reviews");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

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
