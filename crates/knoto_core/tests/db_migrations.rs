use knoto_core::db::migrations::latest_version;
use knoto_core::db::{open_db, DbError};

fn user_version(conn: &rusqlite::Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn fresh_store_is_migrated_to_latest_version() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("atlas.db")).unwrap();

    assert_eq!(user_version(&conn), latest_version());

    // The nodes table is queryable immediately after open.
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM nodes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn reopening_a_migrated_store_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atlas.db");

    drop(open_db(&path).unwrap());
    let conn = open_db(&path).unwrap();
    assert_eq!(user_version(&conn), latest_version());
}

#[test]
fn store_newer_than_binary_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atlas.db");

    let conn = open_db(&path).unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version() + 1))
        .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion { db_version, latest_supported }
            if db_version == latest_version() + 1 && latest_supported == latest_version()
    ));
}
