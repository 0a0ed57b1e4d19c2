use knoto_core::db::migrations::latest_version;
use knoto_core::db::open_db_in_memory;
use knoto_core::{Coordinate, NodeRecord, NodeRepository, SqliteNodeRepository, StoreError};
use rusqlite::Connection;

const T0: &str = "2026-01-01T00:00:00.000000Z";
const T1: &str = "2026-01-01T00:00:01.000000Z";

fn placed_node(filepath: &str) -> NodeRecord {
    NodeRecord::new(filepath, Some(Coordinate::new(0.25, 0.75)), "blue", T0)
}

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();

    let node = placed_node("notes/a.md");
    repo.insert_node(&node).unwrap();

    let loaded = repo.get_node("notes/a.md").unwrap().unwrap();
    assert_eq!(loaded, node);
}

#[test]
fn insert_duplicate_filepath_is_conflict_and_keeps_single_record() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();

    repo.insert_node(&placed_node("notes/a.md")).unwrap();
    let err = repo.insert_node(&placed_node("notes/a.md")).unwrap_err();
    assert!(matches!(err, StoreError::Conflict { filepath } if filepath == "notes/a.md"));

    assert_eq!(repo.list_nodes().unwrap().len(), 1);
}

#[test]
fn deferred_node_roundtrips_without_coordinate() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();

    let node = NodeRecord::new("notes/pending.md", None, "gray", T0);
    repo.insert_node(&node).unwrap();

    let loaded = repo.get_node("notes/pending.md").unwrap().unwrap();
    assert!(loaded.is_pending_placement());
}

#[test]
fn update_touches_only_supplied_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();

    repo.insert_node(&placed_node("notes/a.md")).unwrap();

    let updated = repo
        .update_node("notes/a.md", Some(Coordinate::new(0.1, 0.9)), None, T1)
        .unwrap();
    assert_eq!(updated.coordinate, Some(Coordinate::new(0.1, 0.9)));
    assert_eq!(updated.color_tag, "blue");
    assert_eq!(updated.created_at, T0);
    assert_eq!(updated.modified_at, T1);

    let recolored = repo
        .update_node("notes/a.md", None, Some("green"), T1)
        .unwrap();
    assert_eq!(recolored.coordinate, Some(Coordinate::new(0.1, 0.9)));
    assert_eq!(recolored.color_tag, "green");
}

#[test]
fn update_missing_node_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();

    let err = repo
        .update_node("notes/missing.md", None, Some("green"), T1)
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { filepath } if filepath == "notes/missing.md"));
}

#[test]
fn delete_reports_whether_a_row_was_removed() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();

    repo.insert_node(&placed_node("notes/a.md")).unwrap();
    assert!(repo.delete_node("notes/a.md").unwrap());
    assert!(!repo.delete_node("notes/a.md").unwrap());
    assert!(repo.get_node("notes/a.md").unwrap().is_none());
}

#[test]
fn list_returns_primary_key_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();

    repo.insert_node(&placed_node("notes/c.md")).unwrap();
    repo.insert_node(&placed_node("notes/a.md")).unwrap();
    repo.insert_node(&placed_node("notes/b.md")).unwrap();

    let paths: Vec<String> = repo
        .list_nodes()
        .unwrap()
        .into_iter()
        .map(|node| node.filepath)
        .collect();
    assert_eq!(paths, vec!["notes/a.md", "notes/b.md", "notes/c.md"]);
}

#[test]
fn half_present_coordinate_is_rejected_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO nodes (filepath, x, y, cdt, mdt, col)
         VALUES ('notes/broken.md', 0.5, NULL, ?1, ?1, 'blue');",
        [T0],
    )
    .unwrap();

    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let err = repo.get_node("notes/broken.md").unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

#[test]
fn non_primary_key_constraint_violation_is_not_a_conflict() {
    // A schema variant with an extra CHECK constraint still passes the
    // column guard; violating that constraint must surface as a Db
    // error, not masquerade as a duplicate key.
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE nodes (
            filepath TEXT PRIMARY KEY NOT NULL,
            x REAL,
            y REAL,
            cdt TEXT NOT NULL,
            mdt TEXT NOT NULL,
            col TEXT NOT NULL CHECK (col <> 'forbidden')
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let node = NodeRecord::new("notes/a.md", Some(Coordinate::new(0.0, 0.0)), "forbidden", T0);
    let err = repo.insert_node(&node).unwrap_err();
    assert!(matches!(err, StoreError::Db(_)));
}

#[test]
fn validation_failure_blocks_insert() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();

    let node = NodeRecord::new("  ", Some(Coordinate::new(0.0, 0.0)), "blue", T0);
    let err = repo.insert_node(&node).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(repo.list_nodes().unwrap().is_empty());
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteNodeRepository::try_new(&conn) {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_nodes_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteNodeRepository::try_new(&conn);
    assert!(matches!(result, Err(StoreError::MissingRequiredTable("nodes"))));
}

#[test]
fn repository_rejects_nodes_table_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE nodes (
            filepath TEXT PRIMARY KEY NOT NULL,
            x REAL,
            y REAL,
            cdt TEXT NOT NULL,
            mdt TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteNodeRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredColumn {
            table: "nodes",
            column: "col"
        })
    ));
}
