//! Node repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the canonical `nodes` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `NodeRecord::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state (half-present
//!   coordinates) instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::inference::InferenceError;
use crate::model::node::{Coordinate, NodeRecord, NodeValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const NODE_SELECT_SQL: &str = "SELECT filepath, x, y, cdt, mdt, col FROM nodes";

const REQUIRED_NODES_COLUMNS: &[&str] = &["filepath", "x", "y", "cdt", "mdt", "col"];

pub type RepoResult<T> = Result<T, StoreError>;

/// Store-level error for node persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Validation(NodeValidationError),
    Inference(InferenceError),
    /// Duplicate primary key on insert; no write occurred.
    Conflict {
        filepath: String,
    },
    NotFound {
        filepath: String,
    },
    /// A store operation was attempted before any atlas was selected.
    NoAtlasSelected,
    /// Persisted row violates model invariants.
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Inference(err) => write!(f, "{err}"),
            Self::Conflict { filepath } => write!(f, "node already exists: {filepath}"),
            Self::NotFound { filepath } => write!(f, "node not found: {filepath}"),
            Self::NoAtlasSelected => write!(f, "no atlas selected"),
            Self::InvalidData(message) => write!(f, "invalid persisted node data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store connection is not migrated: expected schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "store is missing required table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "store table `{table}` is missing required column `{column}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Inference(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<NodeValidationError> for StoreError {
    fn from(value: NodeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<InferenceError> for StoreError {
    fn from(value: InferenceError) -> Self {
        Self::Inference(value)
    }
}

/// Repository interface for node CRUD operations.
pub trait NodeRepository {
    fn insert_node(&self, node: &NodeRecord) -> RepoResult<()>;
    fn update_node(
        &self,
        filepath: &str,
        coordinate: Option<Coordinate>,
        color_tag: Option<&str>,
        modified_at: &str,
    ) -> RepoResult<NodeRecord>;
    fn get_node(&self, filepath: &str) -> RepoResult<Option<NodeRecord>>;
    /// Removes one node. Returns whether a row was actually deleted.
    fn delete_node(&self, filepath: &str) -> RepoResult<bool>;
    /// Streams every node in primary-key order without materializing the
    /// full set; `list_nodes` is built on top of this.
    fn for_each_node(&self, visit: &mut dyn FnMut(NodeRecord)) -> RepoResult<()>;
    fn list_nodes(&self) -> RepoResult<Vec<NodeRecord>>;
}

/// SQLite-backed node repository.
pub struct SqliteNodeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNodeRepository<'conn> {
    /// Wraps a connection after verifying it carries a migrated `nodes`
    /// schema. Rejecting early keeps corrupt stores diagnosable.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version =
            conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
        if actual_version == 0 {
            return Err(StoreError::UninitializedConnection {
                expected_version: latest_version(),
                actual_version,
            });
        }

        let mut stmt = conn.prepare("PRAGMA table_info(nodes);")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<HashSet<String>, _>>()?;
        if columns.is_empty() {
            return Err(StoreError::MissingRequiredTable("nodes"));
        }
        for column in REQUIRED_NODES_COLUMNS {
            if !columns.contains(*column) {
                return Err(StoreError::MissingRequiredColumn {
                    table: "nodes",
                    column,
                });
            }
        }

        Ok(Self { conn })
    }
}

impl NodeRepository for SqliteNodeRepository<'_> {
    fn insert_node(&self, node: &NodeRecord) -> RepoResult<()> {
        node.validate()?;

        let result = self.conn.execute(
            "INSERT INTO nodes (filepath, x, y, cdt, mdt, col)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                node.filepath.as_str(),
                node.coordinate.map(|c| c.x),
                node.coordinate.map(|c| c.y),
                node.created_at.as_str(),
                node.modified_at.as_str(),
                node.color_tag.as_str(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            // Only a duplicate primary key is a Conflict; other constraint
            // violations must keep their own diagnosis.
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(StoreError::Conflict {
                    filepath: node.filepath.clone(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_node(
        &self,
        filepath: &str,
        coordinate: Option<Coordinate>,
        color_tag: Option<&str>,
        modified_at: &str,
    ) -> RepoResult<NodeRecord> {
        if let Some(coordinate) = &coordinate {
            if !coordinate.is_finite() {
                return Err(NodeValidationError::NonFiniteCoordinate(
                    filepath.to_string(),
                )
                .into());
            }
        }

        let mut sql = "UPDATE nodes SET mdt = ?".to_string();
        let mut bind_values: Vec<Value> = vec![Value::Text(modified_at.to_string())];

        if let Some(coordinate) = coordinate {
            sql.push_str(", x = ?, y = ?");
            bind_values.push(Value::Real(coordinate.x));
            bind_values.push(Value::Real(coordinate.y));
        }
        if let Some(color_tag) = color_tag {
            sql.push_str(", col = ?");
            bind_values.push(Value::Text(color_tag.to_string()));
        }

        sql.push_str(" WHERE filepath = ?;");
        bind_values.push(Value::Text(filepath.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                filepath: filepath.to_string(),
            });
        }

        match self.get_node(filepath)? {
            Some(node) => Ok(node),
            None => Err(StoreError::NotFound {
                filepath: filepath.to_string(),
            }),
        }
    }

    fn get_node(&self, filepath: &str) -> RepoResult<Option<NodeRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NODE_SELECT_SQL} WHERE filepath = ?1;"))?;

        let mut rows = stmt.query(params![filepath])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_node_row(row)?));
        }
        Ok(None)
    }

    fn delete_node(&self, filepath: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM nodes WHERE filepath = ?1;", params![filepath])?;
        Ok(changed > 0)
    }

    fn for_each_node(&self, visit: &mut dyn FnMut(NodeRecord)) -> RepoResult<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NODE_SELECT_SQL} ORDER BY filepath ASC;"))?;

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            visit(parse_node_row(row)?);
        }
        Ok(())
    }

    fn list_nodes(&self) -> RepoResult<Vec<NodeRecord>> {
        let mut nodes = Vec::new();
        self.for_each_node(&mut |node| nodes.push(node))?;
        Ok(nodes)
    }
}

fn parse_node_row(row: &Row<'_>) -> RepoResult<NodeRecord> {
    let filepath: String = row.get("filepath")?;
    let x: Option<f64> = row.get("x")?;
    let y: Option<f64> = row.get("y")?;

    let coordinate = match (x, y) {
        (Some(x), Some(y)) => Some(Coordinate::new(x, y)),
        (None, None) => None,
        _ => {
            return Err(StoreError::InvalidData(format!(
                "half-present coordinate for node `{filepath}`"
            )));
        }
    };

    let node = NodeRecord {
        filepath,
        coordinate,
        created_at: row.get("cdt")?,
        modified_at: row.get("mdt")?,
        color_tag: row.get("col")?,
    };
    node.validate()
        .map_err(|err| StoreError::InvalidData(err.to_string()))?;
    Ok(node)
}
