//! Node domain model.
//!
//! # Responsibility
//! - Define the canonical record for one note placement in an atlas.
//! - Provide creation helpers and write-path validation.
//!
//! # Invariants
//! - `filepath` is the stable key; unique within one atlas store.
//! - `coordinate` is fully present or fully absent, never one axis.
//! - `modified_at >= created_at` for every persisted record.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// 2D placement inside the atlas display range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Canonical persisted record for one note and its placement.
///
/// Field renames match the external wire/storage naming (`pos`, `cdt`,
/// `mdt`, `col`) used by the frontend and the SQLite schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Logical path of the note; primary key within one atlas.
    pub filepath: String,
    /// Present only after successful inference. `None` means the node is
    /// awaiting placement (deferred inference).
    #[serde(rename = "pos")]
    pub coordinate: Option<Coordinate>,
    /// ISO-8601 creation timestamp, set once.
    #[serde(rename = "cdt")]
    pub created_at: String,
    /// ISO-8601 timestamp of the last mutation.
    #[serde(rename = "mdt")]
    pub modified_at: String,
    /// Categorical display tag. Any string is legal.
    #[serde(rename = "col")]
    pub color_tag: String,
}

/// Validation failures for node write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValidationError {
    EmptyFilepath,
    NonFiniteCoordinate(String),
    EmptyTimestamp(&'static str),
}

impl Display for NodeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFilepath => write!(f, "node filepath must not be empty"),
            Self::NonFiniteCoordinate(filepath) => {
                write!(f, "node coordinate must be finite: {filepath}")
            }
            Self::EmptyTimestamp(field) => write!(f, "node timestamp `{field}` must not be empty"),
        }
    }
}

impl Error for NodeValidationError {}

impl NodeRecord {
    /// Creates a record with equal creation/modification timestamps.
    ///
    /// The caller supplies the timestamp so one clock read covers both
    /// fields and batch items can share ordering decisions.
    pub fn new(
        filepath: impl Into<String>,
        coordinate: Option<Coordinate>,
        color_tag: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        let timestamp = timestamp.into();
        Self {
            filepath: filepath.into(),
            coordinate,
            created_at: timestamp.clone(),
            modified_at: timestamp,
            color_tag: color_tag.into(),
        }
    }

    /// Validates write-path invariants.
    pub fn validate(&self) -> Result<(), NodeValidationError> {
        if self.filepath.trim().is_empty() {
            return Err(NodeValidationError::EmptyFilepath);
        }
        if let Some(coordinate) = &self.coordinate {
            if !coordinate.is_finite() {
                return Err(NodeValidationError::NonFiniteCoordinate(
                    self.filepath.clone(),
                ));
            }
        }
        if self.created_at.trim().is_empty() {
            return Err(NodeValidationError::EmptyTimestamp("created_at"));
        }
        if self.modified_at.trim().is_empty() {
            return Err(NodeValidationError::EmptyTimestamp("modified_at"));
        }
        Ok(())
    }

    /// Returns whether this node still awaits placement.
    pub fn is_pending_placement(&self) -> bool {
        self.coordinate.is_none()
    }
}
