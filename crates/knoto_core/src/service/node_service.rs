//! Node store use-case service.
//!
//! # Responsibility
//! - Provide the stable node CRUD entry points for core callers.
//! - Run inference before persistence so a failed placement never writes
//!   a partial record.
//!
//! # Invariants
//! - All persisted-state access goes through the atlas registry lock.
//! - `created_at` is immutable; `modified_at` strictly increases on every
//!   update, even under clock-resolution collisions.
//! - Batch inserts are continue-and-collect; prior successes stay
//!   committed.

use crate::atlas::registry::AtlasRegistry;
use crate::inference::pipeline::CoordinateInference;
use crate::model::node::{Coordinate, NodeRecord};
use crate::repo::node_repo::{NodeRepository, RepoResult, SqliteNodeRepository, StoreError};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

/// One insert request: the note text to place plus its record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub filepath: String,
    pub text: String,
    pub color_tag: String,
}

/// Per-item result of a batch insert, in input order.
#[derive(Debug)]
pub struct BatchItemOutcome {
    pub filepath: String,
    pub outcome: Result<NodeRecord, StoreError>,
}

/// Node CRUD service addressing whichever atlas is currently selected.
pub struct NodeService {
    registry: Arc<AtlasRegistry>,
    inference: Arc<dyn CoordinateInference>,
}

impl NodeService {
    pub fn new(registry: Arc<AtlasRegistry>, inference: Arc<dyn CoordinateInference>) -> Self {
        Self {
            registry,
            inference,
        }
    }

    /// Infers a placement for `text` and persists the node.
    ///
    /// Inference runs outside the registry lock so CPU-bound encoding
    /// never blocks concurrent store operations. Duplicate `filepath`
    /// fails with `Conflict` and writes nothing; an inference failure
    /// writes nothing.
    pub fn insert(&self, text: &str, filepath: &str, color_tag: &str) -> RepoResult<NodeRecord> {
        let coordinate = self.inference.infer(text).map_err(|err| {
            warn!(
                "event=node_insert module=service status=error error_code=inference_failed filepath={filepath} error={err}"
            );
            StoreError::from(err)
        })?;
        self.persist_new(NodeRecord::new(
            filepath,
            Some(coordinate),
            color_tag,
            now_timestamp(),
        ))
    }

    /// Persists a node without a placement; the caller explicitly defers
    /// inference and supplies the coordinate via a later `update`.
    pub fn insert_deferred(&self, filepath: &str, color_tag: &str) -> RepoResult<NodeRecord> {
        self.persist_new(NodeRecord::new(filepath, None, color_tag, now_timestamp()))
    }

    /// Applies `insert` to each item in input order.
    ///
    /// Continue-and-collect: one failing item is reported in place and
    /// does not abort its siblings. The batch is not atomic as a whole.
    pub fn insert_batch(&self, items: Vec<NewNode>) -> Vec<BatchItemOutcome> {
        items
            .into_iter()
            .map(|item| {
                let outcome = self.insert(&item.text, &item.filepath, &item.color_tag);
                BatchItemOutcome {
                    filepath: item.filepath,
                    outcome,
                }
            })
            .collect()
    }

    /// Mutates only the supplied fields and refreshes `modified_at`.
    ///
    /// Fails with `NotFound` for a missing key. `created_at` and
    /// `filepath` are never touched.
    pub fn update(
        &self,
        filepath: &str,
        new_coordinate: Option<Coordinate>,
        new_color_tag: Option<&str>,
    ) -> RepoResult<NodeRecord> {
        let updated = self.registry.with_conn(|conn| {
            let repo = SqliteNodeRepository::try_new(conn)?;
            let existing = repo
                .get_node(filepath)?
                .ok_or_else(|| StoreError::NotFound {
                    filepath: filepath.to_string(),
                })?;
            let modified_at = timestamp_after(&existing.modified_at)?;
            repo.update_node(filepath, new_coordinate, new_color_tag, &modified_at)
        })?;

        info!("event=node_update module=service status=ok filepath={filepath}");
        Ok(updated)
    }

    /// Removes one node. Deleting an absent key is a no-op success,
    /// logged so caller bugs stay diagnosable.
    pub fn delete(&self, filepath: &str) -> RepoResult<()> {
        let removed = self
            .registry
            .with_conn(|conn| SqliteNodeRepository::try_new(conn)?.delete_node(filepath))?;

        if removed {
            info!("event=node_delete module=service status=ok filepath={filepath}");
        } else {
            debug!("event=node_delete module=service status=noop filepath={filepath}");
        }
        Ok(())
    }

    /// Returns every node of the current atlas in primary-key order.
    ///
    /// With no atlas selected this returns an empty set rather than an
    /// error, matching the read-path contract.
    pub fn get_all(&self) -> RepoResult<Vec<NodeRecord>> {
        match self
            .registry
            .with_conn(|conn| SqliteNodeRepository::try_new(conn)?.list_nodes())
        {
            Ok(nodes) => Ok(nodes),
            Err(StoreError::NoAtlasSelected) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// Streaming variant of `get_all` for large atlases: visits rows one
    /// by one without materializing the full set.
    pub fn for_each(&self, visit: &mut dyn FnMut(NodeRecord)) -> RepoResult<()> {
        match self
            .registry
            .with_conn(|conn| SqliteNodeRepository::try_new(conn)?.for_each_node(visit))
        {
            Ok(()) => Ok(()),
            Err(StoreError::NoAtlasSelected) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn persist_new(&self, record: NodeRecord) -> RepoResult<NodeRecord> {
        record.validate()?;
        self.registry
            .with_conn(|conn| SqliteNodeRepository::try_new(conn)?.insert_node(&record))?;
        info!(
            "event=node_insert module=service status=ok filepath={} pending={}",
            record.filepath,
            record.is_pending_placement()
        );
        Ok(record)
    }
}

/// Current UTC time as an ISO-8601 string with microsecond precision.
///
/// The fixed format makes lexicographic comparison agree with
/// chronological order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Returns a timestamp strictly after `previous`.
///
/// Uses `previous + 1µs` when the clock has not advanced past the stored
/// value within its resolution. A stored timestamp that sorts above the
/// wall clock but does not parse cannot be strictly exceeded and is
/// reported as corrupt instead of silently reused.
fn timestamp_after(previous: &str) -> RepoResult<String> {
    let candidate = now_timestamp();
    if candidate.as_str() > previous {
        return Ok(candidate);
    }
    match DateTime::parse_from_rfc3339(previous) {
        Ok(parsed) => Ok((parsed.with_timezone(&Utc) + Duration::microseconds(1))
            .to_rfc3339_opts(SecondsFormat::Micros, true)),
        Err(_) => Err(StoreError::InvalidData(format!(
            "unparseable stored modified_at `{previous}`"
        ))),
    }
}
