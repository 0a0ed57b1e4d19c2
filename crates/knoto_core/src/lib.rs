//! Core domain logic for the knoto knowledge atlas.
//! This crate is the single source of truth for placement and
//! persistence invariants.

pub mod atlas;
pub mod db;
pub mod inference;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use atlas::registry::{AtlasConfig, AtlasError, AtlasRegistry};
pub use inference::{
    CoordinateInference, FastembedEncoder, InferenceError, InferencePipeline, Normalizer,
    ProjectionBundle, Projector, SeededInference, TextEncoder,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::node::{Coordinate, NodeRecord, NodeValidationError};
pub use repo::node_repo::{NodeRepository, RepoResult, SqliteNodeRepository, StoreError};
pub use service::node_service::{BatchItemOutcome, NewNode, NodeService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
