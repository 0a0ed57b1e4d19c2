//! Persistence boundary for node records.

pub mod node_repo;

pub use node_repo::{NodeRepository, RepoResult, SqliteNodeRepository, StoreError};
