//! Use-case services over the persistence boundary.

pub mod node_service;

pub use node_service::{BatchItemOutcome, NewNode, NodeService};
