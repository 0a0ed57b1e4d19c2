//! Atlas selection and store connection ownership.

pub mod registry;

pub use registry::{AtlasConfig, AtlasError, AtlasRegistry};
