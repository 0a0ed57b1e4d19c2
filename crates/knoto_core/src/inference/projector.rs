//! Frozen 2D projection and display-range normalization.
//!
//! # Responsibility
//! - Load the fitted reducer+scaler bundle from its JSON artifact.
//! - Map embeddings to raw 2D points and raw points into the atlas
//!   display range.
//!
//! # Invariants
//! - All parameters are fitted offline; nothing here is refit per call.
//! - Bundle dimensions must agree internally before the bundle is usable.

use crate::inference::{InferenceError, InferenceResult};
use crate::model::node::Coordinate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialized reducer+scaler artifact: a mean-centered linear reduction
/// to 2D plus fitted scale/offset parameters for the display range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionBundle {
    pub embedding_dim: usize,
    pub mean: Vec<f32>,
    /// Exactly two component rows, each of length `embedding_dim`.
    pub components: Vec<Vec<f32>>,
    pub scale: [f64; 2],
    pub offset: [f64; 2],
}

impl ProjectionBundle {
    /// Loads and validates the bundle from a JSON artifact file.
    ///
    /// # Errors
    /// - `ArtifactMissing` when the file does not exist.
    /// - `ArtifactInvalid` for unreadable/corrupt JSON or inconsistent
    ///   dimensions.
    pub fn load(path: impl AsRef<Path>) -> InferenceResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => InferenceError::ArtifactMissing {
                path: path.to_path_buf(),
            },
            _ => InferenceError::ArtifactInvalid {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
        })?;

        let bundle: Self =
            serde_json::from_str(&raw).map_err(|err| InferenceError::ArtifactInvalid {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;

        bundle.validate().map_err(|message| {
            InferenceError::ArtifactInvalid {
                path: path.to_path_buf(),
                message,
            }
        })?;
        Ok(bundle)
    }

    /// Checks internal dimension agreement and parameter sanity.
    pub fn validate(&self) -> Result<(), String> {
        if self.embedding_dim == 0 {
            return Err("embedding_dim must be positive".to_string());
        }
        if self.mean.len() != self.embedding_dim {
            return Err(format!(
                "mean length {} does not match embedding_dim {}",
                self.mean.len(),
                self.embedding_dim
            ));
        }
        if self.components.len() != 2 {
            return Err(format!(
                "expected 2 component rows, got {}",
                self.components.len()
            ));
        }
        for (index, row) in self.components.iter().enumerate() {
            if row.len() != self.embedding_dim {
                return Err(format!(
                    "component row {index} length {} does not match embedding_dim {}",
                    row.len(),
                    self.embedding_dim
                ));
            }
        }
        if self.scale.iter().any(|value| !value.is_finite())
            || self.offset.iter().any(|value| !value.is_finite())
        {
            return Err("scale/offset parameters must be finite".to_string());
        }
        Ok(())
    }

    /// Splits the bundle into its two fitted transforms.
    pub fn split(self) -> (Projector, Normalizer) {
        let normalizer = Normalizer {
            scale: self.scale,
            offset: self.offset,
        };
        let projector = Projector {
            mean: self.mean,
            components: self.components,
        };
        (projector, normalizer)
    }
}

/// Frozen mean-centered linear reduction from embedding space to 2D.
#[derive(Debug, Clone)]
pub struct Projector {
    mean: Vec<f32>,
    components: Vec<Vec<f32>>,
}

impl Projector {
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Projects one embedding to a raw 2D point.
    ///
    /// # Errors
    /// - `DimensionMismatch` when the embedding length disagrees with the
    ///   fitted mean vector.
    pub fn project(&self, embedding: &[f32]) -> InferenceResult<(f64, f64)> {
        if embedding.len() != self.mean.len() {
            return Err(InferenceError::DimensionMismatch {
                expected: self.mean.len(),
                actual: embedding.len(),
            });
        }

        let mut raw = [0.0f64; 2];
        for (axis, row) in self.components.iter().enumerate() {
            let mut acc = 0.0f64;
            for ((value, mean), weight) in embedding.iter().zip(&self.mean).zip(row) {
                acc += f64::from(value - mean) * f64::from(*weight);
            }
            raw[axis] = acc;
        }
        Ok((raw[0], raw[1]))
    }
}

/// Fitted scale/offset parameters mapping raw projected points into the
/// atlas display range.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    scale: [f64; 2],
    offset: [f64; 2],
}

impl Normalizer {
    pub fn normalize(&self, raw: (f64, f64)) -> Coordinate {
        Coordinate::new(
            raw.0 * self.scale[0] + self.offset[0],
            raw.1 * self.scale[1] + self.offset[1],
        )
    }
}
