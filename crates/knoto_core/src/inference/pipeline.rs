//! Inference pipeline composing encode, project, normalize.
//!
//! # Responsibility
//! - Wire the three frozen transforms into one `infer(text)` operation.
//! - Verify artifact dimension agreement at construction time.
//!
//! # Invariants
//! - The pipeline holds no per-call mutable state; calls may run in
//!   parallel across requests.
//! - Construction fails fast on artifact inconsistency; serving never
//!   starts with a broken pipeline.

use crate::inference::encoder::{FastembedEncoder, TextEncoder};
use crate::inference::projector::{Normalizer, ProjectionBundle, Projector};
use crate::inference::{InferenceError, InferenceResult};
use crate::model::node::Coordinate;
use log::{debug, info};
use std::path::Path;

/// Contract consumed by the node store: note text in, placement out.
///
/// Kept as a trait so tests and tooling can swap in a deterministic
/// double without model weights.
pub trait CoordinateInference: Send + Sync {
    fn infer(&self, text: &str) -> InferenceResult<Coordinate>;
}

/// Production pipeline: encoder, fitted reduction, fitted normalization.
pub struct InferencePipeline {
    encoder: Box<dyn TextEncoder>,
    projector: Projector,
    normalizer: Normalizer,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("dimension", &self.projector.dimension())
            .finish_non_exhaustive()
    }
}

impl InferencePipeline {
    /// Composes a pipeline from an already-loaded encoder and bundle.
    ///
    /// # Errors
    /// - `DimensionMismatch` when the bundle was fitted for a different
    ///   embedding dimension than the encoder produces.
    pub fn new(
        encoder: Box<dyn TextEncoder>,
        bundle: ProjectionBundle,
    ) -> InferenceResult<Self> {
        if bundle.embedding_dim != encoder.dimension() {
            return Err(InferenceError::DimensionMismatch {
                expected: encoder.dimension(),
                actual: bundle.embedding_dim,
            });
        }
        let (projector, normalizer) = bundle.split();
        Ok(Self {
            encoder,
            projector,
            normalizer,
        })
    }

    /// Loads both artifacts and composes the production pipeline.
    ///
    /// Any failure here is a fatal startup error for the caller: the
    /// pipeline cannot serve requests without its artifacts.
    pub fn load(
        encoder_dir: impl AsRef<Path>,
        projection_path: impl AsRef<Path>,
    ) -> InferenceResult<Self> {
        let encoder = FastembedEncoder::load(encoder_dir)?;
        let bundle = ProjectionBundle::load(projection_path.as_ref())?;
        let pipeline = Self::new(Box::new(encoder), bundle)?;
        info!(
            "event=pipeline_load module=inference status=ok component=pipeline dimension={}",
            pipeline.projector.dimension()
        );
        Ok(pipeline)
    }
}

impl CoordinateInference for InferencePipeline {
    fn infer(&self, text: &str) -> InferenceResult<Coordinate> {
        let embedding = self.encoder.encode(text)?;
        let raw = self.projector.project(&embedding)?;
        let coordinate = self.normalizer.normalize(raw);
        debug!(
            "event=infer module=inference status=ok chars={} x={} y={}",
            text.chars().count(),
            coordinate.x,
            coordinate.y
        );
        Ok(coordinate)
    }
}
