//! Text-to-coordinate inference.
//!
//! # Responsibility
//! - Turn raw note text into a stable 2D placement via three frozen
//!   transforms: encode, project, normalize.
//! - Load all model artifacts once at startup; never refit at inference
//!   time.
//!
//! # Invariants
//! - Fixed artifacts + fixed text produce the same coordinate (bounded
//!   encoder float noise tolerated).
//! - A per-call encoding failure surfaces per note and never crashes the
//!   pipeline.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod encoder;
pub mod pipeline;
pub mod projector;
pub mod seeded;

pub use encoder::{FastembedEncoder, TextEncoder};
pub use pipeline::{CoordinateInference, InferencePipeline};
pub use projector::{Normalizer, ProjectionBundle, Projector};
pub use seeded::SeededInference;

pub type InferenceResult<T> = Result<T, InferenceError>;

/// Inference failures, split between fatal artifact problems and
/// per-call encoding errors.
#[derive(Debug)]
pub enum InferenceError {
    /// Artifact file or directory missing. Fatal at startup.
    ArtifactMissing { path: PathBuf },
    /// Artifact present but unreadable or inconsistent. Fatal at startup.
    ArtifactInvalid { path: PathBuf, message: String },
    /// Embedding dimensionality disagreement between loaded artifacts or
    /// between an artifact and a produced vector.
    DimensionMismatch { expected: usize, actual: usize },
    /// Per-call failure while encoding one note's text.
    EncodingFailed { message: String },
}

impl Display for InferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArtifactMissing { path } => {
                write!(f, "model artifact missing: {}", path.display())
            }
            Self::ArtifactInvalid { path, message } => {
                write!(f, "model artifact invalid at {}: {message}", path.display())
            }
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "embedding dimension mismatch: expected {expected}, got {actual}"
            ),
            Self::EncodingFailed { message } => write!(f, "text encoding failed: {message}"),
        }
    }
}

impl Error for InferenceError {}
