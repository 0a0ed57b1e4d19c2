//! Text encoder contract and ONNX-backed implementation.
//!
//! # Responsibility
//! - Convert raw note text into a fixed-dimension embedding vector.
//! - Load encoder weights from a local artifact directory, never the
//!   network.
//!
//! # Invariants
//! - `dimension()` is fixed for the lifetime of one encoder instance.
//! - Truncation/pooling policy is owned by the encoder, not callers.

use crate::inference::{InferenceError, InferenceResult};
use fastembed::{
    InitOptionsUserDefined, Pooling, TextEmbedding, TokenizerFiles, UserDefinedEmbeddingModel,
};
use log::info;
use std::path::Path;
use std::sync::Mutex;

/// Encoder artifact files expected inside the artifact directory.
const ONNX_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const CONFIG_FILE: &str = "config.json";
const SPECIAL_TOKENS_FILE: &str = "special_tokens_map.json";
const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

/// Contract for turning text into a fixed-dimension embedding.
///
/// Kept as a trait so the pipeline is constructible without real model
/// weights in tests.
pub trait TextEncoder: Send + Sync {
    fn encode(&self, text: &str) -> InferenceResult<Vec<f32>>;
    fn dimension(&self) -> usize;
}

/// ONNX sentence encoder loaded from a local artifact directory.
///
/// The underlying session requires `&mut` per call, so one lock
/// serializes encodes; projection and persistence stay outside it.
pub struct FastembedEncoder {
    inner: Mutex<TextEmbedding>,
    dimension: usize,
}

impl std::fmt::Debug for FastembedEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastembedEncoder")
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl FastembedEncoder {
    /// Loads the encoder from `artifact_dir` and probes its output
    /// dimension with one throwaway encode.
    ///
    /// # Errors
    /// - `ArtifactMissing` when any expected file is absent.
    /// - `ArtifactInvalid` when the session cannot be constructed or the
    ///   probe encode fails.
    pub fn load(artifact_dir: impl AsRef<Path>) -> InferenceResult<Self> {
        let dir = artifact_dir.as_ref();
        info!(
            "event=pipeline_load module=inference status=start component=encoder dir={}",
            dir.display()
        );

        let model = UserDefinedEmbeddingModel::new(
            read_artifact(dir, ONNX_FILE)?,
            TokenizerFiles {
                tokenizer_file: read_artifact(dir, TOKENIZER_FILE)?,
                config_file: read_artifact(dir, CONFIG_FILE)?,
                special_tokens_map_file: read_artifact(dir, SPECIAL_TOKENS_FILE)?,
                tokenizer_config_file: read_artifact(dir, TOKENIZER_CONFIG_FILE)?,
            },
        )
        .with_pooling(Pooling::Mean);

        let mut session =
            TextEmbedding::try_new_from_user_defined(model, InitOptionsUserDefined::default())
                .map_err(|err| InferenceError::ArtifactInvalid {
                    path: dir.to_path_buf(),
                    message: err.to_string(),
                })?;

        let probe = session
            .embed(vec!["dimension probe"], None)
            .map_err(|err| InferenceError::ArtifactInvalid {
                path: dir.to_path_buf(),
                message: format!("probe encode failed: {err}"),
            })?;
        let dimension = probe
            .first()
            .map(Vec::len)
            .filter(|len| *len > 0)
            .ok_or_else(|| InferenceError::ArtifactInvalid {
                path: dir.to_path_buf(),
                message: "probe encode returned no embedding".to_string(),
            })?;

        info!(
            "event=pipeline_load module=inference status=ok component=encoder dir={} dimension={dimension}",
            dir.display()
        );

        Ok(Self {
            inner: Mutex::new(session),
            dimension,
        })
    }
}

impl TextEncoder for FastembedEncoder {
    fn encode(&self, text: &str) -> InferenceResult<Vec<f32>> {
        let mut session = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut embeddings = session
            .embed(vec![text], None)
            .map_err(|err| InferenceError::EncodingFailed {
                message: err.to_string(),
            })?;
        embeddings
            .pop()
            .ok_or_else(|| InferenceError::EncodingFailed {
                message: "encoder returned no embedding".to_string(),
            })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn read_artifact(dir: &Path, file_name: &str) -> InferenceResult<Vec<u8>> {
    let path = dir.join(file_name);
    std::fs::read(&path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => InferenceError::ArtifactMissing { path },
        _ => InferenceError::ArtifactInvalid {
            path,
            message: err.to_string(),
        },
    })
}
