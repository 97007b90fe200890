//! Embedding capability used by the similarity extractor.
//!
//! The model itself is a black box: it turns texts into unit vectors and
//! scores pairs of vectors. Nothing here trains or adapts it.

pub mod hashed;
#[cfg(feature = "semantic")]
pub mod minilm;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EmbeddingConfig;

pub use hashed::HashedEmbedder;
#[cfg(feature = "semantic")]
pub use minilm::MiniLmEmbedder;

/// Vectors below this norm are treated as having no direction.
const NORM_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingError {
    pub message: String,
}

impl EmbeddingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EmbeddingError {}

/// A text embedding model.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts into unit-normalized vectors, one per input.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Similarity of two embeddings, in [-1, 1].
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }

    /// Name shown in reports.
    fn name(&self) -> &str;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed(texts)
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        (**self).similarity(a, b)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Which embedding model backs the similarity scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Built-in feature hashing. Lexical overlap only, but needs no model files.
    Hashed,
    /// all-MiniLM-L6-v2 sentence embeddings through fastembed.
    #[value(name = "minilm")]
    MiniLm,
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        if cfg!(feature = "semantic") {
            Self::MiniLm
        } else {
            Self::Hashed
        }
    }
}

impl EmbeddingBackend {
    /// Whether this build can load the backend.
    pub fn is_available(self) -> bool {
        match self {
            Self::Hashed => true,
            Self::MiniLm => cfg!(feature = "semantic"),
        }
    }
}

/// Load the configured embedder.
pub fn load(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbeddingError> {
    match config.backend {
        EmbeddingBackend::Hashed => Ok(Box::new(HashedEmbedder::new(config.dimensions))),
        EmbeddingBackend::MiniLm => load_minilm(config),
    }
}

#[cfg(feature = "semantic")]
fn load_minilm(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbeddingError> {
    let embedder =
        MiniLmEmbedder::new(config.cache_dir.as_deref(), config.show_download_progress)?;
    Ok(Box::new(embedder))
}

#[cfg(not(feature = "semantic"))]
fn load_minilm(_config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbeddingError> {
    Err(EmbeddingError::new(
        "the minilm backend requires building with the `semantic` feature",
    ))
}

/// Cosine similarity clamped to [-1, 1]; 0.0 when either vector is degenerate
/// or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < NORM_EPSILON || norm_b < NORM_EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
