use std::path::Path;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use super::{Embedder, EmbeddingError};

const MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Sentence embeddings from all-MiniLM-L6-v2 (384 dimensions) via fastembed.
///
/// The ONNX weights are downloaded into `cache_dir` (or fastembed's default
/// cache) on first load.
pub struct MiniLmEmbedder {
    model: Mutex<TextEmbedding>,
}

impl MiniLmEmbedder {
    pub fn new(cache_dir: Option<&Path>, show_download_progress: bool) -> Result<Self, EmbeddingError> {
        let mut options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(show_download_progress);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir.to_path_buf());
        }

        let model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::new(format!("Failed to initialize {MODEL_NAME}: {e}")))?;
        info!(model = MODEL_NAME, "embedding model loaded");

        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl Embedder for MiniLmEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::new(format!("Failed to acquire model lock: {e}")))?;
        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::new(format!("Batch embedding failed: {e}")))
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }
}
