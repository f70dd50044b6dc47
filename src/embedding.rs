//! Embedding generation using fastembed (local, no API keys)

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{Error, Result};

/// Maps text to a fixed-dimension vector. Deterministic for a given model:
/// the same text always yields the same vector, and the dimensionality is
/// fixed for the lifetime of the store.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Fixed output dimensionality
    fn dimensions(&self) -> usize;
}

/// Embedding provider backed by a local fastembed model
pub struct FastembedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    dimensions: usize,
}

impl FastembedProvider {
    /// Create a new provider with the local model
    pub fn new(config: &Config) -> Result<Self> {
        // all-MiniLM-L6-v2: 384 dimensions, fast, good quality.
        // Model downloads automatically on first use to ~/.cache/fastembed
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(true),
        )
        .map_err(|e| Error::embedding(format!("Failed to load embedding model: {}", e)))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimensions: config.embedding_dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastembedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model.clone();
        let text = text.to_string();

        // Lock the model and run embedding
        let mut guard = model.lock().await;
        let embeddings = guard
            .embed(vec![text], None)
            .map_err(|e| Error::embedding(format!("Embedding failed: {}", e)))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("No embedding returned"))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
