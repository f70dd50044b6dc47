//! Configuration for plume-memory

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the memory engine and its collaborators
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for all storage
    pub data_dir: PathBuf,

    /// Embedding model name (for reference, actual model set in embedding.rs)
    pub embedding_model: String,

    /// Embedding dimensions (384 for all-MiniLM-L6-v2)
    pub embedding_dimensions: usize,

    /// How many similar posts to retrieve for context building
    pub max_similar_posts: usize,

    /// Per-mode sampling temperatures for the generation backend.
    /// Similar mode runs cooler so the style stays consistent.
    pub similar_mode_temperature: f32,
    pub different_mode_temperature: f32,

    /// Generated post length bounds (characters)
    pub min_post_length: usize,
    pub max_post_length: usize,

    /// Timeout applied to each external call (generation, extraction)
    pub backend_timeout: Duration,

    /// HTTP server port
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plume-memory");

        Self {
            data_dir,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dimensions: 384, // MiniLM-L6-v2 outputs 384-dim vectors
            max_similar_posts: 3,
            similar_mode_temperature: 0.3,
            different_mode_temperature: 0.7,
            min_post_length: 100,
            max_post_length: 3000,
            backend_timeout: Duration::from_secs(60),
            server_port: 8430,
        }
    }
}

impl Config {
    /// Create a new config with a custom data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Get the path to the vector database
    pub fn vector_db_path(&self) -> PathBuf {
        self.data_dir.join("posts")
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.vector_db_path())?;
        Ok(())
    }
}
