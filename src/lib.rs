//! # Plume Memory
//!
//! A memory-aware context engine for social post generation.
//!
//! ## Architecture
//!
//! The engine layers a retrieval system over embedded post history:
//! - **Post Record Store** - owner-scoped vector index with metadata
//!   pre-filtering (filter first, rank second)
//! - **Similarity Classifier** - maps search scores to topic novelty
//! - **Context Builder** - shapes retrieved posts per generation mode
//!   (imitate, avoid, or continue a series)
//! - **Fact Aggregator** - keeps series internally consistent by carrying
//!   forward facts extracted from every prior post
//! - **Generation Orchestrator** - routes requests through the pipeline
//!   and persists the result
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plume_memory::{Config, FastembedProvider, LanceStore, OpenAiBackend, OpenAiConfig, PostGenerator};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let embedder = Arc::new(FastembedProvider::new(&config)?);
//! let store = Arc::new(LanceStore::new(&config, embedder).await?);
//! let llm = Arc::new(OpenAiBackend::new(OpenAiConfig::from_env(&config)?)?);
//!
//! let generator = PostGenerator::new(store, llm.clone(), llm, config);
//! let result = generator.generate_post(request).await?;
//! ```

pub mod backend;
pub mod classifier;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod facts;
pub mod generator;
pub mod llm;
pub mod post;
pub mod storage;
pub mod validate;

pub use backend::{FactExtractor, GenerationBackend, GenerationTask, StyleOptions};
pub use classifier::{classify, SimilarityBand, TopicNovelty, SIMILARITY_THRESHOLD};
pub use config::Config;
pub use context::{ContextBuilder, GenerationContext, GenerationMode};
pub use embedding::{EmbeddingProvider, FastembedProvider};
pub use error::{Error, Result};
pub use facts::{Fact, FactAggregator};
pub use generator::{GeneratedPost, History, PostGenerator, TopicInfo};
pub use llm::{OpenAiBackend, OpenAiConfig};
pub use post::{
    Audience, LengthClass, NewPost, Post, PostRequest, SeriesSummary, SimilarityMatch, StyleMode,
    Tone,
};
pub use storage::{InMemoryStore, LanceStore, PostStore};
